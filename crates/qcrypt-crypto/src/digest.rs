//! Integrity digests: SHA-256, SHA-512, or BLAKE3, hex-encoded
//!
//! Digests are metadata (content identifiers, upload checksums), not part of
//! the secrecy path. An unrecognised algorithm name therefore falls back to
//! SHA-256 instead of failing, with a warning and the algorithm actually used
//! returned to the caller.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};
use std::io::Read;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 3] = [
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha512,
        DigestAlgorithm::Blake3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }

    /// Length of the hex output in characters
    pub fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha256 | DigestAlgorithm::Blake3 => 64,
            DigestAlgorithm::Sha512 => 128,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "sha256" => Some(DigestAlgorithm::Sha256),
            "sha512" => Some(DigestAlgorithm::Sha512),
            "blake3" => Some(DigestAlgorithm::Blake3),
            _ => None,
        }
    }

    /// Resolve a configured name, falling back to the default on anything
    /// unrecognised. Returns the algorithm and whether a fallback happened.
    pub fn from_name_or_default(name: &str) -> (Self, bool) {
        match Self::from_name(name) {
            Some(algorithm) => (algorithm, false),
            None => {
                let fallback = Self::default();
                tracing::warn!(
                    requested = name,
                    algorithm = fallback.name(),
                    "unknown digest algorithm, falling back"
                );
                (fallback, true)
            }
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            DigestAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Digest `data` with `algorithm`, as lowercase hex.
pub fn digest(data: &[u8], algorithm: DigestAlgorithm) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    hasher.finalize_hex()
}

/// Digest with a configured algorithm name.
///
/// Returns the hex digest and the algorithm actually used, which differs
/// from the request when the name was not recognised.
pub fn digest_named(data: &[u8], name: &str) -> (String, DigestAlgorithm) {
    let (algorithm, _) = DigestAlgorithm::from_name_or_default(name);
    (digest(data, algorithm), algorithm)
}

/// Digest a stream without loading it fully (for files too large to read at once)
pub fn digest_reader<R: Read>(
    mut reader: R,
    algorithm: DigestAlgorithm,
) -> std::io::Result<String> {
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            digest(b"abc", DigestAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            digest(b"abc", DigestAlgorithm::Sha512),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
        assert_eq!(
            digest(b"", DigestAlgorithm::Blake3),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn output_lengths() {
        for algorithm in DigestAlgorithm::ALL {
            assert_eq!(digest(b"qcrypt", algorithm).len(), algorithm.hex_len());
        }
    }

    #[test]
    fn unknown_name_falls_back_observably() {
        let (hex, used) = digest_named(b"data", "md5");
        assert_eq!(used, DigestAlgorithm::Sha256);
        assert_eq!(hex, digest(b"data", DigestAlgorithm::Sha256));
        assert!(DigestAlgorithm::from_name_or_default("whirlpool").1);
        assert!(!DigestAlgorithm::from_name_or_default("SHA-512").1);
    }

    #[test]
    fn names_parse() {
        assert_eq!(DigestAlgorithm::from_name("SHA-256"), Some(DigestAlgorithm::Sha256));
        assert_eq!(DigestAlgorithm::from_name("sha_512"), Some(DigestAlgorithm::Sha512));
        assert_eq!(DigestAlgorithm::from_name("BLAKE3"), Some(DigestAlgorithm::Blake3));
        for algorithm in DigestAlgorithm::ALL {
            assert_eq!(DigestAlgorithm::from_name(algorithm.name()), Some(algorithm));
        }
    }

    proptest! {
        #[test]
        fn streaming_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..=150_000),
            pick in 0usize..3,
        ) {
            let algorithm = DigestAlgorithm::ALL[pick];
            let streamed = digest_reader(std::io::Cursor::new(&data), algorithm).unwrap();
            prop_assert_eq!(streamed, digest(&data, algorithm));
        }

        #[test]
        fn different_content_different_digest(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
            prop_assume!(a != b);
            for algorithm in DigestAlgorithm::ALL {
                prop_assert_ne!(digest(&a, algorithm), digest(&b, algorithm));
            }
        }
    }
}
