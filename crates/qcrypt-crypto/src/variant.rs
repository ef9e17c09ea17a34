//! ML-KEM parameter sets and length-based variant resolution

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// One of the three ML-KEM (Kyber) parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KemVariant {
    #[serde(rename = "512")]
    Variant512,
    #[serde(rename = "768")]
    Variant768,
    #[serde(rename = "1024")]
    Variant1024,
}

impl KemVariant {
    pub const ALL: [KemVariant; 3] = [
        KemVariant::Variant512,
        KemVariant::Variant768,
        KemVariant::Variant1024,
    ];

    pub fn private_key_len(self) -> usize {
        match self {
            KemVariant::Variant512 => 1632,
            KemVariant::Variant768 => 2400,
            KemVariant::Variant1024 => 3168,
        }
    }

    pub fn public_key_len(self) -> usize {
        match self {
            KemVariant::Variant512 => 800,
            KemVariant::Variant768 => 1184,
            KemVariant::Variant1024 => 1568,
        }
    }

    pub fn ciphertext_len(self) -> usize {
        match self {
            KemVariant::Variant512 => 768,
            KemVariant::Variant768 => 1088,
            KemVariant::Variant1024 => 1568,
        }
    }

    /// Short name as used in config files ("512", "768", "1024")
    pub fn name(self) -> &'static str {
        match self {
            KemVariant::Variant512 => "512",
            KemVariant::Variant768 => "768",
            KemVariant::Variant1024 => "1024",
        }
    }

    /// Parse a config-style name. Accepts "768", "kyber768" and "ml-kem-768".
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix("ml-kem-")
            .or_else(|| lower.strip_prefix("kyber"))
            .unwrap_or(&lower);
        match digits {
            "512" => Some(KemVariant::Variant512),
            "768" => Some(KemVariant::Variant768),
            "1024" => Some(KemVariant::Variant1024),
            _ => None,
        }
    }

    /// Variant whose public key has exactly `len` bytes.
    pub fn from_public_key_len(len: usize) -> CryptoResult<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.public_key_len() == len)
            .ok_or(CryptoError::UnknownVariant { len })
    }
}

impl std::fmt::Display for KemVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ML-KEM-{}", self.name())
    }
}

/// Resolve the parameter set from the private-key length.
///
/// Fails closed: a length outside the table is `UnknownVariant`, never a
/// guess at the middle parameter set.
pub fn resolve_variant(private_key: &[u8]) -> CryptoResult<KemVariant> {
    let len = private_key.len();
    KemVariant::ALL
        .into_iter()
        .find(|v| v.private_key_len() == len)
        .ok_or(CryptoError::UnknownVariant { len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_each_known_length() {
        assert_eq!(resolve_variant(&[0u8; 1632]).unwrap(), KemVariant::Variant512);
        assert_eq!(resolve_variant(&[0u8; 2400]).unwrap(), KemVariant::Variant768);
        assert_eq!(resolve_variant(&[0u8; 3168]).unwrap(), KemVariant::Variant1024);
    }

    #[test]
    fn unknown_length_fails_closed() {
        let err = resolve_variant(&[0u8; 999]).unwrap_err();
        assert!(matches!(err, CryptoError::UnknownVariant { len: 999 }));

        assert!(resolve_variant(&[]).is_err());
        assert!(resolve_variant(&[0u8; 2401]).is_err());
    }

    #[test]
    fn public_key_lengths_resolve() {
        for v in KemVariant::ALL {
            assert_eq!(KemVariant::from_public_key_len(v.public_key_len()).unwrap(), v);
        }
        assert!(KemVariant::from_public_key_len(1000).is_err());
    }

    #[test]
    fn names_parse() {
        assert_eq!(KemVariant::from_name("512"), Some(KemVariant::Variant512));
        assert_eq!(KemVariant::from_name("Kyber768"), Some(KemVariant::Variant768));
        assert_eq!(KemVariant::from_name("ML-KEM-1024"), Some(KemVariant::Variant1024));
        assert_eq!(KemVariant::from_name("2048"), None);
        for v in KemVariant::ALL {
            assert_eq!(KemVariant::from_name(v.name()), Some(v));
        }
    }
}
