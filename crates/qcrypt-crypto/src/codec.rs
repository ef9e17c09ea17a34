//! Key text codec
//!
//! Keys travel as text (form fields, key files, clipboard). Decoding never
//! fails: a wrong key is rejected later by variant resolution or by AEAD
//! authentication, with a typed error from those stages.
//!
//! Untagged text is decoded heuristically, in this order:
//! 1. standard base64 (padded)
//! 2. hexadecimal
//! 3. the raw UTF-8 bytes of the text
//!
//! The heuristic is ambiguous: a text that happens to be valid base64 is
//! decoded as base64 even if it was meant as hex or raw text. `deadbeef`,
//! for example, is valid in both alphabets. To avoid this, prefix the key
//! with an explicit tag (`b64:`, `hex:` or `raw:`); tagged keys bypass the
//! heuristic entirely. Untagged decoding stays for keys stored before tags
//! existed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::error::CryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Base64,
    Hex,
    Raw,
}

impl KeyEncoding {
    pub fn tag(self) -> &'static str {
        match self {
            KeyEncoding::Base64 => "b64:",
            KeyEncoding::Hex => "hex:",
            KeyEncoding::Raw => "raw:",
        }
    }
}

/// Result of decoding key text.
pub struct DecodedKey {
    bytes: Zeroizing<Vec<u8>>,
    encoding: KeyEncoding,
    tagged: bool,
    ambiguous: bool,
}

impl DecodedKey {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Zeroizing<Vec<u8>> {
        self.bytes
    }

    /// Encoding the text was decoded as
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// `Some(KeyDecodeAmbiguous)` when the untagged text was valid in more
    /// than one encoding. Informational; the bytes are still usable.
    pub fn ambiguity(&self) -> Option<CryptoError> {
        self.ambiguous.then_some(CryptoError::KeyDecodeAmbiguous)
    }
}

impl std::fmt::Debug for DecodedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedKey")
            .field("len", &self.bytes.len())
            .field("encoding", &self.encoding)
            .field("tagged", &self.tagged)
            .field("ambiguous", &self.ambiguous)
            .finish()
    }
}

/// Decode key text to bytes. See the module docs for the order of attempts.
pub fn decode_key(text: &str) -> DecodedKey {
    if let Some(decoded) = decode_tagged(text) {
        return decoded;
    }

    let trimmed = text.trim();
    if let Ok(bytes) = STANDARD.decode(trimmed) {
        let ambiguous = !trimmed.is_empty() && hex::decode(trimmed).is_ok();
        if ambiguous {
            tracing::warn!(
                len = trimmed.len(),
                "key text is valid base64 and valid hex; decoding as base64 (use a b64:/hex: tag)"
            );
        }
        return untagged(bytes, KeyEncoding::Base64, ambiguous);
    }
    if let Ok(bytes) = hex::decode(trimmed) {
        return untagged(bytes, KeyEncoding::Hex, false);
    }
    untagged(text.as_bytes().to_vec(), KeyEncoding::Raw, false)
}

fn decode_tagged(text: &str) -> Option<DecodedKey> {
    let (encoding, body) = [KeyEncoding::Base64, KeyEncoding::Hex, KeyEncoding::Raw]
        .into_iter()
        .find_map(|enc| text.strip_prefix(enc.tag()).map(|body| (enc, body)))?;

    let bytes = match encoding {
        KeyEncoding::Base64 => STANDARD.decode(body.trim()).ok(),
        KeyEncoding::Hex => hex::decode(body.trim()).ok(),
        KeyEncoding::Raw => Some(body.as_bytes().to_vec()),
    };

    Some(match bytes {
        Some(bytes) => DecodedKey {
            bytes: Zeroizing::new(bytes),
            encoding,
            tagged: true,
            ambiguous: false,
        },
        None => {
            // The tag promised an encoding the body does not satisfy. Hand
            // back the raw text; the key will fail variant resolution.
            tracing::warn!(tag = encoding.tag(), "tagged key body does not decode");
            untagged(text.as_bytes().to_vec(), KeyEncoding::Raw, false)
        }
    })
}

fn untagged(bytes: Vec<u8>, encoding: KeyEncoding, ambiguous: bool) -> DecodedKey {
    DecodedKey {
        bytes: Zeroizing::new(bytes),
        encoding,
        tagged: false,
        ambiguous,
    }
}

/// Encode key bytes as untagged standard base64 (readable by every version).
pub fn encode_key(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode key bytes as `b64:`-tagged base64, immune to decode ambiguity.
pub fn encode_key_tagged(bytes: &[u8]) -> String {
    format!("{}{}", KeyEncoding::Base64.tag(), STANDARD.encode(bytes))
}
