//! Encrypted file container format
//!
//! A container bundles everything needed to decrypt one file except the
//! private key:
//! ```json
//! { "kyber_ciphertext": "<base64>", "nonce": "<base64>", "encrypted_data": "<base64>" }
//! ```
//! All three fields are mandatory and non-empty. Unknown fields are ignored
//! on read and never written.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::{CryptoError, CryptoResult};
use crate::NONCE_SIZE;

/// A parsed, well-formed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// ML-KEM ciphertext encapsulating the shared secret
    pub kem_ciphertext: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: [u8; NONCE_SIZE],
    /// AES-GCM ciphertext with the tag appended
    pub ciphertext: Vec<u8>,
}

/// Wire shape for reading: every field optional so absence is reported
/// precisely instead of as a generic serde error.
#[derive(Deserialize)]
struct WireIn {
    kyber_ciphertext: Option<String>,
    nonce: Option<String>,
    encrypted_data: Option<String>,
}

impl Container {
    pub fn new(kem_ciphertext: Vec<u8>, nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Self {
        Self {
            kem_ciphertext,
            nonce,
            ciphertext,
        }
    }

    /// The canonical object: exactly the three wire fields.
    fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kyber_ciphertext": STANDARD.encode(&self.kem_ciphertext),
            "nonce": STANDARD.encode(self.nonce),
            "encrypted_data": STANDARD.encode(&self.ciphertext),
        })
    }

    /// Serialize to compact JSON bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }

    /// Serialize to indented JSON, for files a human may open
    pub fn to_json_pretty(&self) -> String {
        format!("{:#}", self.to_value())
    }

    /// Parse and validate container bytes.
    pub fn parse(data: &[u8]) -> CryptoResult<Self> {
        let wire: WireIn = serde_json::from_slice(data)
            .map_err(|e| CryptoError::MalformedContainer(format!("not a container: {e}")))?;

        let kem_ciphertext = required_field("kyber_ciphertext", wire.kyber_ciphertext)?;
        let nonce_bytes = required_field("nonce", wire.nonce)?;
        let ciphertext = required_field("encrypted_data", wire.encrypted_data)?;

        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedContainer(format!(
                "nonce is {} bytes (expected {NONCE_SIZE})",
                nonce_bytes.len()
            ))
        })?;

        Ok(Self {
            kem_ciphertext,
            nonce,
            ciphertext,
        })
    }
}

fn required_field(name: &str, value: Option<String>) -> CryptoResult<Vec<u8>> {
    let encoded =
        value.ok_or_else(|| CryptoError::MalformedContainer(format!("missing field `{name}`")))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::MalformedContainer(format!("field `{name}`: base64: {e}")))?;
    if decoded.is_empty() {
        return Err(CryptoError::MalformedContainer(format!(
            "field `{name}` is empty"
        )));
    }
    Ok(decoded)
}
