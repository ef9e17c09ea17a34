//! Key derivation: KEM shared secret → AEAD key (HKDF-SHA256)

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KDF_INFO, KEY_SIZE};

/// A 256-bit AEAD key derived from a KEM shared secret.
///
/// Zeroized on drop. Never cached across calls.
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AEAD key from a shared secret.
///
/// HKDF-SHA256, no salt, info = [`KDF_INFO`]. Deterministic: both sides of
/// a round trip derive the same key from the same shared secret.
pub fn derive(shared_secret: &[u8]) -> CryptoResult<SymmetricKey> {
    if shared_secret.is_empty() {
        return Err(CryptoError::KdfFailure("empty shared secret".into()));
    }
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(KDF_INFO, &mut okm)
        .map_err(|e| CryptoError::KdfFailure(format!("HKDF expand failed: {e}")))?;
    let key = SymmetricKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}
