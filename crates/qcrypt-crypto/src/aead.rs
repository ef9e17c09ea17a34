//! AES-256-GCM payload encryption/decryption
//!
//! Every call to [`aead_encrypt`] draws a fresh 96-bit nonce from the thread
//! CSPRNG; callers cannot supply one. Associated data is empty. The GCM tag
//! is appended to the ciphertext:
//! ```text
//! ciphertext = [N bytes: encrypted payload][16 bytes: GCM tag]
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::SymmetricKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Largest plaintext AES-GCM accepts under one nonce (2^36 - 32 bytes)
pub const MAX_PLAINTEXT_LEN: u64 = (1 << 36) - 32;

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Returns `(nonce, ciphertext || tag)`.
pub fn aead_encrypt(
    plaintext: &[u8],
    key: &SymmetricKey,
) -> CryptoResult<([u8; NONCE_SIZE], Vec<u8>)> {
    if plaintext.len() as u64 > MAX_PLAINTEXT_LEN {
        return Err(CryptoError::PlaintextTooLarge {
            len: plaintext.len() as u64,
        });
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::PlaintextTooLarge {
            len: plaintext.len() as u64,
        })?;

    Ok((nonce_bytes, ciphertext))
}

/// Authenticate and decrypt `ciphertext || tag` under `key` and `nonce`.
///
/// Any authentication failure is [`CryptoError::AuthenticationFailed`];
/// no partial plaintext is ever returned.
pub fn aead_decrypt(ciphertext: &[u8], key: &SymmetricKey, nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::MalformedContainer(format!(
            "nonce is {} bytes (expected {NONCE_SIZE})",
            nonce.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::MalformedContainer(format!(
            "encrypted_data too short: {} bytes (minimum {TAG_SIZE})",
            ciphertext.len()
        )));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)
}
