use qcrypt_core::ClientStatus;
use thiserror::Error;

use crate::backend::BackendKind;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Every way the encryption pipeline can fail.
///
/// The variants are precise on purpose; map them through
/// [`CryptoError::client_status`] before showing anything to a remote party.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key text decoded as base64 but would also have been valid hex.
    /// Non-fatal: reported alongside a successful decode.
    #[error("key text is ambiguous (valid base64 and valid hex); decoded as base64")]
    KeyDecodeAmbiguous,

    #[error("unknown KEM variant for key length {len} bytes")]
    UnknownVariant { len: usize },

    #[error("no KEM backend available")]
    NoBackendAvailable,

    #[error("KEM backend {backend} failed: {reason}")]
    BackendOperationFailed { backend: BackendKind, reason: String },

    #[error("authentication failed: wrong key or corrupted ciphertext")]
    AuthenticationFailed,

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("key derivation failed: {0}")]
    KdfFailure(String),

    #[error("plaintext of {len} bytes exceeds the AEAD limit")]
    PlaintextTooLarge { len: u64 },
}

impl CryptoError {
    /// Whether the same operation may succeed on a different backend.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CryptoError::BackendOperationFailed { .. })
    }

    /// Coarse status for callers outside the trust boundary.
    pub fn client_status(&self) -> ClientStatus {
        match self {
            CryptoError::KeyDecodeAmbiguous
            | CryptoError::UnknownVariant { .. }
            | CryptoError::PlaintextTooLarge { .. } => ClientStatus::BadInput,
            CryptoError::AuthenticationFailed | CryptoError::MalformedContainer(_) => {
                ClientStatus::CannotDecrypt
            }
            CryptoError::NoBackendAvailable
            | CryptoError::BackendOperationFailed { .. }
            | CryptoError::KdfFailure(_) => ClientStatus::ServerMisconfigured,
        }
    }
}
