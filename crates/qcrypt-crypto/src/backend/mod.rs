//! KEM backends: a closed set of implementations behind one capability surface
//!
//! - [`BackendKind::Fips203`]: pure-Rust ML-KEM (primary)
//! - [`BackendKind::PqClean`]: PQClean ML-KEM via the pqcrypto bindings (secondary)
//! - [`BackendKind::InsecureMock`]: hash-based stand-in for tests, never selected implicitly
//!
//! Every entry point checks byte lengths against the variant before handing
//! anything to a primitive, and converts panics inside a primitive into
//! `BackendOperationFailed`.

#[cfg(feature = "backend-fips203")]
mod fips;
pub mod mock;
#[cfg(feature = "backend-pqclean")]
mod pqclean;

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::variant::KemVariant;
use crate::SHARED_SECRET_SIZE;

/// Which KEM implementation performs an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Fips203,
    PqClean,
    InsecureMock,
}

impl BackendKind {
    /// Real backends in probe priority order
    pub const REAL_PRIORITY: [BackendKind; 2] = [BackendKind::Fips203, BackendKind::PqClean];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Fips203 => "fips203",
            BackendKind::PqClean => "pqclean",
            BackendKind::InsecureMock => "insecure-mock",
        }
    }

    pub fn is_insecure(self) -> bool {
        self == BackendKind::InsecureMock
    }

    /// Whether support for this backend was compiled into the binary.
    pub fn is_compiled(self) -> bool {
        match self {
            BackendKind::Fips203 => cfg!(feature = "backend-fips203"),
            BackendKind::PqClean => cfg!(feature = "backend-pqclean"),
            BackendKind::InsecureMock => true,
        }
    }

    /// Generate a fresh key pair for `variant`.
    pub fn keygen(self, variant: KemVariant) -> CryptoResult<KeyPair> {
        let (public_key, private_key) = self.guarded(|| match self {
            #[cfg(feature = "backend-fips203")]
            BackendKind::Fips203 => fips::keygen(variant),
            #[cfg(feature = "backend-pqclean")]
            BackendKind::PqClean => pqclean::keygen(variant),
            BackendKind::InsecureMock => Ok(mock::keygen(variant)),
            #[allow(unreachable_patterns)]
            _ => Err(KemFault::NotCompiled),
        })?;
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Encapsulate a fresh shared secret to `public_key`.
    pub fn encapsulate(self, variant: KemVariant, public_key: &[u8]) -> CryptoResult<Encapsulated> {
        if public_key.len() != variant.public_key_len() {
            return Err(CryptoError::UnknownVariant {
                len: public_key.len(),
            });
        }
        let (kem_ciphertext, shared_secret) = self.guarded(|| match self {
            #[cfg(feature = "backend-fips203")]
            BackendKind::Fips203 => fips::encapsulate(variant, public_key),
            #[cfg(feature = "backend-pqclean")]
            BackendKind::PqClean => pqclean::encapsulate(variant, public_key),
            BackendKind::InsecureMock => Ok(mock::encapsulate(variant, public_key)),
            #[allow(unreachable_patterns)]
            _ => Err(KemFault::NotCompiled),
        })?;
        Ok(Encapsulated {
            kem_ciphertext,
            shared_secret,
        })
    }

    /// Recover the shared secret from `kem_ciphertext` with `private_key`.
    pub fn decapsulate(
        self,
        variant: KemVariant,
        private_key: &[u8],
        kem_ciphertext: &[u8],
    ) -> CryptoResult<Zeroizing<[u8; SHARED_SECRET_SIZE]>> {
        if private_key.len() != variant.private_key_len() {
            return Err(CryptoError::UnknownVariant {
                len: private_key.len(),
            });
        }
        if kem_ciphertext.len() != variant.ciphertext_len() {
            return Err(CryptoError::MalformedContainer(format!(
                "kyber_ciphertext is {} bytes, {variant} expects {}",
                kem_ciphertext.len(),
                variant.ciphertext_len()
            )));
        }
        self.guarded(|| match self {
            #[cfg(feature = "backend-fips203")]
            BackendKind::Fips203 => fips::decapsulate(variant, private_key, kem_ciphertext),
            #[cfg(feature = "backend-pqclean")]
            BackendKind::PqClean => pqclean::decapsulate(variant, private_key, kem_ciphertext),
            BackendKind::InsecureMock => {
                Ok(mock::decapsulate(variant, private_key, kem_ciphertext))
            }
            #[allow(unreachable_patterns)]
            _ => Err(KemFault::NotCompiled),
        })
    }

    /// Keygen → encapsulate → decapsulate, and compare the two secrets.
    pub(crate) fn self_test(self, variant: KemVariant) -> CryptoResult<()> {
        let pair = self.keygen(variant)?;
        let sent = self.encapsulate(variant, &pair.public_key)?;
        let received = self.decapsulate(variant, &pair.private_key, &sent.kem_ciphertext)?;
        if *received != *sent.shared_secret {
            return Err(self.failure("self-test shared secrets differ"));
        }
        Ok(())
    }

    fn failure(self, reason: impl Into<String>) -> CryptoError {
        CryptoError::BackendOperationFailed {
            backend: self,
            reason: reason.into(),
        }
    }

    /// Run a primitive, translating its faults and panics into `CryptoError`.
    fn guarded<T>(self, op: impl FnOnce() -> Result<T, KemFault>) -> CryptoResult<T> {
        match catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(value)) => Ok(value),
            // The primitive refused the key or ciphertext bytes: a data
            // problem, indistinguishable from a wrong key.
            Ok(Err(KemFault::Rejected(reason))) => {
                tracing::debug!(backend = %self, "KEM input rejected: {reason}");
                Err(CryptoError::AuthenticationFailed)
            }
            Ok(Err(KemFault::Failed(reason))) => Err(self.failure(reason)),
            Ok(Err(KemFault::NotCompiled)) => Err(self.failure("backend not compiled in")),
            Err(_) => Err(self.failure("primitive panicked")),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fault raised inside a backend implementation.
#[allow(dead_code)]
pub(crate) enum KemFault {
    /// Input bytes were not a valid key/ciphertext for the primitive
    Rejected(String),
    /// The primitive itself failed (RNG, internal error)
    Failed(String),
    /// The backend's cargo feature is disabled
    NotCompiled,
}

/// A KEM key pair. The private key is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Parameter set implied by the private-key length.
    pub fn variant(&self) -> CryptoResult<KemVariant> {
        crate::variant::resolve_variant(&self.private_key)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Output of encapsulation: the KEM ciphertext and the transient shared secret.
pub struct Encapsulated {
    pub kem_ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<[u8; SHARED_SECRET_SIZE]>,
}

impl std::fmt::Debug for Encapsulated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encapsulated")
            .field("kem_ciphertext_len", &self.kem_ciphertext.len())
            .field("shared_secret", &"[REDACTED]")
            .finish()
    }
}

/// Copy a backend's shared secret into a fixed-size zeroizing buffer.
#[allow(dead_code)]
pub(crate) fn shared_secret_from_slice(
    bytes: &[u8],
) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>, KemFault> {
    if bytes.len() != SHARED_SECRET_SIZE {
        return Err(KemFault::Failed(format!(
            "shared secret is {} bytes (expected {SHARED_SECRET_SIZE})",
            bytes.len()
        )));
    }
    let mut out = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
    out.copy_from_slice(bytes);
    Ok(out)
}
