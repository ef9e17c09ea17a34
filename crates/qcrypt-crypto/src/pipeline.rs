//! Encrypt/decrypt orchestration
//!
//! Composes backend selection, KEM, key derivation, AEAD and the container
//! codec. Stateless: every call uses only its own buffers, so one
//! [`Pipeline`] can be shared freely across threads. Shared secrets and
//! derived keys live only for the duration of a call and are zeroized on drop.
//!
//! Backend fallback: when the preferred backend fails with
//! `BackendOperationFailed`, the operation is retried once on the next real
//! backend that supports the variant. Authentication and parse failures are
//! never retried, and the mock is never a fallback target.

use tracing::{debug, warn};

use qcrypt_core::config::PipelineConfig;
use qcrypt_core::{QcryptError, QcryptResult};

use crate::aead::{aead_decrypt, aead_encrypt};
use crate::backend::{BackendKind, KeyPair};
use crate::container::Container;
use crate::digest::{digest, DigestAlgorithm};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::derive;
use crate::registry::{BackendRegistry, BackendSelection};
use crate::variant::{resolve_variant, KemVariant};

/// Per-call settings. Passed explicitly on every call; the pipeline never
/// consults global configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Parameter set for new key pairs
    pub variant: KemVariant,
    /// Algorithm for the container digest in [`EncryptOutcome`]
    pub digest_algorithm: DigestAlgorithm,
    /// Allow the insecure mock when no real backend is available
    pub allow_insecure_mock: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            variant: KemVariant::Variant768,
            digest_algorithm: DigestAlgorithm::Sha256,
            allow_insecure_mock: false,
        }
    }
}

impl PipelineOptions {
    /// Build options from the `[pipeline]` config section.
    ///
    /// An unknown variant is a config error; an unknown digest algorithm
    /// falls back to SHA-256 with a warning.
    pub fn from_config(config: &PipelineConfig) -> QcryptResult<Self> {
        let variant = KemVariant::from_name(&config.variant).ok_or_else(|| {
            QcryptError::Config(format!(
                "unknown KEM variant {:?} (expected 512, 768 or 1024)",
                config.variant
            ))
        })?;
        let (digest_algorithm, _) = DigestAlgorithm::from_name_or_default(&config.digest_algorithm);
        Ok(Self {
            variant,
            digest_algorithm,
            allow_insecure_mock: config.allow_insecure_mock,
        })
    }
}

/// Everything `encrypt` hands back. The caller owns the key pair; the
/// pipeline keeps nothing.
#[derive(Debug)]
pub struct EncryptOutcome {
    pub container: Container,
    pub key_pair: KeyPair,
    pub variant: KemVariant,
    /// Backend that produced the container; `backend.insecure` flags the mock
    pub backend: BackendSelection,
    /// Hex digest of the serialized container
    pub digest: String,
    pub digest_algorithm: DigestAlgorithm,
}

/// Output of encrypting to an existing public key.
#[derive(Debug)]
pub struct Sealed {
    pub container: Container,
    pub variant: KemVariant,
    pub backend: BackendSelection,
}

#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'r> {
    registry: &'r BackendRegistry,
}

impl Pipeline<'static> {
    /// Pipeline over the process-wide registry (probed on first use).
    pub fn new() -> Self {
        Self {
            registry: BackendRegistry::global(),
        }
    }
}

impl Default for Pipeline<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Pipeline<'r> {
    pub fn with_registry(registry: &'r BackendRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r BackendRegistry {
        self.registry
    }

    /// Generate a key pair with the selected backend.
    pub fn keygen(&self, options: &PipelineOptions) -> CryptoResult<(KeyPair, BackendSelection)> {
        let variant = options.variant;
        let selection = self.registry.select_for(variant, options.allow_insecure_mock)?;
        let (pair, backend) =
            self.run_with_fallback(selection.backend, variant, |b| b.keygen(variant))?;
        Ok((pair, label(backend)))
    }

    /// Encrypt `plaintext` under a fresh key pair.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        options: &PipelineOptions,
    ) -> CryptoResult<EncryptOutcome> {
        let variant = options.variant;
        let selection = self.registry.select_for(variant, options.allow_insecure_mock)?;

        let ((key_pair, container), backend) =
            self.run_with_fallback(selection.backend, variant, |b| {
                let key_pair = b.keygen(variant)?;
                let container = seal(b, variant, &key_pair.public_key, plaintext)?;
                Ok((key_pair, container))
            })?;

        let backend = label(backend);
        let digest_algorithm = options.digest_algorithm;
        let digest = digest(&container.serialize(), digest_algorithm);
        debug!(
            backend = %backend.backend,
            variant = %variant,
            bytes = plaintext.len(),
            "encrypted payload"
        );

        Ok(EncryptOutcome {
            container,
            key_pair,
            variant,
            backend,
            digest,
            digest_algorithm,
        })
    }

    /// Encrypt `plaintext` to an existing public key. The variant comes from
    /// the public-key length and must be one of the three known sizes.
    pub fn encrypt_for(
        &self,
        plaintext: &[u8],
        public_key: &[u8],
        options: &PipelineOptions,
    ) -> CryptoResult<Sealed> {
        let variant = KemVariant::from_public_key_len(public_key.len())?;
        let selection = self.registry.select_for(variant, options.allow_insecure_mock)?;

        let (container, backend) = self.run_with_fallback(selection.backend, variant, |b| {
            seal(b, variant, public_key, plaintext)
        })?;

        Ok(Sealed {
            container,
            variant,
            backend: label(backend),
        })
    }

    /// Decrypt a parsed container with `private_key`.
    ///
    /// Returns plaintext only if every stage succeeds.
    pub fn decrypt(
        &self,
        container: &Container,
        private_key: &[u8],
        options: &PipelineOptions,
    ) -> CryptoResult<Vec<u8>> {
        let variant = resolve_variant(private_key)?;
        let selection = self.registry.select_for(variant, options.allow_insecure_mock)?;

        let (shared_secret, backend) = self.run_with_fallback(selection.backend, variant, |b| {
            b.decapsulate(variant, private_key, &container.kem_ciphertext)
        })?;
        let key = derive(shared_secret.as_slice())?;
        drop(shared_secret);

        let plaintext = aead_decrypt(&container.ciphertext, &key, &container.nonce)?;
        debug!(
            backend = %backend,
            variant = %variant,
            bytes = plaintext.len(),
            "decrypted payload"
        );
        Ok(plaintext)
    }

    /// Parse container bytes and decrypt.
    pub fn decrypt_bytes(
        &self,
        container_bytes: &[u8],
        private_key: &[u8],
        options: &PipelineOptions,
    ) -> CryptoResult<Vec<u8>> {
        let container = Container::parse(container_bytes)?;
        self.decrypt(&container, private_key, options)
    }

    fn run_with_fallback<T>(
        &self,
        primary: BackendKind,
        variant: KemVariant,
        op: impl FnMut(BackendKind) -> CryptoResult<T>,
    ) -> CryptoResult<(T, BackendKind)> {
        run_with_fallback(self.registry, primary, variant, op)
    }
}

/// Encapsulate to `public_key`, derive the AEAD key, encrypt.
fn seal(
    backend: BackendKind,
    variant: KemVariant,
    public_key: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Container> {
    let encapsulated = backend.encapsulate(variant, public_key)?;
    let key = derive(encapsulated.shared_secret.as_slice())?;
    let (nonce, ciphertext) = aead_encrypt(plaintext, &key)?;
    Ok(Container::new(encapsulated.kem_ciphertext, nonce, ciphertext))
}

fn label(backend: BackendKind) -> BackendSelection {
    if backend.is_insecure() {
        warn!(backend = %backend, "output produced by the INSECURE mock KEM backend");
    }
    BackendSelection {
        backend,
        insecure: backend.is_insecure(),
    }
}

/// Run `op` on `primary`; on a retryable failure, run it once more on the
/// next real backend supporting `variant`.
fn run_with_fallback<T>(
    registry: &BackendRegistry,
    primary: BackendKind,
    variant: KemVariant,
    mut op: impl FnMut(BackendKind) -> CryptoResult<T>,
) -> CryptoResult<(T, BackendKind)> {
    match op(primary) {
        Ok(value) => Ok((value, primary)),
        Err(err) if err.is_retryable() => {
            let Some(secondary) = registry.fallback_after(primary, variant) else {
                return Err(err);
            };
            warn!(
                failed = %primary,
                retry = %secondary,
                variant = %variant,
                "KEM backend failed, retrying on secondary: {err}"
            );
            op(secondary).map(|value| (value, secondary))
        }
        Err(err) => Err(err),
    }
}
