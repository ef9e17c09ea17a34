//! qcrypt-crypto: hybrid post-quantum file encryption
//!
//! Architecture: KEM-then-AEAD
//!
//! Pipeline:
//! ```text
//! encrypt: plaintext → ML-KEM keygen → encapsulate → HKDF-SHA256 → AES-256-GCM → Container (JSON)
//! decrypt: Container → resolve variant (private key length) → decapsulate → HKDF-SHA256
//!          → AES-256-GCM open
//! ```
//!
//! Key material:
//! ```text
//! KEM key pair (per encryption, returned to the caller, never retained)
//!   └── Shared secret (32 bytes, transient)
//!       └── Symmetric key: HKDF-SHA256(ikm=shared_secret, salt=∅, info="kyber-aead-encryption-v1")
//!           └── AES-256-GCM (nonce=random 96-bit, AAD=∅)
//! ```
//!
//! KEM implementations are discovered at runtime by [`registry::BackendRegistry`].
//! The insecure mock KEM is only ever used when a caller explicitly asks for it.

pub mod aead;
pub mod backend;
pub mod codec;
pub mod container;
pub mod digest;
pub mod error;
pub mod kdf;
pub mod pipeline;
pub mod registry;
pub mod variant;

pub use aead::{aead_decrypt, aead_encrypt};
pub use backend::{BackendKind, KeyPair};
pub use codec::{decode_key, encode_key, encode_key_tagged, DecodedKey, KeyEncoding};
pub use container::Container;
pub use digest::{digest, digest_named, DigestAlgorithm};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive, SymmetricKey};
pub use pipeline::{EncryptOutcome, Pipeline, PipelineOptions, Sealed};
pub use registry::{select_backend, BackendRegistry, BackendSelection};
pub use variant::{resolve_variant, KemVariant};

/// Size of the derived AEAD key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an ML-KEM shared secret
pub const SHARED_SECRET_SIZE: usize = 32;

/// HKDF info string binding derived keys to this format version
pub const KDF_INFO: &[u8] = b"kyber-aead-encryption-v1";
