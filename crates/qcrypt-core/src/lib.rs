pub mod config;
pub mod error;
pub mod types;

pub use error::{QcryptError, QcryptResult};
pub use types::ClientStatus;
