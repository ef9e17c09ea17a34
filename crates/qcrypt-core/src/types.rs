use serde::{Deserialize, Serialize};

/// Outcome category shown to whoever sits on the far side of a service
/// boundary (HTTP client, CLI user).
///
/// Deliberately coarse: a forged ciphertext and a truncated container both
/// read as `CannotDecrypt`, so a caller probing the service cannot learn
/// which stage rejected their input. The precise kind stays available to
/// logs and tests through the originating error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// The request itself was unusable (unrecognised key length, bad encoding)
    BadInput,
    /// Authentication or container parsing failed
    CannotDecrypt,
    /// No usable cryptographic backend, KDF failure, or similar
    ServerMisconfigured,
}

impl ClientStatus {
    /// Generic external message for this status
    pub fn message(self) -> &'static str {
        match self {
            ClientStatus::BadInput => "invalid key or request",
            ClientStatus::CannotDecrypt => "cannot decrypt",
            ClientStatus::ServerMisconfigured => "server cryptography is misconfigured",
        }
    }

    /// Closest HTTP status code, for glue layers that speak HTTP
    pub fn http_status(self) -> u16 {
        match self {
            ClientStatus::BadInput => 400,
            ClientStatus::CannotDecrypt => 422,
            ClientStatus::ServerMisconfigured => 500,
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
