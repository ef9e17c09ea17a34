use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QcryptError, QcryptResult};

/// Top-level configuration (loaded from qcrypt.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QcryptConfig {
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Encryption pipeline settings.
///
/// These are handed to the pipeline explicitly per call; the crypto crate
/// never reads this file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// KEM parameter set used for new encryptions: "512", "768" or "1024"
    pub variant: String,
    /// Integrity digest: "sha256", "sha512" or "blake3"
    pub digest_algorithm: String,
    /// Permit the insecure mock KEM when no real backend is available
    pub allow_insecure_mock: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: "768".into(),
            digest_algorithm: "sha256".into(),
            allow_insecure_mock: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl QcryptConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> QcryptResult<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| QcryptError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> QcryptResult<String> {
        toml::to_string_pretty(self).map_err(|e| QcryptError::Config(e.to_string()))
    }
}
