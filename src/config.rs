//! Index configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "namespace_prefix": "scalar",
//!   "text_delimiter": 1,
//!   "sync_writes": true
//! }
//! ```
//!
//! Every key except `data_dir` is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::{DEFAULT_DELIMITER, KEY_SEPARATOR};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_namespace_prefix() -> String {
    "scalar".to_string()
}

fn default_text_delimiter() -> u8 {
    DEFAULT_DELIMITER
}

fn default_sync_writes() -> bool {
    true
}

/// Settings shared by the index and its durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Root directory; the store log lives under `<data_dir>/index/`
    pub data_dir: PathBuf,
    /// Namespace of field `n` is `"<prefix>:<n>"`
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    /// Separator of multi-valued text fields
    #[serde(default = "default_text_delimiter")]
    pub text_delimiter: u8,
    /// fsync every log append
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            namespace_prefix: default_namespace_prefix(),
            text_delimiter: default_text_delimiter(),
            sync_writes: default_sync_writes(),
        }
    }
}

impl IndexConfig {
    /// Default settings rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load and validate configuration from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: IndexConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make keys ambiguous.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "namespace_prefix must not be empty".to_string(),
            ));
        }
        if self.namespace_prefix.contains(':') {
            return Err(ConfigError::Invalid(format!(
                "namespace_prefix '{}' must not contain ':'",
                self.namespace_prefix
            )));
        }
        if self.text_delimiter == KEY_SEPARATOR {
            return Err(ConfigError::Invalid(
                "text_delimiter must differ from the key separator ':'".to_string(),
            ));
        }
        Ok(())
    }

    /// Name of the namespace that holds `field`'s rows.
    pub fn namespace_name(&self, field: usize) -> String {
        format!("{}:{}", self.namespace_prefix, field)
    }
}
