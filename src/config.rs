#![forbid(unsafe_code)]

//! TOML configuration shared by the CLI and the HTTP server.
//!
//! Every section is optional; absent keys take the defaults documented on
//! each field. A missing config file is not an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::DEFAULT_FILE_SUFFIX;
use crate::inspect::DEFAULT_SAMPLE_ROWS;

/// Complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LakeConfig {
    /// Where partitions are read from.
    pub storage: StorageConfig,
    /// Load limits and windows.
    pub ingest: IngestConfig,
    /// Default language model.
    pub provider: ProviderConfig,
    /// HTTP listener.
    pub server: ServerConfig,
}

/// `[storage]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory served by the local store. Defaults to the working directory.
    pub root: Option<PathBuf>,
    /// Prefix under which `year=/month=/day=` partitions live.
    pub base_path: String,
    /// Suffix a key must end with to be loaded.
    pub file_suffix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            base_path: "csv-data/".to_owned(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_owned(),
        }
    }
}

/// `[ingest]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Maximum number of files loaded per request; unlimited when unset.
    pub file_limit: Option<usize>,
    /// Length of the window used when a request names no dates.
    pub default_window_days: u32,
    /// Rows rendered into the sample shown to the language model.
    pub sample_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            file_limit: None,
            default_window_days: 30,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// `[provider]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider used when a request does not pick one.
    pub name: String,
    /// Model override passed to the provider.
    pub model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "passthrough".to_owned(),
            model: None,
        }
    }
}

/// `[server]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Origins allowed by CORS. Empty disables CORS; `*` allows any origin.
    pub allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
            allow_origins: Vec::new(),
        }
    }
}

impl LakeConfig {
    /// Loads `explicit`, or the default path when `None`.
    ///
    /// A path that does not exist yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit.or_else(default_config_path) {
            Some(path) if path.exists() => read_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn read_file(path: &Path) -> Result<LakeConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    LakeConfig::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Failure loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid configuration.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// `<config dir>/lakeq/lakeq.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("lakeq").join("lakeq.toml"))
}
