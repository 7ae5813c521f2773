//! Collector configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. YAML file (`version: 1` schema)
//! 3. CLI flags / environment variables (see `cli`)
//!
//! ```yaml
//! version: 1
//! server:
//!   bind_addr: "0.0.0.0:5001"
//!   request_timeout_secs: 30
//!   max_body_bytes: 1048576
//! storage:
//!   backend: sqlite
//!   sqlite_path: /var/lib/lineage/lineage.db
//!   lock_stripes: 64
//! logging:
//!   level: info
//!   json: false
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, ConfigResult};

const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Requests running longer than this are answered with 408
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on restart
    Memory,
    /// SQLite database file
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
    /// Per-run lock stripes; `None` picks a value from the CPU count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_stripes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            sqlite_path: PathBuf::from("lineage.db"),
            lock_stripes: None,
        }
    }
}

impl StorageConfig {
    pub fn lock_stripes(&self) -> usize {
        self.lock_stripes
            .unwrap_or_else(lineage_graph::RunLocks::default_stripes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// YAML Schema v1
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    version: Option<u32>,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl CollectorConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        Ok(Self {
            server: file.server,
            storage: file.storage,
            logging: file.logging,
        })
    }

    /// Range and consistency checks
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "server.max_body_bytes",
                "must be greater than 0",
            ));
        }
        if self.storage.lock_stripes == Some(0) {
            return Err(ConfigError::invalid(
                "storage.lock_stripes",
                "must be greater than 0",
            ));
        }
        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.sqlite_path.as_os_str().is_empty()
        {
            return Err(ConfigError::invalid(
                "storage.sqlite_path",
                "required when backend is sqlite",
            ));
        }
        EnvFilter::try_new(&self.logging.level)
            .map_err(|e| ConfigError::invalid("logging.level", e))?;
        Ok(())
    }
}
