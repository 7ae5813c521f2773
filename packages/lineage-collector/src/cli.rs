use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{CollectorConfig, StorageBackend};
use crate::error::ConfigResult;

#[derive(Debug, Parser)]
#[command(name = "lineage-collector")]
#[command(about = "Collects run lineage events and serves the resulting graph", version)]
pub struct Cli {
    /// Configuration file (YAML, `version: 1`)
    #[arg(short, long, env = "LINEAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP bind address
    #[arg(long, env = "LINEAGE_BIND_ADDR")]
    pub bind_addr: Option<SocketAddr>,

    /// Storage backend
    #[arg(long, value_enum, env = "LINEAGE_STORAGE")]
    pub storage: Option<StorageBackend>,

    /// SQLite database file (sqlite backend)
    #[arg(long, env = "LINEAGE_SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `lineage_graph=debug`
    #[arg(long, env = "LINEAGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LINEAGE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags; validated.
    pub fn load_config(&self) -> ConfigResult<CollectorConfig> {
        let mut config = match &self.config {
            Some(path) => CollectorConfig::from_yaml_file(path)?,
            None => CollectorConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut CollectorConfig) {
        if let Some(addr) = self.bind_addr {
            config.server.bind_addr = addr;
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(path) = &self.sqlite_path {
            config.storage.sqlite_path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_no_args_gives_defaults() {
        let cli = Cli::try_parse_from(["lineage-collector"]).unwrap();
        assert_eq!(cli.load_config().unwrap(), CollectorConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"version: 1\nstorage:\n  backend: sqlite\n  sqlite_path: from-file.db\n")
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "lineage-collector",
            "--config",
            &path,
            "--sqlite-path",
            "from-flag.db",
            "--bind-addr",
            "127.0.0.1:6001",
            "--json-logs",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.sqlite_path, PathBuf::from("from-flag.db"));
        assert_eq!(config.server.bind_addr, "127.0.0.1:6001".parse().unwrap());
        assert!(config.logging.json);
    }

    #[test]
    fn test_storage_flag_parses_value_enum() {
        let cli = Cli::try_parse_from(["lineage-collector", "--storage", "sqlite"]).unwrap();
        assert_eq!(cli.storage, Some(StorageBackend::Sqlite));

        assert!(Cli::try_parse_from(["lineage-collector", "--storage", "postgres"]).is_err());
    }

    #[test]
    fn test_invalid_log_level_fails_validation() {
        let cli =
            Cli::try_parse_from(["lineage-collector", "--log-level", "x=nonsense"]).unwrap();
        assert!(matches!(
            cli.load_config().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }
}
