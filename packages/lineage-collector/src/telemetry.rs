use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ConfigError, ConfigResult};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> ConfigResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::invalid("logging.level", e))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?;
    }

    info!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
