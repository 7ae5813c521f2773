/*
 * Lineage Collector - HTTP front end for the lineage graph
 *
 * Receives OpenLineage-style run events and answers lineage queries.
 *
 * Architecture:
 * - Config (YAML file + CLI/env overrides)
 * - Store selection (in-memory or SQLite)
 * - HTTP API (axum + tower-http layers)
 * - Graceful shutdown on Ctrl-C / SIGTERM
 */

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod telemetry;

pub use api::{router, AppState};
pub use cli::Cli;
pub use config::{CollectorConfig, LoggingConfig, ServerConfig, StorageBackend, StorageConfig};
pub use error::{ConfigError, ConfigResult};

use lineage_graph::{InMemoryLineageStore, LineageService, LineageStore, SqliteLineageStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Build the configured store backend
pub fn open_store(config: &StorageConfig) -> lineage_graph::Result<Arc<dyn LineageStore>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory lineage store");
            Ok(Arc::new(InMemoryLineageStore::new()))
        }
        StorageBackend::Sqlite => {
            info!(path = %config.sqlite_path.display(), "Opening SQLite lineage store");
            Ok(Arc::new(SqliteLineageStore::open(&config.sqlite_path)?))
        }
    }
}

/// Wire store, service and router, then serve until a shutdown signal arrives.
pub async fn run(config: CollectorConfig) -> anyhow::Result<()> {
    let store = open_store(&config.storage)?;
    let lock_stripes = config.storage.lock_stripes();
    let service = LineageService::new(store, lock_stripes);
    let app = router(AppState::new(service), &config.server);

    let listener = TcpListener::bind(config.server.bind_addr).await?;
    info!(
        addr = %config.server.bind_addr,
        backend = ?config.storage.backend,
        lock_stripes,
        timeout_secs = config.server.request_timeout_secs,
        "Lineage collector listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
