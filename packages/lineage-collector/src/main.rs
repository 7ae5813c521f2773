//! Lineage collector binary.

use clap::Parser;
use lineage_collector::{telemetry, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    telemetry::init(&config.logging)?;

    lineage_collector::run(config).await
}
