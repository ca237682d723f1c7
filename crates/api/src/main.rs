//! Proctoring Monitor - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("PROCTOR_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    init_logging(&config.server)
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))?;

    info!("=== Proctor Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    run_server(&config, metrics).await?;

    Ok(())
}
