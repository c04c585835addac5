//! # weft-node
//!
//! Runs one weft node role until Ctrl+C. See [`node_runtime::config`] for the
//! environment variables.

use anyhow::{Context, Result};
use node_runtime::{NodeRuntime, RuntimeConfig};
use tracing::info;
use weft_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("failed to read runtime configuration")?;
    let _telemetry = init_telemetry(&TelemetryConfig::for_role(config.role.as_str()))
        .context("failed to initialize telemetry")?;

    info!(
        role = %config.role,
        front = ?config.front_url,
        back = ?config.back_url,
        "starting weft node"
    );
    let runtime = NodeRuntime::start(&config)
        .with_context(|| format!("failed to start {} node", config.role))?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    runtime.shutdown();
    Ok(())
}
