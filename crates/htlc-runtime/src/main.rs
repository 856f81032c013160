//! # HTLC Swap Coordinator
//!
//! Entry point. Configuration comes from `HTLC_*` environment variables;
//! see `htlc_runtime::config` for the full list.

use anyhow::{Context, Result};
use htlc_runtime::{init_tracing, HtlcRuntime, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.telemetry).context("failed to initialize logging")?;

    let runtime = HtlcRuntime::new(config)?;
    runtime.start();

    info!("Coordinator is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
