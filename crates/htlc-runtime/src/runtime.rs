//! Runtime lifecycle: start the reconciliation loop, stop it on shutdown.

use crate::config::RuntimeConfig;
use crate::container::SwapContainer;
use crate::metrics;
use anyhow::{Context, Result};
use htlc_core::{MonitorLoop, ReconcileReport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running swap coordinator.
pub struct HtlcRuntime {
    container: Arc<SwapContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    monitor: Mutex<Option<JoinHandle<ReconcileReport>>>,
}

impl HtlcRuntime {
    /// Build the container from `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let container = SwapContainer::new(config).context("failed to build swap container")?;
        Ok(Self::from_container(container))
    }

    /// Wrap an already built container.
    pub fn from_container(container: SwapContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            monitor: Mutex::new(None),
        }
    }

    /// Spawn the reconciliation loop. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut slot = self.monitor.lock();
        if slot.is_some() {
            return;
        }
        let config = &self.container.config.coordinator;
        let monitor = MonitorLoop::new(
            self.container.coordinator.clone(),
            config.poll_interval,
            config.max_poll_passes,
        )
        .with_observer(metrics::pass_observer());
        if let Err(e) = metrics::register_metrics() {
            warn!("Metrics unavailable: {}", e);
        }
        *slot = Some(tokio::spawn(monitor.run(self.shutdown_rx.clone())));

        info!("===========================================");
        info!("  HTLC Swap Coordinator v{}", htlc_core::VERSION);
        info!("===========================================");
        info!("Poll interval: {:?}", config.poll_interval);
        info!("Storage: {:?}", self.container.config.storage.backend);
    }

    /// Signal the loop to stop and wait for it. Returns what the loop
    /// reconciled over its lifetime.
    pub async fn shutdown(&self) -> ReconcileReport {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let handle = self.monitor.lock().take();
        let report = match handle {
            Some(handle) => match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!("Reconciliation task failed: {}", e);
                    ReconcileReport::default()
                }
            },
            None => ReconcileReport::default(),
        };
        info!(
            "Shutdown complete (scanned {}, completed {}, errors {})",
            report.scanned, report.completed, report.errors
        );
        match metrics::gather() {
            Ok(text) => debug!("Final metrics:\n{}", text),
            Err(e) => warn!("Failed to export metrics: {}", e),
        }
        report
    }

    /// Shared container.
    pub fn container(&self) -> Arc<SwapContainer> {
        Arc::clone(&self.container)
    }
}
