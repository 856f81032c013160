//! Bounded reconciliation loop.
//!
//! Polls every open swap at a fixed interval and brings its record in line
//! with both leg monitors. Stops after `max_passes` passes (0 = unbounded)
//! or when the shutdown channel flips to `true`.

use crate::domain::{SwapError, SwapStatus};
use crate::ports::inbound::SwapApi;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Swaps looked at.
    pub scanned: usize,
    /// Swaps that became COMPLETED during this pass.
    pub completed: usize,
    /// Swaps whose reconciliation failed.
    pub errors: usize,
}

impl ReconcileReport {
    fn merge(&mut self, other: &ReconcileReport) {
        self.scanned += other.scanned;
        self.completed += other.completed;
        self.errors += other.errors;
    }
}

/// Reconcile every swap that has not completed.
pub async fn reconcile_all<A>(api: &A) -> Result<ReconcileReport, SwapError>
where
    A: SwapApi + ?Sized,
{
    let mut report = ReconcileReport::default();
    for swap in api.list_swaps().await? {
        if swap.status.is_terminal() {
            continue;
        }
        report.scanned += 1;
        match api.reconcile(swap.id).await {
            Ok(record) if record.status == SwapStatus::Completed => report.completed += 1,
            Ok(_) => {}
            Err(err) => {
                report.errors += 1;
                warn!("[htlc] reconcile of swap {} failed: {}", swap.id, err);
            }
        }
    }
    Ok(report)
}

/// Callback invoked with each pass's report.
pub type PassObserver = Arc<dyn Fn(&ReconcileReport) + Send + Sync>;

/// Periodic reconciliation driver.
pub struct MonitorLoop<A: ?Sized> {
    api: Arc<A>,
    interval: Duration,
    max_passes: u64,
    observer: Option<PassObserver>,
}

impl<A> MonitorLoop<A>
where
    A: SwapApi + ?Sized + 'static,
{
    /// Loop over `api` every `interval`, at most `max_passes` times.
    pub fn new(api: Arc<A>, interval: Duration, max_passes: u64) -> Self {
        Self {
            api,
            interval,
            max_passes,
            observer: None,
        }
    }

    /// Call `observer` after every successful pass.
    pub fn with_observer(mut self, observer: PassObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run until the pass budget is spent or `shutdown` reads `true`.
    /// Returns the accumulated report.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> ReconcileReport {
        let mut ticks = IntervalStream::new(tokio::time::interval(self.interval));
        let mut total = ReconcileReport::default();
        let mut passes = 0u64;

        info!(
            "[htlc] Reconciliation loop started (interval {:?}, max passes {})",
            self.interval,
            if self.max_passes == 0 { "unbounded".to_string() } else { self.max_passes.to_string() }
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                tick = ticks.next() => {
                    if tick.is_none() {
                        break;
                    }
                    match reconcile_all(self.api.as_ref()).await {
                        Ok(report) => {
                            debug!("[htlc] Reconciliation pass {}: {:?}", passes + 1, report);
                            if let Some(observer) = &self.observer {
                                (**observer)(&report);
                            }
                            total.merge(&report);
                        }
                        Err(err) => warn!("[htlc] Reconciliation pass {} failed: {}", passes + 1, err),
                    }
                    passes += 1;
                    if self.max_passes != 0 && passes >= self.max_passes {
                        break;
                    }
                }
            }
        }

        info!("[htlc] Reconciliation loop stopped after {} passes", passes);
        total
    }
}
