//! Prometheus metrics for the reconciliation loop.
//!
//! Naming convention: `htlc_<area>_<metric>_<unit>`.

use htlc_core::{PassObserver, ReconcileReport};
use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::Arc;
use thiserror::Error;

/// Metrics registration or encoding failure.
#[derive(Debug, Error)]
#[error("metrics error: {0}")]
pub struct MetricsError(String);

lazy_static! {
    /// Registry holding every coordinator metric.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Reconciliation passes run.
    pub static ref RECONCILE_PASSES: IntCounter = IntCounter::new(
        "htlc_reconcile_passes_total",
        "Reconciliation passes run"
    ).expect("metric creation failed");

    /// Swaps looked at across all passes.
    pub static ref SWAPS_SCANNED: IntCounter = IntCounter::new(
        "htlc_reconcile_swaps_scanned_total",
        "Open swaps examined by reconciliation"
    ).expect("metric creation failed");

    /// Swaps reconciliation moved to COMPLETED.
    pub static ref SWAPS_COMPLETED: IntCounter = IntCounter::new(
        "htlc_reconcile_swaps_completed_total",
        "Swaps found completed by reconciliation"
    ).expect("metric creation failed");

    /// Per-swap reconciliation failures.
    pub static ref RECONCILE_ERRORS: IntCounter = IntCounter::new(
        "htlc_reconcile_errors_total",
        "Swaps whose reconciliation failed"
    ).expect("metric creation failed");

    /// Open swaps seen by the latest pass.
    pub static ref OPEN_SWAPS: Gauge = Gauge::new(
        "htlc_reconcile_open_swaps",
        "Open swaps in the most recent pass"
    ).expect("metric creation failed");
}

/// Register all metrics. Safe to call more than once.
pub fn register_metrics() -> Result<(), MetricsError> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(RECONCILE_PASSES.clone()),
        Box::new(SWAPS_SCANNED.clone()),
        Box::new(SWAPS_COMPLETED.clone()),
        Box::new(RECONCILE_ERRORS.clone()),
        Box::new(OPEN_SWAPS.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(MetricsError(e.to_string())),
        }
    }
    Ok(())
}

/// Fold one pass into the metrics.
pub fn record_pass(report: &ReconcileReport) {
    RECONCILE_PASSES.inc();
    SWAPS_SCANNED.inc_by(report.scanned as u64);
    SWAPS_COMPLETED.inc_by(report.completed as u64);
    RECONCILE_ERRORS.inc_by(report.errors as u64);
    OPEN_SWAPS.set(report.scanned.saturating_sub(report.completed) as f64);
}

/// Observer that feeds [`record_pass`].
pub fn pass_observer() -> PassObserver {
    Arc::new(|report: &ReconcileReport| record_pass(report))
}

/// Text exposition of the registry.
pub fn gather() -> Result<String, MetricsError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| MetricsError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError(e.to_string()))
}
