//! # HTLC Runtime
//!
//! Process wiring for the swap coordinator.
//!
//! ## Modules
//!
//! - `config` - `HTLC_*` environment configuration
//! - `telemetry` - `tracing-subscriber` setup
//! - `metrics` - Prometheus counters fed by the reconciliation loop
//! - `storage` - record store backends (memory, RocksDB)
//! - `container` - builds the coordinator and its collaborators
//! - `runtime` - reconciliation loop lifecycle
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install logging
//! 3. Open record stores
//! 4. Wire chain clients and the coordinator
//! 5. Spawn the reconciliation loop
//! 6. Wait for Ctrl+C, then stop the loop

#![warn(missing_docs)]

pub mod config;
pub mod container;
pub mod metrics;
pub mod runtime;
pub mod storage;
pub mod telemetry;

pub use config::{ConfigError, RuntimeConfig, StorageBackend, StorageConfig};
pub use container::{RuntimeCoordinator, SwapContainer};
pub use metrics::{gather, pass_observer, register_metrics, MetricsError};
pub use runtime::HtlcRuntime;
pub use storage::{open_stores, Stores};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryError};
