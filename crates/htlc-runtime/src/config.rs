//! # Runtime Configuration
//!
//! Everything the runtime needs, loaded from `HTLC_*` environment variables
//! on top of the coordinator defaults.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HTLC_SUBMISSION_TIMEOUT_MS` | 30000 |
//! | `HTLC_CONFIRMATION_TIMEOUT_MS` | 120000 |
//! | `HTLC_SUBMISSION_ATTEMPTS` | 3 |
//! | `HTLC_BACKOFF_MS` | 500 |
//! | `HTLC_MAX_LEG_RETRIES` | 5 |
//! | `HTLC_POLL_INTERVAL_MS` | 15000 |
//! | `HTLC_MAX_POLL_PASSES` | 0 (until shutdown) |
//! | `HTLC_WITHDRAWAL_DELAY_SECS` | 30 |
//! | `HTLC_CANCELLATION_DELAY_SECS` | 600 |
//! | `HTLC_SRC_CANCELLATION_DELAY_SECS` | 14400 |
//! | `HTLC_ORDER_TAG` | `VortexAuctionOrder` |
//! | `HTLC_EVM_FACTORY` | zero address |
//! | `HTLC_STORAGE` | `memory` (`rocksdb` needs the feature) |
//! | `HTLC_DATA_DIR` | `./data` |
//! | `HTLC_MIN_DISK_SPACE_PERCENT` | 5 |

use crate::telemetry::TelemetryConfig;
use htlc_core::domain::{invariant_address, ChainType, CoordinatorConfig, SwapError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Coordinator settings are inconsistent.
    #[error("invalid coordinator settings: {0}")]
    Coordinator(#[from] SwapError),

    /// Storage backend was not compiled in.
    #[error("storage backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    /// Not enough free disk space for the data directory.
    #[error("insufficient disk space at {path:?}: {available_percent}% free, {required_percent}% required")]
    InsufficientDiskSpace {
        /// Data directory.
        path: PathBuf,
        /// Free space.
        available_percent: u8,
        /// Configured minimum.
        required_percent: u8,
    },

    /// Filesystem error while preparing storage.
    #[error("storage I/O error: {0}")]
    Io(String),
}

/// Record store backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory; records are lost on exit.
    #[default]
    Memory,
    /// RocksDB under the data directory.
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(other.to_string()),
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Backend.
    pub backend: StorageBackend,
    /// Data directory (RocksDB only).
    pub data_dir: PathBuf,
    /// Minimum free disk percentage before refusing to start.
    pub min_disk_space_percent: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            min_disk_space_percent: 5,
        }
    }
}

/// Complete runtime configuration.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Coordinator settings.
    pub coordinator: CoordinatorConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// Storage settings.
    pub storage: StorageConfig,
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };
        let c = &mut config.coordinator;

        if let Some(ms) = parse::<u64, _>(&lookup, "HTLC_SUBMISSION_TIMEOUT_MS")? {
            c.submission_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "HTLC_CONFIRMATION_TIMEOUT_MS")? {
            c.confirmation_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse(&lookup, "HTLC_SUBMISSION_ATTEMPTS")? {
            c.submission_attempts = n;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "HTLC_BACKOFF_MS")? {
            c.backoff_base = Duration::from_millis(ms);
        }
        if let Some(n) = parse(&lookup, "HTLC_MAX_LEG_RETRIES")? {
            c.max_leg_retries = n;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "HTLC_POLL_INTERVAL_MS")? {
            c.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse(&lookup, "HTLC_MAX_POLL_PASSES")? {
            c.max_poll_passes = n;
        }
        if let Some(secs) = parse(&lookup, "HTLC_WITHDRAWAL_DELAY_SECS")? {
            c.withdrawal_delay_secs = secs;
        }
        if let Some(secs) = parse(&lookup, "HTLC_CANCELLATION_DELAY_SECS")? {
            c.cancellation_delay_secs = secs;
        }
        if let Some(secs) = parse(&lookup, "HTLC_SRC_CANCELLATION_DELAY_SECS")? {
            c.src_cancellation_delay_secs = secs;
        }
        if let Some(tag) = lookup("HTLC_ORDER_TAG") {
            c.order_tag = tag;
        }
        if let Some(factory) = lookup("HTLC_EVM_FACTORY") {
            c.evm_factory = factory;
        }

        if let Some(backend) = parse::<StorageBackend, _>(&lookup, "HTLC_STORAGE")? {
            config.storage.backend = backend;
        }
        if let Some(dir) = lookup("HTLC_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(percent) = parse(&lookup, "HTLC_MIN_DISK_SPACE_PERCENT")? {
            config.storage.min_disk_space_percent = percent;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator or storage cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coordinator.validate()?;
        invariant_address(ChainType::Evm, "HTLC_EVM_FACTORY", &self.coordinator.evm_factory)?;
        if self.coordinator.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "HTLC_POLL_INTERVAL_MS",
                value: "0".into(),
            });
        }
        if self.storage.min_disk_space_percent > 100 {
            return Err(ConfigError::InvalidValue {
                key: "HTLC_MIN_DISK_SPACE_PERCENT",
                value: self.storage.min_disk_space_percent.to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
