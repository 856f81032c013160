//! Logging setup.
//!
//! A `tracing-subscriber` registry with an `EnvFilter` and one fmt layer:
//! JSON in containers, human-readable otherwise.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging initialization failure.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Filter directive could not be parsed.
    #[error("invalid log filter '{0}'")]
    InvalidFilter(String),
    /// A global subscriber is already installed.
    #[error("tracing subscriber init failed: {0}")]
    Init(String),
}

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Service name attached to the startup line.
    pub service_name: String,
    /// Filter directives (`info`, `htlc_core=debug`, ...).
    pub log_level: String,
    /// JSON output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "htlc-runtime".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Read settings with `lookup`.
    ///
    /// - `HTLC_SERVICE_NAME` (default: htlc-runtime)
    /// - `HTLC_LOG_LEVEL` or `RUST_LOG` (default: info)
    /// - `HTLC_JSON_LOGS` (default: true inside a container)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        Self {
            service_name: lookup("HTLC_SERVICE_NAME").unwrap_or_else(|| "htlc-runtime".to_string()),
            log_level: lookup("HTLC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
            json_logs: lookup("HTLC_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|_| TelemetryError::InvalidFilter(self.log_level.clone()))
    }
}

/// Install the global subscriber.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.filter()?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
