//! # Coordinator Configuration

use super::errors::SwapError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tag hashed into `bytes32` as the EVM order hash of every swap.
pub const DEFAULT_ORDER_TAG: &str = "VortexAuctionOrder";

/// Swap coordinator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Deadline for a single `submit` call.
    pub submission_timeout: Duration,
    /// Deadline for `await_confirmation`.
    pub confirmation_timeout: Duration,
    /// Submission attempts before giving up on a transport error.
    pub submission_attempts: usize,
    /// First backoff delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Retries allowed on a FAILED leg monitor.
    pub max_leg_retries: u32,
    /// Interval between reconciliation passes.
    pub poll_interval: Duration,
    /// Upper bound on reconciliation passes; 0 runs until cancelled.
    pub max_poll_passes: u64,
    /// Default delay from initiation to the public-withdrawal window.
    pub withdrawal_delay_secs: u64,
    /// Default delay from initiation to cancellation.
    pub cancellation_delay_secs: u64,
    /// Source-side cancellation delay passed to the escrow factory.
    pub src_cancellation_delay_secs: u64,
    /// Tag encoded as the EVM order hash.
    pub order_tag: String,
    /// EVM escrow factory address.
    pub evm_factory: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            submission_timeout: Duration::from_secs(30),
            confirmation_timeout: Duration::from_secs(120),
            submission_attempts: 3,
            backoff_base: Duration::from_millis(500),
            max_leg_retries: 5,
            poll_interval: Duration::from_secs(15),
            max_poll_passes: 0,
            withdrawal_delay_secs: 30,
            cancellation_delay_secs: 600,
            src_cancellation_delay_secs: 4 * 3600,
            order_tag: DEFAULT_ORDER_TAG.to_string(),
            evm_factory: "0x0000000000000000000000000000000000000000".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Short timeouts and no backoff, for tests.
    pub fn for_testing() -> Self {
        Self {
            submission_timeout: Duration::from_millis(200),
            confirmation_timeout: Duration::from_millis(200),
            backoff_base: Duration::from_millis(1),
            poll_interval: Duration::from_millis(10),
            evm_factory: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            ..Self::default()
        }
    }

    /// Reject inconsistent windows and zero deadlines.
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.withdrawal_delay_secs == 0 {
            return Err(SwapError::Validation(
                "withdrawal delay must be at least one second".into(),
            ));
        }
        if self.withdrawal_delay_secs >= self.cancellation_delay_secs {
            return Err(SwapError::Validation(format!(
                "withdrawal delay ({}s) must be shorter than cancellation delay ({}s)",
                self.withdrawal_delay_secs, self.cancellation_delay_secs
            )));
        }
        if self.submission_timeout.is_zero() || self.confirmation_timeout.is_zero() {
            return Err(SwapError::Validation("timeouts must be non-zero".into()));
        }
        if self.submission_attempts == 0 {
            return Err(SwapError::Validation("submission attempts must be >= 1".into()));
        }
        if self.order_tag.len() > 32 {
            return Err(SwapError::Validation(format!(
                "order tag '{}' exceeds 32 bytes",
                self.order_tag
            )));
        }
        Ok(())
    }
}
