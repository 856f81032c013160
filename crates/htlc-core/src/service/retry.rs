//! Bounded retry with exponential backoff for retryable errors.

use crate::domain::SwapError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Attempt budget and first delay.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub attempts: usize,
    /// Delay before the second attempt; doubles after each retry.
    pub base_delay: Duration,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out.
pub async fn with_backoff<F, Fut, T>(policy: RetryPolicy, operation: &str, op: F) -> Result<T, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
{
    with_backoff_when(policy, operation, SwapError::is_retryable, op).await
}

/// Like [`with_backoff`], but only errors accepted by `should_retry` are
/// retried.
pub async fn with_backoff_when<F, Fut, T, P>(
    policy: RetryPolicy,
    operation: &str,
    should_retry: P,
    mut op: F,
) -> Result<T, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
    P: Fn(&SwapError) -> bool,
{
    let mut remaining = policy.attempts.max(1);
    let mut delay = policy.base_delay;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) && remaining > 1 => {
                remaining -= 1;
                warn!(
                    "[htlc] {} failed ({}), retrying in {:?} ({} attempts left)",
                    operation, err, delay, remaining
                );
                sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }
}
