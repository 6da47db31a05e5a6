//! Retry loop with linear backoff for the execution phase.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::{EngineError, Result};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before retry `n` is `base_delay * n`
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the attempt following failed attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Runs `operation` until it succeeds, a non-retryable error occurs, or
/// `max_retries` retries have failed.
///
/// The closure receives the 1-based attempt number. On success returns the
/// value with the number of retries that were needed.
///
/// # Errors
/// Returns the first non-retryable error unchanged, or
/// [`EngineError::RetriesExhausted`] once every attempt has failed.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt - 1)),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) if attempt > policy.max_retries => {
                return Err(EngineError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "Execution phase failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
