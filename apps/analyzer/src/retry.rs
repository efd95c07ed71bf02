//! Bounded retry with exponential backoff and a per-attempt timeout.
//!
//! Used around the two external calls that dominate latency: content store
//! reads and evaluation requests. Each error type decides for itself whether
//! another attempt can help.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Implemented by stage errors that can be retried.
pub trait Retryable: std::fmt::Display {
    /// Whether a fresh attempt could succeed (timeouts, transport, 429/5xx).
    fn is_retryable(&self) -> bool;

    /// Error produced when an attempt exceeds the policy's timeout.
    fn timed_out(after: Duration) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            attempt_timeout,
        }
    }

    /// Backoff before the attempt following `failed_attempt`: 1x, 2x, 4x ... base.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `op` until it succeeds, fails with a terminal error, or the
    /// attempt budget is spent. The last error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.attempt_timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
