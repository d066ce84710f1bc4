//! Bounded retry with exponential backoff for upstream inference calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use scout_core::{defaults, Error, Result};

/// Retry policy for one upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub base_backoff: Duration,
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::INFERENCE_MAX_RETRIES,
            base_backoff: Duration::from_millis(defaults::INFERENCE_BACKOFF_MS),
            attempt_timeout: Duration::from_secs(defaults::INFERENCE_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            max_retries: std::env::var("INFERENCE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.max_retries),
            base_backoff: std::env::var("INFERENCE_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(base.base_backoff),
            attempt_timeout: std::env::var("INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(base.attempt_timeout),
        }
    }

    /// A policy that never retries.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_backoff.saturating_mul(1 << retry.min(10));
        let jitter_cap = (self.base_backoff.as_millis() / 4) as u64;
        let jitter = if jitter_cap > 0 {
            rand::thread_rng().gen_range(0..=jitter_cap)
        } else {
            0
        };
        base + Duration::from_millis(jitter)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. A timed-out attempt counts as a failure.
    pub async fn run<F, Fut, T>(&self, op: &'static str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => Error::Request(format!(
                    "{} timed out after {}ms",
                    op,
                    self.attempt_timeout.as_millis()
                )),
            };

            if !is_retryable(&err) || attempt > self.max_retries {
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            debug!(
                subsystem = "inference",
                op,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable(err: &Error) -> bool {
    err.is_recoverable() || matches!(err, Error::Request(_))
}
