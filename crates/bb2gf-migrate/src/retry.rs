//! Retry with exponential backoff for HTTP calls.
//!
//! Only the HTTP clients use this; external commands are never retried.

use crate::error::{MigrationError, Result};

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Cap on any single delay, jitter included.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Stretch each delay by up to 25%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A deterministic policy, without jitter.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            jitter: false,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let cap_ms = self.max_delay.as_millis() as f64;
        let mut ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent as i32);
        if self.jitter {
            ms *= 1.0 + rand::random::<f64>() * 0.25;
        }
        Duration::from_millis(ms.min(cap_ms) as u64)
    }

    /// Run `operation` until it succeeds, fails definitively, or
    /// `max_attempts` transient failures have been seen.
    pub async fn execute<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                warn!(operation = what, attempts = attempt, error = %err, "Giving up");
                return Err(err);
            }

            let delay = self.delay_for_attempt(attempt);
            debug!(
                operation = what,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Error for a non-success HTTP status; 429 and 5xx stay retryable.
pub(crate) fn status_error(status: u16, body: &str) -> MigrationError {
    MigrationError::transport(Some(status), format!("HTTP {status}: {body}"))
}
