//! Bounded retry with exponential backoff
//!
//! Every failure is retried identically until the attempt budget is spent;
//! there is no distinction between transient and permanent errors. The last
//! failure is returned once attempts are exhausted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,

    /// Wait before the first retry
    pub initial_delay: Duration,

    /// Multiplier applied to the wait on each successive retry
    pub backoff_factor: f64,

    /// Upper bound for a single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default backoff
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Number of attempts actually made when every attempt fails
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait inserted after failed attempt `retry` (0-based):
    /// `initial_delay * backoff_factor^retry`, capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.max(0.0).powi(retry as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let budget = self.attempt_budget();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= budget => {
                    tracing::warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        budget,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
