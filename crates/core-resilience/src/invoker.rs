//! Resilient invoker: circuit gate + retry policy around one upstream call
//!
//! ```text
//! check circuit(key) ──open──▶ CircuitOpen (op never runs)
//!        │ closed
//!        ▼
//! retry policy ──success──▶ close circuit(key), Ok
//!        │ exhausted
//!        ▼
//! trip circuit(key), last error
//! ```

use super::circuit_breaker::{CircuitBreaker, CircuitSnapshot};
use super::error::ResilienceError;
use super::retry::RetryPolicy;
use std::future::Future;

/// Composes a [`RetryPolicy`] with a keyed [`CircuitBreaker`]
#[derive(Debug, Default)]
pub struct ResilientInvoker {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientInvoker {
    pub fn new(retry: RetryPolicy, breaker: CircuitBreaker) -> Self {
        Self { retry, breaker }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Call `op` on behalf of dependency `key`
    pub async fn invoke<F, Fut, T>(&self, key: &str, op: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        self.breaker.check(key)?;

        match self.retry.execute(key, op).await {
            Ok(value) => {
                self.breaker.record_success(key);
                Ok(value)
            }
            Err(err) => {
                self.breaker.trip(key);
                Err(err)
            }
        }
    }

    /// Observable circuit state for `key`
    pub fn describe(&self, key: &str) -> CircuitSnapshot {
        self.breaker.describe(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn invoker() -> ResilientInvoker {
        ResilientInvoker::new(
            RetryPolicy {
                max_attempts: 2,
                initial_delay: Duration::from_millis(10),
                backoff_factor: 2.0,
                max_delay: Duration::from_secs(1),
            },
            CircuitBreaker::new(Duration::from_secs(300)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_trips_only_that_key() {
        let invoker = invoker();
        let calls = Cell::new(0);

        let result: Result<(), _> = invoker
            .invoke("zillow", || {
                calls.set(calls.get() + 1);
                async { Err(ResilienceError::transient("503 service unavailable")) }
            })
            .await;

        assert_eq!(
            result,
            Err(ResilienceError::transient("503 service unavailable"))
        );
        assert_eq!(calls.get(), 2);
        assert!(invoker.describe("zillow").open);
        assert!(!invoker.describe("rentcast").open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_operation() {
        let invoker = invoker();
        let _: Result<(), _> = invoker
            .invoke("zillow", || async { Err(ResilienceError::transient("down")) })
            .await;

        let calls = Cell::new(0);
        let result: Result<u8, _> = invoker
            .invoke("zillow", || {
                calls.set(calls.get() + 1);
                async { Ok(1) }
            })
            .await;

        assert_eq!(result, Err(ResilienceError::CircuitOpen));
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_after_cooldown_is_allowed_and_closes() {
        let invoker = invoker();
        let _: Result<(), _> = invoker
            .invoke("zillow", || async { Err(ResilienceError::transient("down")) })
            .await;

        tokio::time::advance(Duration::from_secs(301)).await;

        let result = invoker.invoke("zillow", || async { Ok(5u8) }).await;
        assert_eq!(result, Ok(5));
        assert!(!invoker.describe("zillow").open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens() {
        let invoker = invoker();
        let _: Result<(), _> = invoker
            .invoke("zillow", || async { Err(ResilienceError::transient("down")) })
            .await;
        tokio::time::advance(Duration::from_secs(301)).await;

        let _: Result<(), _> = invoker
            .invoke("zillow", || async { Err(ResilienceError::transient("still down")) })
            .await;
        assert!(invoker.describe("zillow").open);
    }
}
