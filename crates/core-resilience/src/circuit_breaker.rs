//! Keyed circuit breaker
//!
//! One circuit per upstream dependency, identified by a string key. Each
//! circuit has two observable states:
//! - Closed: calls proceed
//! - Open: calls fail immediately until the cooldown elapses
//!
//! There is no stored half-open state. Once the cooldown has passed the next
//! call is let through, and its outcome decides the circuit: a success closes
//! it, another exhausted retry budget opens it again.

use super::error::ResilienceError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Default time a tripped circuit stays open
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// State of a single circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls fail fast until `open_until`
    Open { open_until: Instant },
}

impl CircuitState {
    /// Whether this state rejects calls at `now`
    pub fn rejects(&self, now: Instant) -> bool {
        match self {
            CircuitState::Closed => false,
            CircuitState::Open { open_until } => now < *open_until,
        }
    }
}

/// Observable view of one circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub key: String,
    pub open: bool,
    pub open_until: Option<DateTime<Utc>>,
}

/// Per-key circuit state for every upstream dependency of one context
#[derive(Debug)]
pub struct CircuitBreaker {
    cooldown: Duration,
    circuits: Mutex<HashMap<String, CircuitState>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CircuitBreaker {
    /// Create a breaker whose circuits stay open for `cooldown` once tripped
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn circuits(&self) -> MutexGuard<'_, HashMap<String, CircuitState>> {
        self.circuits.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state for `key`; unknown keys are closed
    pub fn state(&self, key: &str) -> CircuitState {
        self.circuits()
            .get(key)
            .copied()
            .unwrap_or(CircuitState::Closed)
    }

    /// Gate a call: fails with [`ResilienceError::CircuitOpen`] while the
    /// cooldown for `key` has not elapsed
    pub fn check(&self, key: &str) -> Result<(), ResilienceError> {
        if self.state(key).rejects(Instant::now()) {
            tracing::debug!(key, "circuit open, failing fast");
            return Err(ResilienceError::CircuitOpen);
        }
        Ok(())
    }

    /// Open the circuit for `key` for one cooldown period
    pub fn trip(&self, key: &str) {
        let open_until = crate::deadline_after(self.cooldown);
        self.circuits()
            .insert(key.to_string(), CircuitState::Open { open_until });
        tracing::info!(
            key,
            cooldown_secs = self.cooldown.as_secs(),
            "circuit opened"
        );
    }

    /// Close the circuit for `key` after a successful call
    pub fn record_success(&self, key: &str) {
        if let Some(CircuitState::Open { .. }) = self.circuits().remove(key) {
            tracing::info!(key, "circuit closed after successful call");
        }
    }

    /// Forget all circuit state
    pub fn reset_all(&self) {
        self.circuits().clear();
    }

    /// Keys whose circuits currently reject calls
    pub fn open_keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .circuits()
            .iter()
            .filter(|(_, state)| state.rejects(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Describe the circuit for `key`
    pub fn describe(&self, key: &str) -> CircuitSnapshot {
        let now = Instant::now();
        match self.state(key) {
            CircuitState::Open { open_until } if now < open_until => {
                let remaining = open_until - now;
                let open_until = chrono::Duration::from_std(remaining)
                    .ok()
                    .and_then(|d| Utc::now().checked_add_signed(d));
                CircuitSnapshot {
                    key: key.to_string(),
                    open: true,
                    open_until,
                }
            }
            _ => CircuitSnapshot {
                key: key.to_string(),
                open: false,
                open_until: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unknown_key_is_closed() {
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.state("zillow"), CircuitState::Closed);
        assert!(breaker.check("zillow").is_ok());
        assert!(!breaker.describe("zillow").open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_rejects_until_cooldown() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60));
        breaker.trip("zillow");

        assert_eq!(breaker.check("zillow"), Err(ResilienceError::CircuitOpen));
        let snapshot = breaker.describe("zillow");
        assert!(snapshot.open);
        assert!(snapshot.open_until.unwrap() > Utc::now());

        // Other keys are unaffected
        assert!(breaker.check("rentcast").is_ok());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(breaker.check("zillow").is_ok());
        assert!(!breaker.describe("zillow").open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_cooldown_saturates() {
        let breaker = CircuitBreaker::new(Duration::from_secs(u64::MAX));
        breaker.trip("zillow");

        tokio::time::advance(Duration::from_secs(86400 * 365)).await;
        assert_eq!(breaker.check("zillow"), Err(ResilienceError::CircuitOpen));
        assert!(breaker.describe("zillow").open_until.is_some());
        assert_eq!(breaker.open_keys(), vec!["zillow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_closes() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60));
        breaker.trip("zillow");
        tokio::time::advance(Duration::from_secs(61)).await;

        breaker.record_success("zillow");
        assert_eq!(breaker.state("zillow"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_keys_sorted() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60));
        breaker.trip("zillow");
        breaker.trip("attom");
        assert_eq!(breaker.open_keys(), vec!["attom", "zillow"]);

        breaker.reset_all();
        assert!(breaker.open_keys().is_empty());
    }
}
