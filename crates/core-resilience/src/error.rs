//! Error types for resilience operations

use std::time::Duration;
use thiserror::Error;

/// Errors produced by an upstream call or by the primitives guarding it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// The circuit for this dependency is open; the call was not attempted
    #[error("circuit open")]
    CircuitOpen,

    /// Failure that may resolve on its own (network blip, 5xx, rate limit)
    #[error("{0}")]
    Transient(String),

    /// Failure that will not resolve by retrying (bad credentials, 4xx)
    #[error("{0}")]
    Permanent(String),

    /// The upstream did not answer in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream answered with something we could not interpret
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ResilienceError {
    /// Convenience constructor for transient failures
    pub fn transient(message: impl Into<String>) -> Self {
        ResilienceError::Transient(message.into())
    }

    /// Convenience constructor for permanent failures
    pub fn permanent(message: impl Into<String>) -> Self {
        ResilienceError::Permanent(message.into())
    }

    /// Check if this error is a fast-fail from an open circuit
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen)
    }

    /// Check if this error is classified as permanent.
    ///
    /// Classification is informational only: the retry policy retries every
    /// failure up to its attempt budget regardless of class.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ResilienceError::Permanent(_) | ResilienceError::Malformed(_)
        )
    }
}
