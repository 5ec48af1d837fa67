//! Keystone Core Resilience: Pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! Building blocks for calling independently-fallible upstream data sources:
//!
//! - **TTL Cache**: Expiring key/value store with per-category lifetimes
//! - **Retry Policy**: Bounded attempts with exponential backoff
//! - **Circuit Breaker**: Per-key failure memory that suspends calls during a cooldown
//! - **Resilient Invoker**: Circuit gate + retry policy, the one sanctioned way to call out
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of property data,
//! transports or persistence. State lives in values owned by the caller;
//! there are no globals, so independent instances never observe each other.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Caller (one upstream key)       │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Circuit Breaker                   │  ← Fail-fast while open
//! │  (One circuit per key, fixed cooldown)  │
//! └─────────────┬───────────────────────────┘
//!               │ closed
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Retry Policy                      │  ← Exponential backoff
//! │  (Exhaustion trips the circuit)         │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//!         Upstream Source
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use keystone_core_resilience::{CircuitBreaker, ResilienceError, ResilientInvoker, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let invoker = ResilientInvoker::new(
//!     RetryPolicy::with_attempts(3),
//!     CircuitBreaker::new(Duration::from_secs(300)),
//! );
//!
//! let value = invoker
//!     .invoke("listing-api", || async { Ok::<_, ResilienceError>(42) })
//!     .await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod error;
pub mod invoker;
pub mod retry;

// Re-export main types for convenience
pub use cache::{CacheEntry, TtlCache, TtlPolicy, DEFAULT_TTL};
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState, DEFAULT_COOLDOWN};
pub use error::ResilienceError;
pub use invoker::ResilientInvoker;
pub use retry::RetryPolicy;

use std::time::Duration;
use tokio::time::Instant;

/// Latest deadline handed out: roughly 30 years from now
pub const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `Instant::now() + span`, saturating at [`FAR_FUTURE`] instead of
/// panicking when the sum does not fit in an `Instant`
pub(crate) fn deadline_after(span: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(span.min(FAR_FUTURE)).unwrap_or(now)
}

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use keystone_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::cache::{TtlCache, TtlPolicy};
    pub use super::circuit_breaker::{CircuitBreaker, CircuitSnapshot};
    pub use super::error::ResilienceError;
    pub use super::invoker::ResilientInvoker;
    pub use super::retry::RetryPolicy;
}
