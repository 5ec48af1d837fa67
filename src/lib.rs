/*!
 * Keystone - Property data enrichment with fault-tolerant source fusion
 *
 * Aggregates property facts from independently-fallible upstream sources:
 * - Address normalization into a stable cache key
 * - Per-source retry with exponential backoff and a keyed circuit breaker
 * - Per-category TTL caching of fused results
 * - Deterministic first-writer-wins merge with per-field attribution
 * - Pure scoring of the fused record into a property insight
 *
 * Version: 0.3.0
 */

pub mod address;
pub mod adapters;
pub mod cli_style;
pub mod config;
pub mod context;
pub mod error;
pub mod fusion;
pub mod logging;
pub mod record;
pub mod scoring;
pub mod store;

// Re-export commonly used types
pub use address::NormalizedAddress;
pub use adapters::{AdapterRegistry, PropertyAdapter, RawResult};
pub use config::KeystoneConfig;
pub use context::EnrichmentContext;
pub use error::{KeystoneError, Result};
pub use fusion::FusionEngine;
pub use record::{CanonicalPropertyRecord, EnrichmentMeta, EnrichmentResult, SourceError};
pub use scoring::{score, score_with_profile, PropertyInsight, ServiceProfile};
pub use store::{JsonDirStore, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
