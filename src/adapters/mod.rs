//! Upstream property-data adapters
//!
//! An adapter wraps one upstream source and exposes exactly three
//! capabilities: fetch a raw document for an address, merge that document
//! into a canonical record, and report whether it is enabled. Adapters are
//! registered into an ordered [`AdapterRegistry`]; registration order is
//! merge precedence.

use crate::address::NormalizedAddress;
use crate::record::{FieldMerger, PropertyField};
use async_trait::async_trait;
use keystone_core_resilience::ResilienceError;

pub mod mapped;
pub mod registry;
pub mod source;

pub use mapped::MappedAdapter;
pub use registry::AdapterRegistry;
pub use source::{HttpJsonSource, PropertySource, StaticSource};

/// Raw document returned by an upstream source
pub type RawResult = serde_json::Value;

/// Adapter trait - every upstream integration implements this
#[async_trait]
pub trait PropertyAdapter: Send + Sync {
    /// Unique label; also the circuit key for this upstream
    fn label(&self) -> &str;

    /// Fields this adapter is allowed to write
    fn owned_fields(&self) -> &[PropertyField];

    /// Fetch the raw document for `address`
    ///
    /// # Returns
    /// * `Ok(RawResult)` - Upstream answered
    /// * `Err(_)` - Upstream failed (retried, then recorded; never aborts enrichment)
    async fn fetch(&self, address: &NormalizedAddress) -> Result<RawResult, ResilienceError>;

    /// Merge a fetched document into the record.
    ///
    /// Writes go through `merger`, which drops values for fields the adapter
    /// does not own and for fields an earlier adapter already populated.
    fn merge(&self, raw: &RawResult, merger: &mut FieldMerger<'_>);

    /// Check if the adapter should be invoked (configured, credentials present)
    fn enabled(&self) -> bool {
        true
    }
}
