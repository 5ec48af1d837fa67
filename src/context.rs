/*!
 * Enrichment context: the mutable state one engine instance owns
 *
 * Built once at startup and dropped at shutdown; nothing here is persisted
 * or shared with other instances.
 */

use crate::config::KeystoneConfig;
use crate::record::EnrichmentResult;
use keystone_core_resilience::{CircuitBreaker, ResilientInvoker, TtlCache};

/// Cache category for fused enrichment results
pub const ENRICHMENT_CATEGORY: &str = "enrichment";

/// Cache and circuit state for one engine instance
#[derive(Debug, Default)]
pub struct EnrichmentContext {
    cache: TtlCache<EnrichmentResult>,
    invoker: ResilientInvoker,
}

impl EnrichmentContext {
    pub fn new(cache: TtlCache<EnrichmentResult>, invoker: ResilientInvoker) -> Self {
        Self { cache, invoker }
    }

    pub fn from_config(config: &KeystoneConfig) -> Self {
        Self::new(
            TtlCache::new(config.cache.ttl_policy()),
            ResilientInvoker::new(
                config.retry.policy(),
                CircuitBreaker::new(config.circuit.cooldown()),
            ),
        )
    }

    pub fn cache(&self) -> &TtlCache<EnrichmentResult> {
        &self.cache
    }

    pub fn invoker(&self) -> &ResilientInvoker {
        &self.invoker
    }
}
