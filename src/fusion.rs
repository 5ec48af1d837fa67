/*!
 * Fusion engine: one address in, one canonical record out
 *
 * Adapters are called sequentially in registration order through the
 * resilient invoker. Successful documents are merged with first-writer-wins
 * semantics; failures are collected and never abort the enrichment. Only an
 * unparseable address fails the call.
 */

use crate::address::NormalizedAddress;
use crate::adapters::AdapterRegistry;
use crate::context::{EnrichmentContext, ENRICHMENT_CATEGORY};
use crate::error::Result;
use crate::record::{
    CanonicalPropertyRecord, EnrichmentMeta, EnrichmentResult, FieldMerger, SourceError,
};
use crate::store::RecordStore;
use chrono::Utc;
use keystone_core_resilience::CircuitSnapshot;
use std::sync::Arc;

/// Drives adapters and owns the per-instance cache and circuit state
pub struct FusionEngine {
    registry: AdapterRegistry,
    context: EnrichmentContext,
    store: Option<Arc<dyn RecordStore>>,
}

impl FusionEngine {
    pub fn new(registry: AdapterRegistry, context: EnrichmentContext) -> Self {
        Self {
            registry,
            context,
            store: None,
        }
    }

    /// Write every freshly built result through to `store`
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn context(&self) -> &EnrichmentContext {
        &self.context
    }

    /// Enrich `raw_address` from every enabled adapter.
    ///
    /// A cached result is returned unchanged unless `force_refresh` is set.
    pub async fn enrich(&self, raw_address: &str, force_refresh: bool) -> Result<EnrichmentResult> {
        let address = NormalizedAddress::parse(raw_address)?;
        let key = address.key();

        if !force_refresh {
            if let Some(cached) = self.context.cache().get_for(ENRICHMENT_CATEGORY, &key) {
                tracing::debug!(address = %key, "enrichment cache hit");
                return Ok(cached);
            }
        }

        let mut record = CanonicalPropertyRecord::seed(address.clone());
        let mut sources = Vec::new();
        let mut errors = Vec::new();
        let mut skipped = Vec::new();

        for adapter in self.registry.iter() {
            let label = adapter.label();
            if !adapter.enabled() {
                tracing::debug!(adapter = label, "adapter disabled, skipping");
                skipped.push(label.to_string());
                continue;
            }

            tracing::debug!(adapter = label, address = %key, "fetching");
            let fetched = self
                .context
                .invoker()
                .invoke(label, || adapter.fetch(&address))
                .await;

            match fetched {
                Ok(raw) => {
                    let mut merger = FieldMerger::new(&mut record, label, adapter.owned_fields());
                    adapter.merge(&raw, &mut merger);
                    tracing::debug!(
                        adapter = label,
                        fields = merger.written().len(),
                        "merged upstream document"
                    );
                    sources.push(label.to_string());
                }
                Err(err) => {
                    tracing::warn!(adapter = label, error = %err, "adapter failed");
                    errors.push(SourceError {
                        label: label.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let meta = EnrichmentMeta {
            attempted: self.registry.labels(),
            skipped,
            sources: sources.clone(),
            errors: errors.clone(),
            timestamp: Utc::now(),
        };
        record.provenance.sources = sources.clone();
        record.provenance.errors = errors.clone();
        record.provenance.meta = Some(meta.clone());

        let result = EnrichmentResult {
            property: record,
            sources,
            errors,
            meta,
        };

        self.context
            .cache()
            .set_for(ENRICHMENT_CATEGORY, &key, result.clone());

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&key, &result).await {
                tracing::warn!(address = %key, error = %e, "failed to persist enrichment result");
            }
        }

        tracing::info!(
            address = %key,
            sources = result.sources.len(),
            errors = result.errors.len(),
            skipped = result.meta.skipped.len(),
            fields = result.property.populated_fields().len(),
            "enrichment complete"
        );

        Ok(result)
    }

    /// Circuit state for one adapter label
    pub fn describe_circuit(&self, key: &str) -> CircuitSnapshot {
        self.context.invoker().describe(key)
    }

    /// Labels whose circuits are currently open
    pub fn open_circuits(&self) -> Vec<String> {
        self.context.invoker().breaker().open_keys()
    }

    /// Drop every cached enrichment result
    pub fn clear_cache(&self) {
        self.context.cache().clear();
        tracing::info!("enrichment cache cleared");
    }
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("registry", &self.registry)
            .field("context", &self.context)
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MappedAdapter, StaticSource};
    use crate::config::AdapterKind;
    use crate::error::KeystoneError;
    use crate::logging::init_test_logging;
    use serde_json::json;

    fn engine() -> FusionEngine {
        init_test_logging();
        let source = StaticSource::new().with_default(json!({ "bedrooms": 3, "bathrooms": 2 }));
        let registry = AdapterRegistry::new()
            .with(Arc::new(MappedAdapter::new(
                "zillow",
                AdapterKind::Listing,
                Arc::new(source),
            )))
            .unwrap();
        FusionEngine::new(registry, EnrichmentContext::default())
    }

    #[tokio::test]
    async fn test_invalid_address_fails() {
        let err = engine().enrich("  ###  ", false).await.unwrap_err();
        assert!(matches!(err, KeystoneError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_record_provenance_matches_result() {
        let engine = engine();
        let result = engine.enrich("1 Main St, Toronto, ON", false).await.unwrap();

        assert_eq!(result.sources, vec!["zillow"]);
        assert_eq!(result.property.provenance.sources, result.sources);
        assert_eq!(result.property.provenance.meta.as_ref(), Some(&result.meta));
        assert_eq!(result.meta.attempted, vec!["zillow"]);
        for field in result.property.populated_fields() {
            let owner = result.property.source_of(field).unwrap();
            assert!(result.sources.iter().any(|s| s == owner));
        }
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let engine = engine();
        engine.enrich("1 Main St", false).await.unwrap();
        assert_eq!(engine.context().cache().len(), 1);

        engine.clear_cache();
        assert!(engine.context().cache().is_empty());
    }
}
