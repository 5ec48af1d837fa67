//! Ordered adapter registry
//!
//! Adapters are registered once at startup. The registry never reorders or
//! discovers adapters at runtime: the position an adapter was registered at
//! is its merge precedence.

use super::{HttpJsonSource, MappedAdapter, PropertyAdapter, PropertySource, StaticSource};
use crate::config::{AdapterConfig, KeystoneConfig};
use crate::error::{KeystoneError, Result};
use std::sync::Arc;

/// Ordered set of adapters, highest precedence first
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn PropertyAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an adapter at the lowest precedence.
    ///
    /// Fails if another adapter already uses the same label.
    pub fn register(&mut self, adapter: Arc<dyn PropertyAdapter>) -> Result<()> {
        let label = adapter.label();
        if label.trim().is_empty() {
            return Err(KeystoneError::Config(
                "adapter label must not be empty".to_string(),
            ));
        }
        if self.get(label).is_some() {
            return Err(KeystoneError::DuplicateAdapter(label.to_string()));
        }

        tracing::debug!(
            adapter = label,
            position = self.adapters.len(),
            enabled = adapter.enabled(),
            "registered adapter"
        );
        self.adapters.push(adapter);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, adapter: Arc<dyn PropertyAdapter>) -> Result<Self> {
        self.register(adapter)?;
        Ok(self)
    }

    /// Build the built-in adapters listed in `config.adapters`, in order
    pub fn from_config(config: &KeystoneConfig) -> Result<Self> {
        let mut registry = Self::new();
        for adapter_config in &config.adapters {
            registry.register(Arc::new(build_adapter(adapter_config)?))?;
        }
        Ok(registry)
    }

    pub fn get(&self, label: &str) -> Option<&Arc<dyn PropertyAdapter>> {
        self.adapters.iter().find(|a| a.label() == label)
    }

    /// Adapters in precedence order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PropertyAdapter>> {
        self.adapters.iter()
    }

    /// All labels in precedence order
    pub fn labels(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.label().to_string()).collect()
    }

    /// Labels of adapters that are currently enabled
    pub fn enabled_labels(&self) -> Vec<String> {
        self.adapters
            .iter()
            .filter(|a| a.enabled())
            .map(|a| a.label().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.labels())
            .finish()
    }
}

fn build_adapter(config: &AdapterConfig) -> Result<MappedAdapter> {
    let source: Arc<dyn PropertySource> = match (&config.fixture, &config.base_url) {
        // Never invoked, so its fixture or endpoint is not opened
        _ if !config.enabled => Arc::new(StaticSource::new()),
        (Some(fixture), _) => Arc::new(StaticSource::from_file(fixture)?),
        (None, Some(url)) => Arc::new(HttpJsonSource::new(
            url.clone(),
            config.api_key(),
            config.timeout(),
        )?),
        (None, None) => {
            return Err(KeystoneError::Config(format!(
                "adapter '{}' needs either base_url or fixture",
                config.label
            )))
        }
    };

    let enabled = config.enabled && config.has_credentials();
    if config.enabled && !enabled {
        tracing::warn!(
            adapter = %config.label,
            env = config.api_key_env.as_deref().unwrap_or_default(),
            "API key not set, adapter disabled"
        );
    }

    Ok(MappedAdapter::new(config.label.clone(), config.kind, source).with_enabled(enabled))
}
