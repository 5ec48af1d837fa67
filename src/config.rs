/*!
 * Configuration types for Keystone
 */

use crate::error::{KeystoneError, Result};
use crate::scoring::ServiceProfile;
use keystone_core_resilience::{RetryPolicy, TtlPolicy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted cache TTL (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Longest accepted circuit cooldown (one week)
pub const MAX_COOLDOWN_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted retry delay (one hour)
pub const MAX_RETRY_DELAY_MS: u64 = 60 * 60 * 1000;

/// Main configuration for an enrichment instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeystoneConfig {
    /// Cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry behavior for upstream calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker behavior for upstream calls
    #[serde(default)]
    pub circuit: CircuitConfig,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Optional write-through persistence of enrichment results
    #[serde(default)]
    pub store: StoreConfig,

    /// Scoring inputs that are not part of the property record
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Upstream adapters, in precedence order
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
}

/// Cache lifetimes, per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for categories without an explicit entry
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Category overrides, e.g. `enrichment = 900`
    #[serde(default)]
    pub ttl_secs: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            ttl_secs: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_policy(&self) -> TtlPolicy {
        let mut policy = TtlPolicy {
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            ..Default::default()
        };
        for (category, secs) in &self.ttl_secs {
            policy = policy.with_category(category.clone(), Duration::from_secs(*secs));
        }
        policy
    }
}

/// Retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per upstream call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Multiplier applied to the wait on each retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Cap for a single wait in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Circuit breaker behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// How long a tripped circuit stays open
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl CircuitConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Diagnostic output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Shorthand for level = debug
    #[serde(default)]
    pub verbose: bool,
}

/// Write-through persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for JSON records; persistence is off when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Scoring inputs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Service profile used to blend expected visit duration into efficiency
    #[serde(default)]
    pub service_profile: Option<ServiceProfile>,
}

/// Which built-in field mapping an adapter uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Listing facts: beds, baths, living area, lot, year built, type
    Listing,
    /// Rental data: rent estimate plus basic facts
    Rental,
    /// Automated valuation: value, last sale, coordinates
    Valuation,
}

/// One upstream adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Unique label; also the circuit key
    pub label: String,

    pub kind: AdapterKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP endpoint returning a JSON document for `?address=...`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key. When set but the variable
    /// is missing, the adapter is treated as disabled.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// JSON fixture file used instead of HTTP
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl AdapterConfig {
    /// Resolve the API key from the environment, if one is configured
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether credentials required by this adapter are available
    pub fn has_credentials(&self) -> bool {
        self.api_key_env.is_none() || self.api_key().is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    5 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_cooldown_secs() -> u64 {
    5 * 60
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl KeystoneConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KeystoneError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.resolve_relative_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: KeystoneConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Fixture and store paths in a config file are relative to that file
    fn resolve_relative_paths(&mut self, base: &Path) {
        for adapter in &mut self.adapters {
            if let Some(fixture) = adapter.fixture.as_mut() {
                if fixture.is_relative() {
                    *fixture = base.join(&*fixture);
                }
            }
        }
        if let Some(dir) = self.store.dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(KeystoneError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            return Err(KeystoneError::Config(
                "retry.backoff_factor must be a finite number >= 1.0".to_string(),
            ));
        }
        if self.retry.initial_delay_ms > MAX_RETRY_DELAY_MS
            || self.retry.max_delay_ms > MAX_RETRY_DELAY_MS
        {
            return Err(KeystoneError::Config(format!(
                "retry delays must not exceed {} ms",
                MAX_RETRY_DELAY_MS
            )));
        }
        if self.circuit.cooldown_secs == 0 {
            return Err(KeystoneError::Config(
                "circuit.cooldown_secs must be greater than 0".to_string(),
            ));
        }
        if self.circuit.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(KeystoneError::Config(format!(
                "circuit.cooldown_secs must not exceed {}",
                MAX_COOLDOWN_SECS
            )));
        }
        if self.cache.default_ttl_secs > MAX_TTL_SECS {
            return Err(KeystoneError::Config(format!(
                "cache.default_ttl_secs must not exceed {}",
                MAX_TTL_SECS
            )));
        }
        if let Some((category, _)) = self
            .cache
            .ttl_secs
            .iter()
            .find(|(_, secs)| **secs > MAX_TTL_SECS)
        {
            return Err(KeystoneError::Config(format!(
                "cache.ttl_secs.{} must not exceed {}",
                category, MAX_TTL_SECS
            )));
        }

        let mut seen = HashSet::new();
        for adapter in &self.adapters {
            if adapter.label.trim().is_empty() {
                return Err(KeystoneError::Config(
                    "adapter label must not be empty".to_string(),
                ));
            }
            if !seen.insert(adapter.label.as_str()) {
                return Err(KeystoneError::DuplicateAdapter(adapter.label.clone()));
            }
            if adapter.base_url.is_none() && adapter.fixture.is_none() {
                return Err(KeystoneError::Config(format!(
                    "adapter '{}' needs either base_url or fixture",
                    adapter.label
                )));
            }
        }

        Ok(())
    }

    /// Example configuration printed by `keystone config`
    pub fn sample() -> Self {
        let mut cache = CacheConfig::default();
        cache.ttl_secs.insert("enrichment".to_string(), 15 * 60);
        cache.ttl_secs.insert("geocode".to_string(), 24 * 60 * 60);

        Self {
            cache,
            adapters: vec![
                AdapterConfig {
                    label: "zillow".to_string(),
                    kind: AdapterKind::Listing,
                    enabled: true,
                    base_url: Some("https://listings.example.com/v1/property".to_string()),
                    api_key_env: Some("KEYSTONE_LISTING_API_KEY".to_string()),
                    fixture: None,
                    timeout_ms: default_timeout_ms(),
                },
                AdapterConfig {
                    label: "rentcast".to_string(),
                    kind: AdapterKind::Rental,
                    enabled: true,
                    base_url: Some("https://rentals.example.com/v1/estimate".to_string()),
                    api_key_env: Some("KEYSTONE_RENTAL_API_KEY".to_string()),
                    fixture: None,
                    timeout_ms: default_timeout_ms(),
                },
                AdapterConfig {
                    label: "avm".to_string(),
                    kind: AdapterKind::Valuation,
                    enabled: false,
                    base_url: None,
                    api_key_env: None,
                    fixture: Some(PathBuf::from("fixtures/avm.json")),
                    timeout_ms: default_timeout_ms(),
                },
            ],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = KeystoneConfig::default();
        assert_eq!(config.cache.default_ttl_secs, 300);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.circuit.cooldown(), Duration::from_secs(300));
        assert!(config.adapters.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [cache]
            default_ttl_secs = 120
            [cache.ttl_secs]
            enrichment = 900

            [retry]
            max_attempts = 4
            initial_delay_ms = 50

            [[adapters]]
            label = "zillow"
            kind = "listing"
            base_url = "http://localhost:9000/zillow"

            [[adapters]]
            label = "rentcast"
            kind = "rental"
            enabled = false
            fixture = "rentcast.json"
        "#;

        let config = KeystoneConfig::from_toml_str(toml).unwrap();
        let policy = config.cache.ttl_policy();
        assert_eq!(policy.ttl_for("enrichment"), Duration::from_secs(900));
        assert_eq!(policy.ttl_for("geocode"), Duration::from_secs(120));
        assert_eq!(config.retry.policy().max_attempts, 4);
        assert_eq!(config.retry.policy().backoff_factor, 2.0);
        assert_eq!(config.adapters.len(), 2);
        assert_eq!(config.adapters[0].kind, AdapterKind::Listing);
        assert!(config.adapters[0].enabled);
        assert!(!config.adapters[1].enabled);
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let toml = r#"
            [[adapters]]
            label = "zillow"
            kind = "listing"
            fixture = "a.json"

            [[adapters]]
            label = "zillow"
            kind = "rental"
            fixture = "b.json"
        "#;

        assert!(matches!(
            KeystoneConfig::from_toml_str(toml),
            Err(KeystoneError::DuplicateAdapter(label)) if label == "zillow"
        ));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = KeystoneConfig::from_toml_str("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_rejects_unbounded_durations() {
        let err = KeystoneConfig::from_toml_str(
            "[circuit]\ncooldown_secs = 18446744073709551615\n[retry]\nmax_attempts = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, KeystoneError::Config(_)));
        assert!(err.to_string().contains("cooldown_secs"));

        let err = KeystoneConfig::from_toml_str("[cache]\ndefault_ttl_secs = 9223372036854775807\n")
            .unwrap_err();
        assert!(err.to_string().contains("default_ttl_secs"));

        let err = KeystoneConfig::from_toml_str(
            "[cache.ttl_secs]\nenrichment = 9223372036854775807\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("ttl_secs.enrichment"));

        let err = KeystoneConfig::from_toml_str("[retry]\nmax_delay_ms = 9223372036854775807\n")
            .unwrap_err();
        assert!(err.to_string().contains("retry delays"));

        let at_limit = format!(
            "[cache]\ndefault_ttl_secs = {}\n[circuit]\ncooldown_secs = {}\n",
            MAX_TTL_SECS, MAX_COOLDOWN_SECS
        );
        assert!(KeystoneConfig::from_toml_str(&at_limit).is_ok());
    }

    #[test]
    fn test_rejects_adapter_without_source() {
        let toml = r#"
            [[adapters]]
            label = "zillow"
            kind = "listing"
        "#;
        assert!(KeystoneConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_missing_credentials_detected() {
        let adapter = AdapterConfig {
            label: "zillow".to_string(),
            kind: AdapterKind::Listing,
            enabled: true,
            base_url: Some("http://localhost".to_string()),
            api_key_env: Some("KEYSTONE_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            fixture: None,
            timeout_ms: 100,
        };
        assert!(!adapter.has_credentials());
    }

    #[test]
    fn test_from_file_resolves_relative_fixture() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[adapters]]\nlabel = \"avm\"\nkind = \"valuation\"\nfixture = \"avm.json\""
        )
        .unwrap();

        let config = KeystoneConfig::from_file(file.path()).unwrap();
        let fixture = config.adapters[0].fixture.as_ref().unwrap();
        assert!(fixture.is_absolute());
        assert!(fixture.ends_with("avm.json"));
    }

    #[test]
    fn test_sample_round_trips_through_toml() {
        let text = KeystoneConfig::sample().to_toml_string().unwrap();
        let parsed = KeystoneConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.adapters.len(), 3);
        assert_eq!(parsed.adapters[2].kind, AdapterKind::Valuation);
    }
}
