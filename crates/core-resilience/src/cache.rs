//! TTL cache with per-category expirations
//!
//! Entries carry an absolute expiry instant. Expired entries are removed
//! lazily: a read that finds an expired entry evicts it and reports a miss.
//! There is no background sweep.
//!
//! # Example
//!
//! ```
//! use keystone_core_resilience::cache::{TtlCache, TtlPolicy};
//! use std::time::Duration;
//!
//! let policy = TtlPolicy::default().with_category("geocode", Duration::from_secs(3600));
//! let cache: TtlCache<String> = TtlCache::new(policy);
//!
//! cache.set_for("geocode", "1 main st", "43.65,-79.38".to_string());
//! assert_eq!(cache.get_for("geocode", "1 main st").as_deref(), Some("43.65,-79.38"));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for categories without an explicit setting
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value and the instant after which it is no longer served
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Time-to-live settings, one per logical category
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    /// TTL for any category not listed in `categories`
    pub default_ttl: Duration,

    /// Category-specific overrides (e.g. "enrichment", "geocode")
    pub categories: HashMap<String, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            categories: HashMap::new(),
        }
    }
}

impl TtlPolicy {
    /// Add or replace the TTL for a category
    pub fn with_category(mut self, category: impl Into<String>, ttl: Duration) -> Self {
        self.categories.insert(category.into(), ttl);
        self
    }

    /// Resolve the TTL for a category, falling back to the default
    pub fn ttl_for(&self, category: &str) -> Duration {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

/// Expiring key/value store shared by one enrichment context
#[derive(Debug)]
pub struct TtlCache<V> {
    policy: TtlPolicy,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache with the given TTL policy
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The TTL policy this cache was built with
    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave a half-written entry,
        // so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn scoped_key(category: &str, key: &str) -> String {
        format!("{}:{}", category, key)
    }

    /// Store `value` under `key`, replacing any existing entry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: crate::deadline_after(ttl),
        };
        self.entries().insert(key.into(), entry);
    }

    /// Fetch the value for `key` if it has not expired.
    ///
    /// An expired entry is evicted as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::trace!(key, "cache entry expired and evicted");
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` within `category`, using the category TTL
    pub fn set_for(&self, category: &str, key: &str, value: V) {
        let ttl = self.policy.ttl_for(category);
        self.set(Self::scoped_key(category, key), value, ttl);
    }

    /// Fetch the value for `key` within `category`
    pub fn get_for(&self, category: &str, key: &str) -> Option<V> {
        self.get(&Self::scoped_key(category, key))
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Drop all expired entries now. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}
