//! Upstream sources: the transport an adapter uses to obtain raw documents

use super::RawResult;
use crate::address::NormalizedAddress;
use crate::error::{KeystoneError, Result};
use async_trait::async_trait;
use keystone_core_resilience::ResilienceError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Header carrying the API key on HTTP requests
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Something that can answer "what do you know about this address"
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn lookup(&self, address: &NormalizedAddress) -> std::result::Result<RawResult, ResilienceError>;

    /// Short human description for logs
    fn describe(&self) -> String;
}

/// JSON-over-HTTP source: `GET {base_url}?address=...`
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpJsonSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keystone/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeystoneError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout,
        })
    }

    fn classify_status(status: StatusCode) -> ResilienceError {
        let message = format!("upstream responded {}", status);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            ResilienceError::Transient(message)
        } else {
            ResilienceError::Permanent(message)
        }
    }

    fn classify_error(&self, err: reqwest::Error) -> ResilienceError {
        if err.is_timeout() {
            ResilienceError::Timeout(self.timeout)
        } else if err.is_decode() {
            ResilienceError::Malformed(err.to_string())
        } else {
            ResilienceError::Transient(err.to_string())
        }
    }
}

#[async_trait]
impl PropertySource for HttpJsonSource {
    async fn lookup(&self, address: &NormalizedAddress) -> std::result::Result<RawResult, ResilienceError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("address", address.to_string())]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| self.classify_error(e))?;
        let status = response.status();
        // Unknown address: the provider answered, it just has nothing
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(address = %address, "upstream has no record");
            return Ok(RawResult::Object(Default::default()));
        }
        if !status.is_success() {
            return Err(Self::classify_status(status));
        }

        response
            .json::<RawResult>()
            .await
            .map_err(|e| self.classify_error(e))
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}

/// Fixture file layout for [`StaticSource`]
#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    /// Served for addresses without a specific entry
    #[serde(default)]
    default: Option<RawResult>,
    /// Keyed by free-form address; keys are normalized on load
    #[serde(default)]
    records: HashMap<String, RawResult>,
}

/// In-memory source backed by fixed documents
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: HashMap<String, RawResult>,
    fallback: Option<RawResult>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `raw` for every address without a specific entry
    pub fn with_default(mut self, raw: RawResult) -> Self {
        self.fallback = Some(raw);
        self
    }

    /// Serve `raw` for `address`
    pub fn with_record(mut self, address: &str, raw: RawResult) -> Result<Self> {
        let key = NormalizedAddress::parse(address)?.key();
        self.records.insert(key, raw);
        Ok(self)
    }

    /// Load documents from a JSON fixture file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KeystoneError::Config(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        let fixture: FixtureFile = serde_json::from_str(&contents)?;

        let mut source = Self {
            records: HashMap::new(),
            fallback: fixture.default,
        };
        for (address, raw) in fixture.records {
            source = source.with_record(&address, raw)?;
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.fallback.is_none()
    }
}

#[async_trait]
impl PropertySource for StaticSource {
    /// An address with no entry and no default yields an empty document
    async fn lookup(&self, address: &NormalizedAddress) -> std::result::Result<RawResult, ResilienceError> {
        Ok(self
            .records
            .get(&address.key())
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| RawResult::Object(Default::default())))
    }

    fn describe(&self) -> String {
        format!("static ({} records)", self.records.len())
    }
}
