//! Field-mapping adapters
//!
//! The built-in adapter variants differ only in which fields they own and
//! which JSON keys they read them from. Each key list is tried in order and
//! the first usable value wins.

use super::{PropertyAdapter, PropertySource, RawResult};
use crate::address::NormalizedAddress;
use crate::config::AdapterKind;
use crate::record::{FieldMerger, PropertyField};
use async_trait::async_trait;
use keystone_core_resilience::ResilienceError;
use serde_json::Value;
use std::sync::Arc;

/// Where to find one field in a raw document
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub field: PropertyField,
    /// Candidate keys; dotted keys descend into nested objects
    pub keys: &'static [&'static str],
}

const fn map(field: PropertyField, keys: &'static [&'static str]) -> FieldMapping {
    FieldMapping { field, keys }
}

const LISTING_FIELDS: &[FieldMapping] = &[
    map(PropertyField::Beds, &["bedrooms", "beds"]),
    map(PropertyField::Baths, &["bathrooms", "baths"]),
    map(PropertyField::Sqft, &["livingArea", "squareFootage", "sqft"]),
    map(PropertyField::LotSizeSqft, &["lotAreaValue", "lotSize", "lotSizeSqft"]),
    map(PropertyField::YearBuilt, &["yearBuilt"]),
    map(PropertyField::PropertyType, &["homeType", "propertyType"]),
];

const RENTAL_FIELDS: &[FieldMapping] = &[
    map(PropertyField::RentEstimate, &["rentEstimate", "rent", "rentRangeMid"]),
    map(PropertyField::Beds, &["bedrooms", "beds"]),
    map(PropertyField::Baths, &["bathrooms", "baths"]),
    map(PropertyField::Sqft, &["squareFootage", "sqft"]),
    map(PropertyField::LotSizeSqft, &["lotSize"]),
    map(PropertyField::YearBuilt, &["yearBuilt"]),
    map(PropertyField::PropertyType, &["propertyType"]),
];

const VALUATION_FIELDS: &[FieldMapping] = &[
    map(PropertyField::Valuation, &["valuation", "value", "price", "estimate"]),
    map(PropertyField::LastSalePrice, &["lastSalePrice", "lastSoldPrice"]),
    map(PropertyField::Latitude, &["latitude", "lat", "location.lat"]),
    map(PropertyField::Longitude, &["longitude", "lng", "lon", "location.lng"]),
];

/// Field mappings for a built-in adapter kind
pub fn mappings_for(kind: AdapterKind) -> &'static [FieldMapping] {
    match kind {
        AdapterKind::Listing => LISTING_FIELDS,
        AdapterKind::Rental => RENTAL_FIELDS,
        AdapterKind::Valuation => VALUATION_FIELDS,
    }
}

/// Adapter that maps JSON keys from one source onto record fields
pub struct MappedAdapter {
    label: String,
    kind: AdapterKind,
    source: Arc<dyn PropertySource>,
    enabled: bool,
    owned: Vec<PropertyField>,
}

impl MappedAdapter {
    pub fn new(label: impl Into<String>, kind: AdapterKind, source: Arc<dyn PropertySource>) -> Self {
        let owned = mappings_for(kind).iter().map(|m| m.field).collect();
        Self {
            label: label.into(),
            kind,
            source,
            enabled: true,
            owned,
        }
    }

    /// Enable or disable this adapter
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }
}

#[async_trait]
impl PropertyAdapter for MappedAdapter {
    fn label(&self) -> &str {
        &self.label
    }

    fn owned_fields(&self) -> &[PropertyField] {
        &self.owned
    }

    async fn fetch(&self, address: &NormalizedAddress) -> Result<RawResult, ResilienceError> {
        tracing::debug!(
            adapter = %self.label,
            source = %self.source.describe(),
            "fetching property data"
        );
        self.source.lookup(address).await
    }

    fn merge(&self, raw: &RawResult, merger: &mut FieldMerger<'_>) {
        let doc = unwrap_envelope(raw);

        for mapping in mappings_for(self.kind) {
            let Some(value) = mapping.keys.iter().find_map(|key| lookup(doc, key)) else {
                continue;
            };
            match mapping.field {
                PropertyField::Beds | PropertyField::YearBuilt => {
                    if let Some(n) = as_count(value) {
                        merger.set_count(mapping.field, n);
                    }
                }
                PropertyField::PropertyType => {
                    if let Some(s) = value.as_str() {
                        merger.set_text(mapping.field, s);
                    }
                }
                _ => {
                    if let Some(n) = as_number(value) {
                        merger.set_number(mapping.field, n);
                    }
                }
            }
        }

        if merger.written().is_empty() {
            tracing::debug!(adapter = %self.label, "document contributed no new fields");
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Upstreams often wrap the payload: `[{..}]`, `{"data": {..}}`, `{"property": {..}}`
fn unwrap_envelope(raw: &Value) -> &Value {
    match raw {
        Value::Array(items) => items.first().map(unwrap_envelope).unwrap_or(raw),
        Value::Object(obj) => ["data", "property", "result"]
            .iter()
            .find_map(|k| obj.get(*k).filter(|v| v.is_object() || v.is_array()))
            .map(unwrap_envelope)
            .unwrap_or(raw),
        _ => raw,
    }
}

fn lookup<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(doc, |node, part| node.get(part))
        .filter(|v| !v.is_null())
}

/// Numbers may arrive as JSON numbers or strings like "$1,250,000"
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u32> {
    let n = as_number(value)?;
    (n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64).then_some(n as u32)
}
