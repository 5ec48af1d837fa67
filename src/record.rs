/*!
 * Canonical property record and provenance
 *
 * A record is seeded from a normalized address and then filled by adapters
 * through a [`FieldMerger`], which enforces two rules:
 * - an adapter may only write the fields it declares as owned
 * - a field that is already populated is never overwritten
 */

use crate::address::NormalizedAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Optional facts a record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyField {
    Beds,
    Baths,
    Sqft,
    LotSizeSqft,
    YearBuilt,
    PropertyType,
    RentEstimate,
    Valuation,
    LastSalePrice,
    Latitude,
    Longitude,
}

impl PropertyField {
    pub const ALL: [PropertyField; 11] = [
        PropertyField::Beds,
        PropertyField::Baths,
        PropertyField::Sqft,
        PropertyField::LotSizeSqft,
        PropertyField::YearBuilt,
        PropertyField::PropertyType,
        PropertyField::RentEstimate,
        PropertyField::Valuation,
        PropertyField::LastSalePrice,
        PropertyField::Latitude,
        PropertyField::Longitude,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PropertyField::Beds => "beds",
            PropertyField::Baths => "baths",
            PropertyField::Sqft => "sqft",
            PropertyField::LotSizeSqft => "lot_size_sqft",
            PropertyField::YearBuilt => "year_built",
            PropertyField::PropertyType => "property_type",
            PropertyField::RentEstimate => "rent_estimate",
            PropertyField::Valuation => "valuation",
            PropertyField::LastSalePrice => "last_sale_price",
            PropertyField::Latitude => "latitude",
            PropertyField::Longitude => "longitude",
        }
    }
}

impl fmt::Display for PropertyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value offered by an adapter for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Count(u32),
    Number(f64),
    Text(String),
}

/// One adapter failure, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub label: String,
    pub message: String,
}

/// Summary of one enrichment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentMeta {
    /// Every registered adapter label, in precedence order
    pub attempted: Vec<String>,
    /// Registered adapters that were disabled and not invoked
    #[serde(default)]
    pub skipped: Vec<String>,
    pub sources: Vec<String>,
    pub errors: Vec<SourceError>,
    pub timestamp: DateTime<Utc>,
}

/// Where the record's data came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Labels of adapters that fetched successfully, in merge order
    pub sources: Vec<String>,
    pub errors: Vec<SourceError>,
    /// Which adapter wrote each populated field
    pub field_sources: BTreeMap<PropertyField, String>,
    pub meta: Option<EnrichmentMeta>,
}

/// The single fused representation of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPropertyRecord {
    pub address: NormalizedAddress,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub sqft: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<u32>,
    pub property_type: Option<String>,
    pub rent_estimate: Option<f64>,
    pub valuation: Option<f64>,
    pub last_sale_price: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl CanonicalPropertyRecord {
    /// A record with only the address populated
    pub fn seed(address: NormalizedAddress) -> Self {
        Self {
            address,
            beds: None,
            baths: None,
            sqft: None,
            lot_size_sqft: None,
            year_built: None,
            property_type: None,
            rent_estimate: None,
            valuation: None,
            last_sale_price: None,
            latitude: None,
            longitude: None,
            provenance: Provenance::default(),
        }
    }

    pub fn is_set(&self, field: PropertyField) -> bool {
        match field {
            PropertyField::Beds => self.beds.is_some(),
            PropertyField::Baths => self.baths.is_some(),
            PropertyField::Sqft => self.sqft.is_some(),
            PropertyField::LotSizeSqft => self.lot_size_sqft.is_some(),
            PropertyField::YearBuilt => self.year_built.is_some(),
            PropertyField::PropertyType => self.property_type.is_some(),
            PropertyField::RentEstimate => self.rent_estimate.is_some(),
            PropertyField::Valuation => self.valuation.is_some(),
            PropertyField::LastSalePrice => self.last_sale_price.is_some(),
            PropertyField::Latitude => self.latitude.is_some(),
            PropertyField::Longitude => self.longitude.is_some(),
        }
    }

    pub fn populated_fields(&self) -> Vec<PropertyField> {
        PropertyField::ALL
            .into_iter()
            .filter(|f| self.is_set(*f))
            .collect()
    }

    /// Share of optional fields that are populated (0.0-1.0)
    pub fn completeness(&self) -> f64 {
        self.populated_fields().len() as f64 / PropertyField::ALL.len() as f64
    }

    /// Adapter that wrote `field`, if any
    pub fn source_of(&self, field: PropertyField) -> Option<&str> {
        self.provenance.field_sources.get(&field).map(String::as_str)
    }

    /// Write `value` into an empty `field`. Returns false when the field is
    /// already populated or the value does not fit the field.
    fn fill(&mut self, field: PropertyField, value: FieldValue) -> bool {
        if self.is_set(field) {
            return false;
        }

        match (field, value) {
            (PropertyField::Beds, FieldValue::Count(v)) => self.beds = Some(v),
            (PropertyField::YearBuilt, FieldValue::Count(v)) if (1600..=2200).contains(&v) => {
                self.year_built = Some(v)
            }
            (PropertyField::PropertyType, FieldValue::Text(v)) if !v.trim().is_empty() => {
                self.property_type = Some(v.trim().to_string())
            }
            (PropertyField::Latitude, FieldValue::Number(v)) if (-90.0..=90.0).contains(&v) => {
                self.latitude = Some(v)
            }
            (PropertyField::Longitude, FieldValue::Number(v)) if (-180.0..=180.0).contains(&v) => {
                self.longitude = Some(v)
            }
            (field, FieldValue::Number(v)) if v.is_finite() && v >= 0.0 => {
                let slot = match field {
                    PropertyField::Baths => &mut self.baths,
                    PropertyField::Sqft => &mut self.sqft,
                    PropertyField::LotSizeSqft => &mut self.lot_size_sqft,
                    PropertyField::RentEstimate => &mut self.rent_estimate,
                    PropertyField::Valuation => &mut self.valuation,
                    PropertyField::LastSalePrice => &mut self.last_sale_price,
                    _ => return false,
                };
                *slot = Some(v);
            }
            _ => return false,
        }
        true
    }
}

/// Write access to a record on behalf of one adapter
pub struct FieldMerger<'a> {
    record: &'a mut CanonicalPropertyRecord,
    label: &'a str,
    owned: &'a [PropertyField],
    written: Vec<PropertyField>,
}

impl<'a> FieldMerger<'a> {
    pub fn new(
        record: &'a mut CanonicalPropertyRecord,
        label: &'a str,
        owned: &'a [PropertyField],
    ) -> Self {
        Self {
            record,
            label,
            owned,
            written: Vec::new(),
        }
    }

    /// Read-only view of the record as left by earlier adapters
    pub fn record(&self) -> &CanonicalPropertyRecord {
        self.record
    }

    /// Offer a value for `field`. Returns true if it was written.
    pub fn set(&mut self, field: PropertyField, value: FieldValue) -> bool {
        if !self.owned.contains(&field) {
            tracing::debug!(adapter = self.label, %field, "field not owned by adapter, ignored");
            return false;
        }
        if let Some(owner) = self.record.source_of(field) {
            tracing::trace!(
                adapter = self.label,
                %field,
                owner,
                "field already populated by earlier adapter"
            );
            return false;
        }
        if !self.record.fill(field, value) {
            return false;
        }
        self.record
            .provenance
            .field_sources
            .insert(field, self.label.to_string());
        self.written.push(field);
        true
    }

    pub fn set_count(&mut self, field: PropertyField, value: u32) -> bool {
        self.set(field, FieldValue::Count(value))
    }

    pub fn set_number(&mut self, field: PropertyField, value: f64) -> bool {
        self.set(field, FieldValue::Number(value))
    }

    pub fn set_text(&mut self, field: PropertyField, value: impl Into<String>) -> bool {
        self.set(field, FieldValue::Text(value.into()))
    }

    /// Fields this adapter actually wrote
    pub fn written(&self) -> &[PropertyField] {
        &self.written
    }
}

/// Result of one enrichment call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub property: CanonicalPropertyRecord,
    pub sources: Vec<String>,
    pub errors: Vec<SourceError>,
    pub meta: EnrichmentMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> CanonicalPropertyRecord {
        CanonicalPropertyRecord::seed(NormalizedAddress::parse("1 Main St, Toronto").unwrap())
    }

    #[test]
    fn test_seed_is_empty() {
        let record = seed();
        assert!(record.populated_fields().is_empty());
        assert_eq!(record.completeness(), 0.0);
        assert!(record.provenance.sources.is_empty());
    }

    #[test]
    fn test_first_writer_wins() {
        let mut record = seed();
        let owned = [PropertyField::Beds, PropertyField::Baths];

        let mut first = FieldMerger::new(&mut record, "zillow", &owned);
        assert!(first.set_count(PropertyField::Beds, 3));
        assert_eq!(first.written(), &[PropertyField::Beds]);

        let mut second = FieldMerger::new(&mut record, "rentcast", &owned);
        assert!(!second.set_count(PropertyField::Beds, 4));
        assert!(second.set_number(PropertyField::Baths, 2.0));

        assert_eq!(record.beds, Some(3));
        assert_eq!(record.source_of(PropertyField::Beds), Some("zillow"));
        assert_eq!(record.source_of(PropertyField::Baths), Some("rentcast"));
    }

    #[test]
    fn test_unowned_field_rejected() {
        let mut record = seed();
        let owned = [PropertyField::RentEstimate];
        let mut merger = FieldMerger::new(&mut record, "rentcast", &owned);

        assert!(!merger.set_number(PropertyField::Valuation, 500_000.0));
        assert!(record.valuation.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut record = seed();
        let owned = PropertyField::ALL;
        let mut merger = FieldMerger::new(&mut record, "x", &owned);

        assert!(!merger.set_number(PropertyField::Sqft, -10.0));
        assert!(!merger.set_number(PropertyField::Valuation, f64::NAN));
        assert!(!merger.set_number(PropertyField::Latitude, 123.0));
        assert!(!merger.set_count(PropertyField::YearBuilt, 12));
        assert!(!merger.set_text(PropertyField::PropertyType, "  "));
        assert!(!merger.set_text(PropertyField::Beds, "three"));
        assert!(merger.written().is_empty());
    }

    #[test]
    fn test_serializes_field_sources_by_name() {
        let mut record = seed();
        let owned = [PropertyField::LotSizeSqft];
        FieldMerger::new(&mut record, "zillow", &owned).set_number(PropertyField::LotSizeSqft, 4000.0);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["provenance"]["field_sources"]["lot_size_sqft"], "zillow");

        let back: CanonicalPropertyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
