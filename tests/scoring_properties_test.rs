//! Property-based tests for the scoring engine
//!
//! Properties:
//! - every breakdown value, the score and the confidence score lie in [0, 100]
//! - scoring is deterministic: the same record always yields the same insight
//! - a service profile only ever changes the efficiency dimension and the
//!   values derived from it

use chrono::{TimeZone, Utc};
use keystone::record::{EnrichmentMeta, SourceError};
use keystone::scoring::{score, score_with_profile, PropertyInsight, ServiceProfile};
use keystone::{CanonicalPropertyRecord, NormalizedAddress};
use proptest::prelude::*;

// ============================================================================
// STRATEGIES
// ============================================================================

fn arb_amount(max: f64) -> impl Strategy<Value = Option<f64>> {
    prop::option::of(0.0..max)
}

fn arb_labels() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{3,8}", 0..4)
}

/// Records with any combination of populated facts and provenance
fn arb_record() -> impl Strategy<Value = CanonicalPropertyRecord> {
    let facts = (
        prop::option::of(0u32..12),
        arb_amount(8.0),
        arb_amount(20_000.0),
        arb_amount(500_000.0),
        prop::option::of(1600u32..2200),
        prop::option::of("[a-z]{4,12}"),
    );
    let money = (
        arb_amount(50_000.0),
        arb_amount(10_000_000.0),
        arb_amount(10_000_000.0),
        prop::option::of(-90.0..90.0f64),
        prop::option::of(-180.0..180.0f64),
    );
    let provenance = (arb_labels(), arb_labels(), 0usize..3, any::<bool>());

    (facts, money, provenance).prop_map(
        |(
            (beds, baths, sqft, lot, year, kind),
            (rent, valuation, last_sale, lat, lon),
            (sources, failed, skipped, with_meta),
        )| {
            let address = NormalizedAddress::parse("10 Test Ave, Calgary, AB T2P 1J9")
                .expect("fixture address parses");
            let mut record = CanonicalPropertyRecord::seed(address);
            record.beds = beds;
            record.baths = baths;
            record.sqft = sqft;
            record.lot_size_sqft = lot;
            record.year_built = year;
            record.property_type = kind;
            record.rent_estimate = rent;
            record.valuation = valuation;
            record.last_sale_price = last_sale;
            record.latitude = lat;
            record.longitude = lon;

            let errors: Vec<SourceError> = failed
                .iter()
                .map(|label| SourceError {
                    label: label.clone(),
                    message: "circuit open".to_string(),
                })
                .collect();

            if with_meta {
                let mut attempted = sources.clone();
                attempted.extend(failed.iter().cloned());
                let skipped: Vec<String> =
                    (0..skipped).map(|i| format!("disabled{}", i)).collect();
                attempted.extend(skipped.iter().cloned());
                record.provenance.meta = Some(EnrichmentMeta {
                    attempted,
                    skipped,
                    sources: sources.clone(),
                    errors: errors.clone(),
                    timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                });
            }
            record.provenance.sources = sources;
            record.provenance.errors = errors;
            record
        },
    )
}

fn arb_profile() -> impl Strategy<Value = ServiceProfile> {
    (0.0..600.0f64, 0.0..120.0f64, 0.0..600.0f64, 0.0..600.0f64).prop_map(
        |(base, per_sqft, per_acre, target)| ServiceProfile {
            name: "generated".to_string(),
            base_minutes: base,
            minutes_per_1000_sqft: per_sqft,
            minutes_per_acre: per_acre,
            target_minutes: target,
        },
    )
}

fn assert_bounded(insight: &PropertyInsight) -> Result<(), TestCaseError> {
    prop_assert!(insight.score <= 100);
    prop_assert!(insight.confidence_score <= 100);
    prop_assert!(insight.breakdown.livability <= 100);
    prop_assert!(insight.breakdown.efficiency <= 100);
    prop_assert!(insight.breakdown.market_strength <= 100);
    prop_assert!(insight.breakdown.risk <= 100);
    prop_assert!(!insight.summary.is_empty());
    Ok(())
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_scores_are_bounded(record in arb_record()) {
        assert_bounded(&score(&record))?;
    }

    #[test]
    fn prop_scoring_is_deterministic(record in arb_record()) {
        let first = score(&record);
        let second = score(&record.clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_profile_scores_are_bounded(record in arb_record(), profile in arb_profile()) {
        let insight = score_with_profile(&record, &profile);
        assert_bounded(&insight)?;
        prop_assert_eq!(&insight, &score_with_profile(&record, &profile));
    }

    #[test]
    fn prop_profile_only_touches_efficiency(record in arb_record(), profile in arb_profile()) {
        let plain = score(&record);
        let profiled = score_with_profile(&record, &profile);

        prop_assert_eq!(plain.breakdown.livability, profiled.breakdown.livability);
        prop_assert_eq!(plain.breakdown.market_strength, profiled.breakdown.market_strength);
        prop_assert_eq!(plain.breakdown.risk, profiled.breakdown.risk);
        prop_assert_eq!(plain.confidence_score, profiled.confidence_score);
        prop_assert_eq!(plain.risk_flags, profiled.risk_flags);
    }

    #[test]
    fn prop_more_errors_never_raise_confidence(record in arb_record()) {
        let mut degraded = record.clone();
        degraded.provenance.errors.push(SourceError {
            label: "extra".to_string(),
            message: "503 service unavailable".to_string(),
        });
        prop_assert!(score(&degraded).confidence_score <= score(&record).confidence_score);
    }
}

#[test]
fn test_empty_record_is_bounded() {
    let record = CanonicalPropertyRecord::seed(NormalizedAddress::parse("1 Main St").unwrap());
    let insight = score(&record);

    assert!(insight.score <= 100);
    assert_eq!(insight.confidence_score, 0);
    assert_eq!(insight.breakdown.market_strength, 50);
}
