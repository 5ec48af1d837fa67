/*!
 * Scoring engine: derives a [`PropertyInsight`] from a canonical record
 *
 * Pure and total. Every value is clamped to [0, 100], missing inputs fall
 * back to the neutral midpoint, and nothing here reads the clock or performs
 * I/O, so the same record always yields the same insight.
 *
 * ```text
 * score = 0.35 * livability
 *       + 0.20 * efficiency
 *       + 0.25 * market_strength
 *       + 0.20 * (100 - risk)
 * ```
 */

mod risk;

pub use risk::{evaluate_risk, RiskFlag, Severity};

use crate::record::CanonicalPropertyRecord;
use serde::{Deserialize, Serialize};

/// Score used when a dimension has nothing to go on
pub const NEUTRAL: f64 = 50.0;

const LIVABILITY_WEIGHT: f64 = 0.35;
const EFFICIENCY_WEIGHT: f64 = 0.20;
const MARKET_WEIGHT: f64 = 0.25;
const RISK_WEIGHT: f64 = 0.20;

/// Living area to lot area ratio that scores 100
const IDEAL_COVERAGE: f64 = 0.35;

const SQFT_PER_ACRE: f64 = 43_560.0;

/// Expected on-site service duration for a property
///
/// Blended into efficiency when configured: properties that can be serviced
/// within `target_minutes` score well, longer visits score proportionally
/// lower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProfile {
    #[serde(default = "default_profile_name")]
    pub name: String,
    /// Fixed setup time per visit
    pub base_minutes: f64,
    /// Additional minutes per 1,000 sqft of living area
    #[serde(default)]
    pub minutes_per_1000_sqft: f64,
    /// Additional minutes per acre of lot
    #[serde(default)]
    pub minutes_per_acre: f64,
    /// Visit length that still scores 100
    pub target_minutes: f64,
}

fn default_profile_name() -> String {
    "standard".to_string()
}

impl Default for ServiceProfile {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            base_minutes: 30.0,
            minutes_per_1000_sqft: 15.0,
            minutes_per_acre: 45.0,
            target_minutes: 90.0,
        }
    }
}

impl ServiceProfile {
    /// Expected visit duration, or `None` when the record lacks any size facts
    pub fn expected_minutes(&self, record: &CanonicalPropertyRecord) -> Option<f64> {
        if record.sqft.is_none() && record.lot_size_sqft.is_none() {
            return None;
        }
        let living = record.sqft.unwrap_or(0.0) / 1000.0 * self.minutes_per_1000_sqft;
        let lot = record.lot_size_sqft.unwrap_or(0.0) / SQFT_PER_ACRE * self.minutes_per_acre;
        Some((self.base_minutes + living + lot).max(0.0))
    }
}

/// Per-dimension scores, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub livability: u8,
    pub efficiency: u8,
    pub market_strength: u8,
    pub risk: u8,
}

/// Derived view of a canonical record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInsight {
    pub score: u8,
    pub breakdown: Breakdown,
    pub risk_flags: Vec<RiskFlag>,
    pub confidence_score: u8,
    pub summary: String,
}

/// Score a record without a service profile
pub fn score(record: &CanonicalPropertyRecord) -> PropertyInsight {
    build_insight(record, None)
}

/// Score a record, blending expected service duration into efficiency
pub fn score_with_profile(
    record: &CanonicalPropertyRecord,
    profile: &ServiceProfile,
) -> PropertyInsight {
    build_insight(record, Some(profile))
}

fn build_insight(
    record: &CanonicalPropertyRecord,
    profile: Option<&ServiceProfile>,
) -> PropertyInsight {
    let livability = livability(record);
    let efficiency = efficiency(record, profile);
    let market = market_strength(record);

    let risk_flags = evaluate_risk(record);
    let risk = clamp(risk_flags.iter().map(|f| f.severity.weight()).sum());

    let composite = LIVABILITY_WEIGHT * livability
        + EFFICIENCY_WEIGHT * efficiency
        + MARKET_WEIGHT * market
        + RISK_WEIGHT * (100.0 - risk);
    let score = to_score(composite);
    let confidence_score = to_score(confidence(record));

    PropertyInsight {
        score,
        breakdown: Breakdown {
            livability: to_score(livability),
            efficiency: to_score(efficiency),
            market_strength: to_score(market),
            risk: to_score(risk),
        },
        summary: summarize(score, record, &risk_flags),
        risk_flags,
        confidence_score,
    }
}

fn livability(record: &CanonicalPropertyRecord) -> f64 {
    let beds = match record.beds {
        None => NEUTRAL,
        Some(0) => 30.0,
        Some(1) => 55.0,
        Some(2) => 70.0,
        Some(3..=4) => 90.0,
        Some(_) => 85.0,
    };

    let baths = match record.baths {
        None => NEUTRAL,
        Some(b) if b >= 2.0 => 90.0,
        Some(b) if b >= 1.5 => 75.0,
        Some(b) if b >= 1.0 => 60.0,
        Some(_) => 30.0,
    };

    let space = match record.sqft {
        None => NEUTRAL,
        Some(sqft) => {
            let per_bed = sqft / f64::from(record.beds.unwrap_or(1).max(1));
            if per_bed >= 600.0 {
                95.0
            } else if per_bed >= 200.0 {
                40.0 + (per_bed - 200.0) / 400.0 * 55.0
            } else {
                30.0
            }
        }
    };

    let valuation = if record.valuation.is_some() { 70.0 } else { NEUTRAL };

    clamp(0.30 * beds + 0.25 * baths + 0.30 * space + 0.15 * valuation)
}

fn efficiency(record: &CanonicalPropertyRecord, profile: Option<&ServiceProfile>) -> f64 {
    let coverage = match (record.sqft, record.lot_size_sqft) {
        (Some(sqft), Some(lot)) if lot > 0.0 => {
            clamp(100.0 - (sqft / lot - IDEAL_COVERAGE).abs() * 150.0)
        }
        _ => NEUTRAL,
    };

    let Some(profile) = profile else {
        return coverage;
    };

    let service = match profile.expected_minutes(record) {
        Some(expected) if expected <= profile.target_minutes => 100.0,
        Some(expected) if expected > 0.0 && profile.target_minutes > 0.0 => {
            clamp(100.0 * profile.target_minutes / expected)
        }
        Some(_) => 0.0,
        None => NEUTRAL,
    };

    clamp(0.6 * coverage + 0.4 * service)
}

/// Years of gross rent needed to pay the valuation
pub(crate) fn price_to_rent(record: &CanonicalPropertyRecord) -> Option<f64> {
    match (record.valuation, record.rent_estimate) {
        (Some(value), Some(rent)) if value > 0.0 && rent > 0.0 => Some(value / (rent * 12.0)),
        _ => None,
    }
}

fn market_strength(record: &CanonicalPropertyRecord) -> f64 {
    match price_to_rent(record) {
        Some(ptr) => clamp(100.0 - (ptr - 10.0) * 5.0),
        None => NEUTRAL,
    }
}

/// Adapters that were actually invoked: attempted minus skipped
fn invoked_count(record: &CanonicalPropertyRecord) -> usize {
    match &record.provenance.meta {
        Some(meta) => meta.attempted.len().saturating_sub(meta.skipped.len()),
        None => record.provenance.sources.len() + record.provenance.errors.len(),
    }
}

fn confidence(record: &CanonicalPropertyRecord) -> f64 {
    let invoked = invoked_count(record);
    let source_ratio = if invoked == 0 {
        0.0
    } else {
        (record.provenance.sources.len() as f64 / invoked as f64).min(1.0)
    };
    let error_penalty = (record.provenance.errors.len() as f64 * 10.0).min(30.0);

    clamp(source_ratio * 60.0 + record.completeness() * 40.0 - error_penalty)
}

fn band(score: u8) -> &'static str {
    match score {
        80.. => "Excellent",
        65..=79 => "Good",
        50..=64 => "Fair",
        _ => "Weak",
    }
}

fn summarize(score: u8, record: &CanonicalPropertyRecord, flags: &[RiskFlag]) -> String {
    let sources = record.provenance.sources.len();
    let source_word = if sources == 1 { "source" } else { "sources" };
    let flags = if flags.is_empty() {
        "no risk flags".to_string()
    } else {
        let labels: Vec<&str> = flags.iter().map(|f| f.label.as_str()).collect();
        format!("risk flags: {}", labels.join(", "))
    };
    format!(
        "{} property (score {}/100) from {} {}; {}",
        band(score),
        score,
        sources,
        source_word,
        flags
    )
}

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        return NEUTRAL;
    }
    value.clamp(0.0, 100.0)
}

fn to_score(value: f64) -> u8 {
    clamp(value).round() as u8
}
