//! Risk rules
//!
//! Each rule is a pure function of the record that raises at most one flag.
//! Rules are independent; the risk dimension is the clamped sum of the
//! severities they raise.

use super::price_to_rent;
use crate::record::CanonicalPropertyRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a flag contributes to the risk dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Low => 5.0,
            Severity::Medium => 15.0,
            Severity::High => 30.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub label: String,
    pub severity: Severity,
    pub detail: String,
}

impl RiskFlag {
    fn new(label: &str, severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            severity,
            detail: detail.into(),
        }
    }
}

type Rule = fn(&CanonicalPropertyRecord) -> Option<RiskFlag>;

const RULES: &[Rule] = &[
    missing_valuation,
    small_lot,
    no_sources,
    single_source,
    provider_errors,
    missing_core_facts,
    old_construction,
    weak_yield,
];

const TINY_LOT_SQFT: f64 = 1_000.0;
const SMALL_LOT_SQFT: f64 = 2_500.0;
const OLD_CONSTRUCTION_YEAR: u32 = 1940;
const WEAK_YIELD_PRICE_TO_RENT: f64 = 25.0;

/// Run every rule against `record`, in a fixed order
pub fn evaluate_risk(record: &CanonicalPropertyRecord) -> Vec<RiskFlag> {
    RULES.iter().filter_map(|rule| rule(record)).collect()
}

fn missing_valuation(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    record.valuation.is_none().then(|| {
        RiskFlag::new(
            "missing_valuation",
            Severity::Medium,
            "no valuation from any source",
        )
    })
}

fn small_lot(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    let lot = record.lot_size_sqft?;
    let severity = if lot < TINY_LOT_SQFT {
        Severity::High
    } else if lot < SMALL_LOT_SQFT {
        Severity::Medium
    } else {
        return None;
    };
    Some(RiskFlag::new(
        "small_lot",
        severity,
        format!("lot is {:.0} sqft", lot),
    ))
}

fn no_sources(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    record.provenance.sources.is_empty().then(|| {
        RiskFlag::new(
            "no_sources",
            Severity::High,
            "no upstream source contributed data",
        )
    })
}

fn single_source(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    match record.provenance.sources.as_slice() {
        [only] => Some(RiskFlag::new(
            "single_source",
            Severity::Low,
            format!("all data came from {}", only),
        )),
        _ => None,
    }
}

fn provider_errors(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    let errors = &record.provenance.errors;
    if errors.is_empty() {
        return None;
    }
    let labels: Vec<&str> = errors.iter().map(|e| e.label.as_str()).collect();
    Some(RiskFlag::new(
        "provider_errors",
        Severity::Medium,
        format!("failed sources: {}", labels.join(", ")),
    ))
}

fn missing_core_facts(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    (record.beds.is_none() && record.baths.is_none() && record.sqft.is_none()).then(|| {
        RiskFlag::new(
            "missing_core_facts",
            Severity::High,
            "beds, baths and living area are all unknown",
        )
    })
}

fn old_construction(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    let year = record.year_built?;
    (year < OLD_CONSTRUCTION_YEAR).then(|| {
        RiskFlag::new(
            "old_construction",
            Severity::Low,
            format!("built in {}", year),
        )
    })
}

fn weak_yield(record: &CanonicalPropertyRecord) -> Option<RiskFlag> {
    let ptr = price_to_rent(record)?;
    (ptr > WEAK_YIELD_PRICE_TO_RENT).then(|| {
        RiskFlag::new(
            "weak_yield",
            Severity::Medium,
            format!("price is {:.1}x annual rent", ptr),
        )
    })
}
