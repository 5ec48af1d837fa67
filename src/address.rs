/*!
 * Address normalization
 *
 * Turns a free-form address string into the seed of a canonical record:
 * trimmed, whitespace-collapsed, and split into street line, city,
 * province/state and postal code where the input is parseable.
 */

use crate::error::{KeystoneError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Longest address accepted, in characters
pub const MAX_ADDRESS_LEN: usize = 512;

static CA_POSTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]\d[a-z])\s?(\d[a-z]\d)$").expect("static regex is valid")
});

static US_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5}(?:-\d{4})?)$").expect("static regex is valid"));

/// A normalized, decomposed address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    /// Street line (number, street, unit)
    pub line1: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal: Option<String>,
}

impl NormalizedAddress {
    /// Normalize a raw address.
    ///
    /// Fails with [`KeystoneError::InvalidAddress`] when the input is empty,
    /// too long, or contains no letters or digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            return Err(KeystoneError::InvalidAddress(
                "address is empty".to_string(),
            ));
        }
        if collapsed.chars().count() > MAX_ADDRESS_LEN {
            return Err(KeystoneError::InvalidAddress(format!(
                "address exceeds {} characters",
                MAX_ADDRESS_LEN
            )));
        }
        if !collapsed.chars().any(char::is_alphanumeric) {
            return Err(KeystoneError::InvalidAddress(format!(
                "address has no usable content: {:?}",
                collapsed
            )));
        }

        let parts: Vec<&str> = collapsed
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let Some((last, head)) = parts.split_last() else {
            return Err(KeystoneError::InvalidAddress(
                "address has no usable content".to_string(),
            ));
        };

        let (remainder, postal) = split_postal(last);
        let (remainder, province) = split_province(&remainder);

        let (line1, city, province) = match head {
            // No commas: keep the whole thing as the street line
            [] => {
                return Ok(Self {
                    line1: (*last).to_string(),
                    city: None,
                    province: None,
                    postal: None,
                })
            }
            // "street, city [prov] [postal]"
            [street] => (street.to_string(), non_empty(remainder), province),
            // "street[, unit], city, [prov] [postal]"
            [street @ .., city] => {
                let province = province.or_else(|| non_empty(remainder));
                (street.join(", "), Some(city.to_string()), province)
            }
        };

        Ok(Self {
            line1,
            city,
            province,
            postal,
        })
    }

    /// Cache and store key: case-insensitive, whitespace-insensitive
    pub fn key(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line1)?;
        if let Some(city) = &self.city {
            write!(f, ", {}", city)?;
        }
        let region: Vec<&str> = [self.province.as_deref(), self.postal.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !region.is_empty() {
            write!(f, ", {}", region.join(" "))?;
        }
        Ok(())
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Strip a trailing Canadian postal code or US ZIP code
fn split_postal(segment: &str) -> (String, Option<String>) {
    if let Some(caps) = CA_POSTAL.captures(segment) {
        let start = caps.get(0).map_or(segment.len(), |m| m.start());
        let postal = format!("{} {}", &caps[1], &caps[2]).to_uppercase();
        return (segment[..start].trim().to_string(), Some(postal));
    }
    if let Some(caps) = US_ZIP.captures(segment) {
        let start = caps.get(0).map_or(segment.len(), |m| m.start());
        return (
            segment[..start].trim().to_string(),
            Some(caps[1].to_string()),
        );
    }
    (segment.trim().to_string(), None)
}

/// Strip a trailing two-letter province or state abbreviation
fn split_province(segment: &str) -> (String, Option<String>) {
    match segment.rsplit_once(' ') {
        Some((rest, token)) if is_region_code(token) => {
            (rest.trim().to_string(), Some(token.to_uppercase()))
        }
        None if is_region_code(segment) => (String::new(), Some(segment.to_uppercase())),
        _ => (segment.to_string(), None),
    }
}

fn is_region_code(token: &str) -> bool {
    token.len() == 2 && token.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_canadian_address() {
        let addr = NormalizedAddress::parse("  123  Main St ,Toronto, on m5v2t6 ").unwrap();
        assert_eq!(addr.line1, "123 Main St");
        assert_eq!(addr.city.as_deref(), Some("Toronto"));
        assert_eq!(addr.province.as_deref(), Some("ON"));
        assert_eq!(addr.postal.as_deref(), Some("M5V 2T6"));
        assert_eq!(addr.to_string(), "123 Main St, Toronto, ON M5V 2T6");
    }

    #[test]
    fn test_us_address_with_unit() {
        let addr =
            NormalizedAddress::parse("42 Elm Ave, Apt 4, Springfield, IL 62704-1234").unwrap();
        assert_eq!(addr.line1, "42 Elm Ave, Apt 4");
        assert_eq!(addr.city.as_deref(), Some("Springfield"));
        assert_eq!(addr.province.as_deref(), Some("IL"));
        assert_eq!(addr.postal.as_deref(), Some("62704-1234"));
    }

    #[test]
    fn test_city_and_region_in_one_segment() {
        let addr = NormalizedAddress::parse("9 Bay Rd, Halifax NS B3H 1A1").unwrap();
        assert_eq!(addr.line1, "9 Bay Rd");
        assert_eq!(addr.city.as_deref(), Some("Halifax"));
        assert_eq!(addr.province.as_deref(), Some("NS"));
        assert_eq!(addr.postal.as_deref(), Some("B3H 1A1"));
    }

    #[test]
    fn test_unparseable_tail_kept_as_city() {
        let addr = NormalizedAddress::parse("1 Rue Principale, Montréal").unwrap();
        assert_eq!(addr.city.as_deref(), Some("Montréal"));
        assert!(addr.province.is_none());
        assert!(addr.postal.is_none());
    }

    #[test]
    fn test_single_segment() {
        let addr = NormalizedAddress::parse("742 Evergreen Terrace").unwrap();
        assert_eq!(addr.line1, "742 Evergreen Terrace");
        assert!(addr.city.is_none());
    }

    #[test]
    fn test_key_is_case_and_space_insensitive() {
        let a = NormalizedAddress::parse("123 Main St, Toronto, ON M5V 2T6").unwrap();
        let b = NormalizedAddress::parse("123   MAIN ST,toronto,  on  m5v 2t6").unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_rejects_empty_and_junk() {
        assert!(NormalizedAddress::parse("").unwrap_err().is_validation());
        assert!(NormalizedAddress::parse("   \t ").unwrap_err().is_validation());
        assert!(NormalizedAddress::parse(", , ,").unwrap_err().is_validation());
        assert!(NormalizedAddress::parse(&"x".repeat(MAX_ADDRESS_LEN + 1)).is_err());
    }
}
