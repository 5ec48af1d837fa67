/*!
 * Keystone CLI Style System
 *
 * Styling helpers for human-readable CLI output: themed text, tables for
 * records, provenance and insights, and status messages.
 */

use crate::record::{EnrichmentResult, PropertyField};
use crate::scoring::{PropertyInsight, Severity};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const SKIPPED: &'static str = "○";
    pub const ARROW_RIGHT: &'static str = "→";
}

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.len().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a key-value table
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Populated fields with the adapter each one came from
pub fn record_table(result: &EnrichmentResult) -> Table {
    let record = &result.property;
    let mut table = create_table();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Value"),
        header_cell("Source"),
    ]);

    for field in PropertyField::ALL {
        let value = match field {
            PropertyField::Beds => record.beds.map(|v| v.to_string()),
            PropertyField::Baths => record.baths.map(|v| format!("{}", v)),
            PropertyField::Sqft => record.sqft.map(|v| format!("{:.0}", v)),
            PropertyField::LotSizeSqft => record.lot_size_sqft.map(|v| format!("{:.0}", v)),
            PropertyField::YearBuilt => record.year_built.map(|v| v.to_string()),
            PropertyField::PropertyType => record.property_type.clone(),
            PropertyField::RentEstimate => record.rent_estimate.map(format_money),
            PropertyField::Valuation => record.valuation.map(format_money),
            PropertyField::LastSalePrice => record.last_sale_price.map(format_money),
            PropertyField::Latitude => record.latitude.map(|v| format!("{:.5}", v)),
            PropertyField::Longitude => record.longitude.map(|v| format!("{:.5}", v)),
        };

        let row = match value {
            Some(value) => vec![
                Cell::new(field.name()),
                Cell::new(value).add_attribute(Attribute::Bold),
                Cell::new(record.source_of(field).unwrap_or("-")).fg(Color::DarkGrey),
            ],
            None => vec![
                Cell::new(field.name()).fg(Color::DarkGrey),
                Cell::new("-").fg(Color::DarkGrey),
                Cell::new(""),
            ],
        };
        table.add_row(row);
    }

    table
}

/// One row per registered adapter with its outcome
pub fn provenance_table(result: &EnrichmentResult) -> Table {
    let mut table = create_table();
    table.set_header(vec![header_cell("Adapter"), header_cell("Outcome")]);

    for label in &result.meta.attempted {
        let outcome = if result.sources.contains(label) {
            Cell::new(format!("{} ok", Icons::SUCCESS)).fg(Color::Green)
        } else if result.meta.skipped.contains(label) {
            Cell::new(format!("{} disabled", Icons::SKIPPED)).fg(Color::DarkGrey)
        } else if let Some(err) = result.errors.iter().find(|e| &e.label == label) {
            Cell::new(format!("{} {}", Icons::ERROR, err.message)).fg(Color::Red)
        } else {
            Cell::new("-")
        };
        table.add_row(vec![Cell::new(label), outcome]);
    }

    table
}

/// Score, breakdown and risk flags
pub fn insight_table(insight: &PropertyInsight) -> Table {
    let mut table = stats_table(&[
        ("Score", insight.score.to_string()),
        ("Confidence", insight.confidence_score.to_string()),
        ("Livability", insight.breakdown.livability.to_string()),
        ("Efficiency", insight.breakdown.efficiency.to_string()),
        ("Market strength", insight.breakdown.market_strength.to_string()),
        ("Risk", insight.breakdown.risk.to_string()),
    ]);

    for flag in &insight.risk_flags {
        let color = match flag.severity {
            Severity::High => Color::Red,
            Severity::Medium => Color::Yellow,
            Severity::Low => Color::DarkGrey,
        };
        table.add_row(vec![
            Cell::new(format!("{} {}", Icons::WARNING, flag.label)).fg(color),
            Cell::new(format!("{} ({})", flag.detail, flag.severity)).fg(color),
        ]);
    }

    table
}

/// Whole-unit currency with thousands separators
pub fn format_money(amount: f64) -> String {
    let whole = amount.round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${}", out)
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}
