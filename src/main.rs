/*!
 * Keystone CLI - Command Line Interface
 *
 * Enriches an address from the adapters listed in a TOML configuration,
 * optionally scores the fused record, and prints a table or JSON.
 */

use clap::{Parser, Subcommand, ValueEnum};
use keystone::{
    cli_style::{
        self, insight_table, print_error, print_info, provenance_table, record_table,
        section_header, Theme,
    },
    config::{KeystoneConfig, LogLevel},
    error::{KeystoneError, Result, EXIT_PARTIAL, EXIT_SUCCESS},
    logging, scoring, AdapterRegistry, CanonicalPropertyRecord, EnrichmentContext,
    EnrichmentResult, FusionEngine, JsonDirStore, PropertyInsight,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(version, about = "Property data enrichment with fault-tolerant source fusion", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Log file path (JSON lines)
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich an address from every enabled adapter
    Enrich {
        /// Free-form address, e.g. "123 Main St, Toronto, ON M5V 2T6"
        address: String,

        /// Ignore any cached result
        #[arg(long)]
        force: bool,

        /// Print machine-readable JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Also score the fused record
        #[arg(long)]
        score: bool,
    },

    /// Score a canonical record (or enrichment result) stored as JSON
    Score {
        /// Path to the JSON file, or "-" for stdin
        record: PathBuf,

        /// Print machine-readable JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Print a sample configuration
    Config,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Serialize)]
struct EnrichOutput<'a> {
    #[serde(flatten)]
    result: &'a EnrichmentResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    insight: Option<&'a PropertyInsight>,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            print_error(&e.to_string(), hint_for(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        print!("{}", KeystoneConfig::sample().to_toml_string()?);
        return Ok(EXIT_SUCCESS);
    }

    let mut config = match cli.config {
        Some(ref path) => KeystoneConfig::from_file(path)?,
        None => KeystoneConfig::default(),
    };

    if let Some(level) = cli.log_level {
        config.logging.level = level.into();
    }
    if cli.log.is_some() {
        config.logging.file = cli.log.clone();
    }
    config.logging.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config.logging) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    match cli.command {
        Commands::Enrich {
            address,
            force,
            json,
            score,
        } => handle_enrich(&config, &address, force, json, score),
        Commands::Score { record, json } => handle_score(&config, &record, json),
        Commands::Config => Ok(EXIT_SUCCESS),
    }
}

fn handle_enrich(
    config: &KeystoneConfig,
    address: &str,
    force: bool,
    json: bool,
    with_score: bool,
) -> Result<i32> {
    let registry = AdapterRegistry::from_config(config)?;
    if registry.is_empty() {
        cli_style::print_warning("No adapters configured; the record will contain only the address");
    }

    let mut engine = FusionEngine::new(registry, EnrichmentContext::from_config(config));
    if let Some(dir) = &config.store.dir {
        engine = engine.with_store(Arc::new(JsonDirStore::new(dir.clone())));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(engine.enrich(address, force))?;

    let insight = with_score.then(|| score_record(config, &result.property));

    if json {
        let output = EnrichOutput {
            result: &result,
            insight: insight.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "\n{} {}",
            Theme::header("Property:"),
            result.property.address
        );
        section_header("Record");
        println!("{}", record_table(&result));
        section_header("Sources");
        println!("{}", provenance_table(&result));
        if let Some(insight) = &insight {
            print_insight(insight);
        }
    }

    // Some adapter failed: usable output, but not a clean run
    if result.errors.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PARTIAL)
    }
}

fn handle_score(config: &KeystoneConfig, path: &Path, json: bool) -> Result<i32> {
    let contents = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)?
    };
    let record = parse_record(&contents)?;
    let insight = score_record(config, &record);

    if json {
        println!("{}", serde_json::to_string_pretty(&insight)?);
    } else {
        println!("\n{} {}", Theme::header("Property:"), record.address);
        print_insight(&insight);
    }
    Ok(EXIT_SUCCESS)
}

/// Accept either a bare record or a full enrichment result
fn parse_record(contents: &str) -> Result<CanonicalPropertyRecord> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    let record = match value.get("property") {
        Some(property) => serde_json::from_value(property.clone())?,
        None => serde_json::from_value(value)?,
    };
    Ok(record)
}

fn score_record(config: &KeystoneConfig, record: &CanonicalPropertyRecord) -> PropertyInsight {
    match &config.scoring.service_profile {
        Some(profile) => scoring::score_with_profile(record, profile),
        None => scoring::score(record),
    }
}

fn print_insight(insight: &PropertyInsight) {
    section_header("Insight");
    println!("{}", insight_table(insight));
    print_info(&insight.summary);
}

fn hint_for(error: &KeystoneError) -> Option<&'static str> {
    match error {
        KeystoneError::InvalidAddress(_) => {
            Some("Provide a street line, e.g. \"123 Main St, Toronto, ON M5V 2T6\"")
        }
        KeystoneError::Config(_) | KeystoneError::DuplicateAdapter(_) => {
            Some("Run `keystone config` to print a working sample configuration")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_enrich_flags() {
        let cli = Cli::try_parse_from([
            "keystone",
            "enrich",
            "1 Main St, Toronto",
            "--force",
            "--score",
            "-c",
            "keystone.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("keystone.toml")));
        match cli.command {
            Commands::Enrich {
                address,
                force,
                json,
                score,
            } => {
                assert_eq!(address, "1 Main St, Toronto");
                assert!(force);
                assert!(!json);
                assert!(score);
            }
            _ => panic!("expected enrich"),
        }
    }

    #[test]
    fn test_parse_record_accepts_both_shapes() {
        let record = serde_json::json!({
            "address": { "line1": "1 Main St", "city": "Toronto", "province": null, "postal": null },
            "beds": 2, "baths": null, "sqft": null, "lot_size_sqft": null,
            "year_built": null, "property_type": null, "rent_estimate": null,
            "valuation": null, "last_sale_price": null, "latitude": null, "longitude": null
        });
        let bare = parse_record(&record.to_string()).unwrap();
        assert_eq!(bare.beds, Some(2));

        let wrapped = serde_json::json!({ "property": record });
        assert_eq!(parse_record(&wrapped.to_string()).unwrap(), bare);
    }
}
