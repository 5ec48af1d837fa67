/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;
use crate::error::{KeystoneError, Result};

/// Effective level: `verbose` forces debug
pub fn effective_level(config: &LoggingConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.level.to_tracing_level()
    }
}

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let log_level = effective_level(config);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "keystone={},keystone_core_resilience={}",
                log_level, log_level
            ))
        })
        .map_err(|e| KeystoneError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(ref log_path) = config.file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

/// Compact human-readable output on stderr, keeping stdout for results
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// JSON lines to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| KeystoneError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Route log output through the test harness
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keystone=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_verbose_overrides_log_level() {
        let config = LoggingConfig {
            level: LogLevel::Error,
            file: None,
            verbose: true,
        };
        assert_eq!(effective_level(&config), Level::DEBUG);
    }

    #[test]
    fn test_configured_level_used() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            ..Default::default()
        };
        assert_eq!(effective_level(&config), Level::WARN);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), Level::TRACE);
    }
}
