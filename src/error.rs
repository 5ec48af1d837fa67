/*!
 * Error types for Keystone
 */

use keystone_core_resilience::ResilienceError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum KeystoneError {
    /// Address is empty or has no usable content
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two adapters registered under the same label
    #[error("Adapter '{0}' is already registered")]
    DuplicateAdapter(String),

    /// Upstream failure that escaped to a caller (never from `enrich`)
    #[error("Upstream error: {0}")]
    Upstream(#[from] ResilienceError),

    /// Record store failure
    #[error("Record store error at {path}: {message}")]
    Store { path: PathBuf, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KeystoneError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            KeystoneError::InvalidAddress(_)
            | KeystoneError::Config(_)
            | KeystoneError::DuplicateAdapter(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Whether the caller supplied bad input (as opposed to an environment failure)
    pub fn is_validation(&self) -> bool {
        matches!(self, KeystoneError::InvalidAddress(_))
    }
}

impl From<toml::de::Error> for KeystoneError {
    fn from(err: toml::de::Error) -> Self {
        KeystoneError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for KeystoneError {
    fn from(err: toml::ser::Error) -> Self {
        KeystoneError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            KeystoneError::InvalidAddress("empty".into()).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            KeystoneError::Io(io::Error::new(io::ErrorKind::Other, "disk")).exit_code(),
            EXIT_PARTIAL
        );
    }

    #[test]
    fn test_upstream_conversion_keeps_message() {
        let err: KeystoneError = ResilienceError::CircuitOpen.into();
        assert_eq!(err.to_string(), "Upstream error: circuit open");
        assert!(!err.is_validation());
    }
}
