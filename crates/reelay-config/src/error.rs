//! Error types for configuration loading.
//!
//! # Design
//! - Keep error messages constant; carry the offending variable and value as fields.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable contained a value that failed validation.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment variable that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// An explicitly configured file does not exist.
    #[error("configured file not found")]
    MissingFile {
        /// Environment variable that referenced the file.
        field: &'static str,
        /// Path that could not be found.
        path: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidField {
            field,
            reason,
            value: Some(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_helper_captures_context() {
        let err = ConfigError::invalid("REELAY_HTTP_PORT", "not_a_number", "abc");
        assert_eq!(err.to_string(), "invalid configuration field");
        assert_eq!(
            err,
            ConfigError::InvalidField {
                field: "REELAY_HTTP_PORT",
                reason: "not_a_number",
                value: Some("abc".to_string()),
            }
        );
    }
}
