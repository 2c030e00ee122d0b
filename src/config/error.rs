//! Configuration errors
//!
//! This module defines error types for the configuration module.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use crate::filter::PatternError;

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// File not found
    FileNotFound(PathBuf),

    /// Error parsing configuration
    ParseError(String),

    /// Invalid value for configuration option
    InvalidValue(String, String),

    /// A host pattern list contains an invalid regular expression
    InvalidPattern {
        /// Option holding the pattern
        option: &'static str,
        /// Compilation failure
        source: PatternError,
    },

    /// Invalid combination of configuration options
    InvalidCombination(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) =>
                write!(f, "Configuration file not found: {}", path.display()),

            ConfigError::ParseError(msg) =>
                write!(f, "Error parsing configuration: {}", msg),

            ConfigError::InvalidValue(name, msg) =>
                write!(f, "Invalid value for '{}': {}", name, msg),

            ConfigError::InvalidPattern { option, source } =>
                write!(f, "Invalid value for '{}': {}", option, source),

            ConfigError::InvalidCombination(msg) =>
                write!(f, "Invalid combination of configuration options: {}", msg),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

// Convert to crate's common error type
impl From<ConfigError> for crate::common::ProxyError {
    fn from(err: ConfigError) -> Self {
        crate::common::ProxyError::Config(err.to_string())
    }
}
