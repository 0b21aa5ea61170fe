//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort startup before any pull request is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to load configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not a valid JSON object
    #[error("Malformed configuration in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// CLI override names a property the configuration does not declare
    #[error("Unsupported argument: {0}")]
    UnsupportedArgument(String),

    /// Override (or file value) does not have the type of its default
    #[error("Type of {name} parameter must be {expected}, got {value:?}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        value: String,
    },

    /// Property declared more than once
    #[error("Duplicate property: {0}")]
    DuplicateProperty(String),

    /// Required property is absent from the configuration file
    #[error("Missing required property: {0}")]
    MissingProperty(&'static str),

    /// Property has the right type but an unusable value
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
