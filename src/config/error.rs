//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration file not found; searched: {}", searched_paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    #[error("Failed to read configuration file {path}: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration source {path}: {message}")]
    InvalidSource { path: String, message: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration value: {field}")]
    MissingValue { field: String },

    #[error("Configuration parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("Secret not found: {name}")]
    SecretNotFound { name: String },
}

impl ConfigurationError {
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    pub fn file_read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileReadError {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_source(path: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidSource {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_value(field: impl Into<String>) -> Self {
        Self::MissingValue {
            field: field.into(),
        }
    }

    pub fn parameter_not_found(name: impl Into<String>) -> Self {
        Self::ParameterNotFound { name: name.into() }
    }

    pub fn secret_not_found(name: impl Into<String>) -> Self {
        Self::SecretNotFound { name: name.into() }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
