//! Configuration Error Types
//!
//! Errors raised while loading, merging and validating configuration.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Failed to read or merge configuration sources
    #[error("Failed to load configuration from {source_description}: {error}")]
    LoadFailed {
        source_description: String,
        error: String,
    },

    /// Merged configuration did not match the expected structure
    #[error("Failed to deserialize configuration: {0}")]
    Deserialization(String),

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },
}

impl ConfigurationError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        match &error {
            config::ConfigError::Type { .. } | config::ConfigError::Message(_) => {
                Self::Deserialization(error.to_string())
            }
            _ => Self::LoadFailed {
                source_description: "configuration sources".to_string(),
                error: error.to_string(),
            },
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
