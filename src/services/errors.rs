//! Errors raised by external collaborators (synthesis, alignment, upload, storage, webhooks).

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("{operation} timeout after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Connection error in {service}: {message}")]
    Connection { service: String, message: String },

    #[error("Service {service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{service} failed: {message}")]
    Failed { service: String, message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl CollaboratorError {
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn connection(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Collaborator (or operation) the error originated from
    pub fn service(&self) -> &str {
        match self {
            Self::Timeout { operation, .. } => operation,
            Self::Connection { service, .. }
            | Self::Unavailable { service, .. }
            | Self::Failed { service, .. } => service,
            Self::Io { .. } => "filesystem",
            Self::Serialization { .. } => "serialization",
            Self::Http { .. } => "http",
        }
    }
}

impl From<std::io::Error> for CollaboratorError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            Self::connection("http", error.to_string())
        } else if error.is_timeout() {
            Self::Http {
                message: format!("request timeout: {error}"),
            }
        } else {
            Self::Http {
                message: error.to_string(),
            }
        }
    }
}

/// Result type for collaborator calls
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
