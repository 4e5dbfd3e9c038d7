//! # Orchestration Errors
//!
//! `OrchestrationError` covers chain construction and lifecycle failures, which
//! are fatal at startup. `StrategyError` is what an individual strategy returns;
//! the orchestrator converts it into a failed execution record and carries on.

use std::time::Duration;
use thiserror::Error;

use crate::services::CollaboratorError;

/// Chain construction and lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("Duplicate strategy name: {name}")]
    DuplicateStrategy { name: String },

    #[error("Strategy '{strategy}' declares jump target '{target}' which is not registered")]
    UnresolvedJumpTarget { strategy: String, target: String },

    #[error("Strategy '{strategy}' failed to initialize: {message}")]
    InitializationFailed { strategy: String, message: String },
}

/// Errors returned from `Strategy::execute`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Temporary failure: {message}")]
    Transient { message: String },

    #[error("{operation} timeout after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Collaborator '{collaborator}' failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("Internal strategy error: {message}")]
    Internal { message: String },
}

impl StrategyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<CollaboratorError> for StrategyError {
    fn from(error: CollaboratorError) -> Self {
        match error {
            CollaboratorError::Timeout { operation, timeout } => Self::Timeout { operation, timeout },
            CollaboratorError::Connection { .. } | CollaboratorError::Unavailable { .. } => {
                Self::transient(error.to_string())
            }
            other => Self::Collaborator {
                collaborator: other.service().to_string(),
                message: other.to_string(),
            },
        }
    }
}
