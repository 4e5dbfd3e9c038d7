//! Crate-level error type aggregating the per-module error enums.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::BrokerError;
use crate::orchestration::errors::{OrchestrationError, StrategyError};
use crate::services::CollaboratorError;
use crate::worker::WorkerError;

#[derive(Error, Debug)]
pub enum SpeechflowError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

pub type Result<T> = std::result::Result<T, SpeechflowError>;
