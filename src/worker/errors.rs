//! Worker lifecycle errors.

use thiserror::Error;

use crate::messaging::BrokerError;
use crate::orchestration::OrchestrationError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Worker is not running")]
    NotRunning,

    #[error("Shutdown in progress")]
    ShutdownInProgress,

    #[error("Processing queue is closed; build a new queue to restart")]
    QueueClosed,

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Signal handling error: {0}")]
    Signal(String),
}

impl WorkerError {
    pub fn task_join(message: impl Into<String>) -> Self {
        Self::TaskJoin(message.into())
    }

    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal(message.into())
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
