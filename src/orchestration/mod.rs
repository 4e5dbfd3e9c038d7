//! # Orchestration Engine
//!
//! Ordered chain of processing strategies run over each dequeued item.
//!
//! ## Core Components
//!
//! - **Strategy**: one link of the chain (`can_handle` / `execute` / lifecycle hooks)
//! - **StrategyOrchestrator**: sorts, validates and runs the chain with skip, jump and stop
//! - **SharedContext**: typed per-item state strategies read and write
//! - **ErrorClassifier**: turns recorded failures into a retry decision

pub mod context;
pub mod error_classifier;
pub mod errors;
pub mod orchestrator;
pub mod strategy;
pub mod types;

pub use context::SharedContext;
pub use error_classifier::{
    classify_error_text, ErrorClassification, ErrorClassifier, FailureClass, RetryDecision,
    StandardErrorClassifier,
};
pub use errors::{OrchestrationError, StrategyError};
pub use orchestrator::StrategyOrchestrator;
pub use strategy::{Strategy, StrategyDescriptor, StrategyResult};
pub use types::{OrchestrationOutcome, StrategyExecution};
