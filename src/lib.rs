#![allow(clippy::doc_markdown)] // Allow technical terms like SRT, WAV in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Speechflow Core
//!
//! Asynchronous work pipeline for speech synthesis requests.
//!
//! ## Overview
//!
//! Messages arrive from a broker, are admitted to a bounded priority queue and
//! are processed by a pool of competing tasks. Each item runs through an ordered
//! chain of strategies sharing one per-item context:
//!
//! ```text
//! validation -> synthesis -> transcription -> post_processing -> word_split
//! ```
//!
//! A strategy can skip itself, redirect the chain to another strategy or stop
//! it. Failed items are classified from the recorded errors: transient ones are
//! requeued (demoted from their second retry on), everything else fails
//! permanently.
//!
//! ## Module Organization
//!
//! - [`queue`] - Priority-bucketed FIFO with retry and demotion
//! - [`orchestration`] - Strategy trait, chain execution and failure classification
//! - [`strategies`] - The built-in speech strategies and their wiring
//! - [`services`] - Collaborator traits (synthesis, alignment, upload, storage) and local implementations
//! - [`messaging`] - Broker abstraction and the in-memory broker
//! - [`worker`] - The long-running consumer with graceful shutdown
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use speechflow_core::config::ConfigManager;
//! use speechflow_core::messaging::InMemoryBroker;
//! use speechflow_core::queue::ProcessingQueue;
//! use speechflow_core::strategies::{default_chain, Collaborators};
//! use speechflow_core::worker::MessageConsumerWorker;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let collaborators = Collaborators::local(config)?;
//! let orchestrator = Arc::new(default_chain(config, &collaborators)?);
//! let queue = Arc::new(ProcessingQueue::from_config(&config.queue));
//! let broker = Arc::new(InMemoryBroker::new());
//!
//! let worker = MessageConsumerWorker::new(config.worker.clone(), broker, queue, orchestrator);
//! let report = worker.run_until_signal().await?;
//! println!("drained: {}", report.drained);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod queue;
pub mod services;
pub mod strategies;
pub mod utils;
pub mod worker;

pub use config::{ConfigManager, ConfigurationError, SpeechflowConfig};
pub use error::{Result, SpeechflowError};
pub use messaging::{BrokerMessage, InMemoryBroker, MessageBroker, MessageHandler};
pub use models::Payload;
pub use orchestration::{
    OrchestrationOutcome, SharedContext, Strategy, StrategyOrchestrator, StrategyResult,
};
pub use queue::{MessagePriority, ProcessingQueue, QueuedItem};
pub use strategies::{default_chain, Collaborators};
pub use worker::{MessageConsumerWorker, ShutdownReport};
