//! # Worker
//!
//! The long-running consumer: one ingestion task feeding the processing queue
//! and a pool of processing tasks draining it through the strategy chain.

pub mod consumer;
pub mod errors;
pub mod stats;
pub mod status;

pub use consumer::{determine_priority, MessageConsumerWorker, ShutdownReport};
pub use errors::{WorkerError, WorkerResult};
pub use stats::{WorkerCounters, WorkerStats, WorkerStatsSnapshot};
pub use status::{ItemState, ItemStatus, ItemStatusRegistry};
