//! # Queue Module
//!
//! In-process priority queue decoupling broker ingestion from item processing.

pub mod item;
pub mod priority;
pub mod processing_queue;
pub mod stats;

pub use item::QueuedItem;
pub use priority::MessagePriority;
pub use processing_queue::ProcessingQueue;
pub use stats::{PriorityCounts, QueueStats};
