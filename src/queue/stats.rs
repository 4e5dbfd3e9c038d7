use serde::{Deserialize, Serialize};

use super::priority::MessagePriority;

/// Queued item counts per priority bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: MessagePriority) -> usize {
        match priority {
            MessagePriority::Critical => self.critical,
            MessagePriority::High => self.high,
            MessagePriority::Normal => self.normal,
            MessagePriority::Low => self.low,
        }
    }

    pub(crate) fn set(&mut self, priority: MessagePriority, count: usize) {
        match priority {
            MessagePriority::Critical => self.critical = count,
            MessagePriority::High => self.high = count,
            MessagePriority::Normal => self.normal = count,
            MessagePriority::Low => self.low = count,
        }
    }
}

/// Point-in-time view of the processing queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub current_size: usize,
    /// `None` when the queue is unbounded
    pub max_size: Option<usize>,
    pub is_empty: bool,
    pub is_full: bool,
    pub is_closed: bool,
    pub total_enqueued: u64,
    pub total_processed: u64,
    pub total_failed: u64,
    pub messages_by_priority: PriorityCounts,
    /// Mean time the currently queued items have been waiting
    pub avg_wait_time_seconds: f64,
}
