//! # Item Status Registry
//!
//! Tracks where each item is in its lifecycle:
//!
//! ```text
//! Queued -> Processing -> Completed
//!                      -> Failed
//!                      -> Retrying -> Processing -> ...
//! ```
//!
//! Terminal entries are kept up to the configured retention, oldest evicted
//! first. Live entries are never evicted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::queue::MessagePriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Queued,
    Processing,
    Retrying,
    Completed,
    Failed,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Completed | ItemState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Queued => "queued",
            ItemState::Processing => "processing",
            ItemState::Retrying => "retrying",
            ItemState::Completed => "completed",
            ItemState::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub item_id: String,
    pub state: ItemState,
    pub priority: MessagePriority,
    pub retry_count: u32,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct ItemStatusRegistry {
    entries: DashMap<String, ItemStatus>,
    terminal_order: Mutex<VecDeque<String>>,
    retention: usize,
}

impl ItemStatusRegistry {
    /// `retention` is the number of terminal entries kept; 0 keeps none
    pub fn new(retention: usize) -> Self {
        Self {
            entries: DashMap::new(),
            terminal_order: Mutex::new(VecDeque::new()),
            retention,
        }
    }

    pub fn record(
        &self,
        item_id: &str,
        state: ItemState,
        priority: MessagePriority,
        retry_count: u32,
        last_error: Option<String>,
    ) {
        let status = ItemStatus {
            item_id: item_id.to_string(),
            state,
            priority,
            retry_count,
            updated_at: Utc::now(),
            last_error,
        };
        self.entries.insert(item_id.to_string(), status);

        if state.is_terminal() {
            self.retire(item_id);
        }
    }

    pub fn get(&self, item_id: &str) -> Option<ItemStatus> {
        self.entries.get(item_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_in(&self, state: ItemState) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().state == state)
            .count()
    }

    fn retire(&self, item_id: &str) {
        let mut order = self.terminal_order.lock();
        order.push_back(item_id.to_string());

        while order.len() > self.retention {
            let Some(evicted) = order.pop_front() else {
                break;
            };
            // The id may have been reused by a newer, still live item
            self.entries
                .remove_if(&evicted, |_, status| status.state.is_terminal());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_is_tracked() {
        let registry = ItemStatusRegistry::new(10);
        registry.record("a", ItemState::Queued, MessagePriority::Normal, 0, None);
        registry.record("a", ItemState::Processing, MessagePriority::Normal, 0, None);
        registry.record(
            "a",
            ItemState::Retrying,
            MessagePriority::Normal,
            1,
            Some("connection reset".into()),
        );

        let status = registry.get("a").unwrap();
        assert_eq!(status.state, ItemState::Retrying);
        assert_eq!(status.retry_count, 1);
        assert_eq!(status.last_error.as_deref(), Some("connection reset"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_terminal_entries_are_evicted_oldest_first() {
        let registry = ItemStatusRegistry::new(2);
        registry.record("live", ItemState::Processing, MessagePriority::High, 0, None);
        for id in ["one", "two", "three"] {
            registry.record(id, ItemState::Completed, MessagePriority::Normal, 0, None);
        }

        assert!(registry.get("one").is_none());
        assert!(registry.get("two").is_some());
        assert!(registry.get("three").is_some());
        assert!(registry.get("live").is_some());
        assert_eq!(registry.count_in(ItemState::Completed), 2);
    }

    #[test]
    fn test_zero_retention_drops_terminal_entries() {
        let registry = ItemStatusRegistry::new(0);
        registry.record("a", ItemState::Failed, MessagePriority::Low, 3, None);
        assert!(registry.is_empty());
    }
}
