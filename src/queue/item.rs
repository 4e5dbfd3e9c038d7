use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::priority::MessagePriority;
use crate::models::{payload_id, Payload};

/// One unit of work waiting in, or taken from, the processing queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedItem {
    /// Payload `id` when present, otherwise a generated UUID
    pub id: String,
    pub payload: Payload,
    pub priority: MessagePriority,
    /// Refreshed on every requeue
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl QueuedItem {
    pub fn new(payload: Payload, priority: MessagePriority, max_retries: u32) -> Self {
        let id = payload_id(&payload)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            id,
            payload,
            priority,
            enqueued_at: Utc::now(),
            retry_count: 0,
            max_retries,
        }
    }

    /// Count one more attempt; false once the retry budget is exhausted
    pub fn increment_retry(&mut self) -> bool {
        self.retry_count += 1;
        self.retry_count <= self.max_retries
    }

    /// Time spent waiting since the item was last enqueued
    pub fn wait_time(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.enqueued_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_taken_from_payload() {
        let payload = json!({"id": "abc"}).as_object().cloned().unwrap();
        let item = QueuedItem::new(payload, MessagePriority::Normal, 3);
        assert_eq!(item.id, "abc");
        assert_eq!(item.retry_count, 0);
    }

    #[test]
    fn test_id_generated_when_missing() {
        let item = QueuedItem::new(Payload::new(), MessagePriority::Low, 3);
        assert!(Uuid::parse_str(&item.id).is_ok());
    }

    #[test]
    fn test_increment_retry_budget() {
        let mut item = QueuedItem::new(Payload::new(), MessagePriority::Normal, 2);
        assert!(item.increment_retry());
        assert!(item.increment_retry());
        assert!(!item.increment_retry());
        assert_eq!(item.retry_count, 3);
    }
}
