//! # Broker Messages
//!
//! Inbound event envelope as delivered by the broker, and its conversion into the
//! queue payload shape `{id, type, data, timestamp, retryCount}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::BrokerResult;
use crate::constants::event_types;
use crate::models::Payload;

/// An event delivered by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerMessage {
    #[serde(default = "generate_message_id")]
    pub id: String,

    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,

    #[serde(default)]
    pub data: Value,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Payload,
}

fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_event_type() -> String {
    event_types::SPEECH_CREATED.to_string()
}

impl BrokerMessage {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: generate_message_id(),
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
            retry_count: 0,
            metadata: Payload::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Decode a message body as received from the wire
    pub fn from_slice(body: &[u8]) -> BrokerResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// `data.speechDto.user_uuid`, if present
    pub fn user_uuid(&self) -> Option<&str> {
        self.data
            .get("speechDto")
            .and_then(|dto| dto.get("user_uuid"))
            .and_then(|v| v.as_str())
    }

    /// Queue payload for this message
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("id".to_string(), Value::String(self.id.clone()));
        payload.insert("type".to_string(), Value::String(self.event_type.clone()));
        payload.insert("data".to_string(), self.data.clone());
        payload.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339()),
        );
        payload.insert("retryCount".to_string(), Value::from(self.retry_count));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_fills_defaults() {
        let message = BrokerMessage::from_slice(br#"{"data": {"speechId": "s1"}}"#).unwrap();

        assert!(!message.id.is_empty());
        assert_eq!(message.event_type, "speech.created");
        assert_eq!(message.retry_count, 0);
    }

    #[test]
    fn test_decode_reads_wire_names() {
        let message = BrokerMessage::from_slice(
            br#"{"id": "m-1", "type": "tts.requested", "retryCount": 2, "data": {}}"#,
        )
        .unwrap();

        assert_eq!(message.id, "m-1");
        assert_eq!(message.event_type, "tts.requested");
        assert_eq!(message.retry_count, 2);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(BrokerMessage::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_payload_shape() {
        let message = BrokerMessage::new(
            "speech.created",
            json!({"speechDto": {"user_uuid": "abc-PREMIUM"}}),
        )
        .with_id("m-9");
        let payload = message.to_payload();

        assert_eq!(payload["id"], "m-9");
        assert_eq!(payload["type"], "speech.created");
        assert_eq!(payload["retryCount"], 0);
        assert!(payload["timestamp"].is_string());
        assert_eq!(message.user_uuid(), Some("abc-PREMIUM"));
    }
}
