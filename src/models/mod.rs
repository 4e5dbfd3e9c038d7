//! # Domain Models
//!
//! Plain data carried between the queue, the strategies and the collaborators.

pub mod audio;
pub mod speech;

pub use audio::{GeneratedAudio, WordOutcome, WordSplitSummary};
pub use speech::{SpeechRequest, TextStats};

/// Opaque JSON object carried by queued items and strategy results
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Borrow `data.speechDto` from a queued payload, if it is an object
pub fn speech_dto(payload: &Payload) -> Option<&Payload> {
    payload
        .get("data")
        .and_then(|data| data.get("speechDto"))
        .and_then(|dto| dto.as_object())
}

/// Borrow the original text of a queued payload
pub fn original_text(payload: &Payload) -> Option<&str> {
    speech_dto(payload)
        .and_then(|dto| dto.get("original_text"))
        .and_then(|text| text.as_str())
}

/// Event type of a queued payload
pub fn event_type(payload: &Payload) -> Option<&str> {
    payload.get("type").and_then(|value| value.as_str())
}

/// Item id of a queued payload
pub fn payload_id(payload: &Payload) -> Option<&str> {
    payload.get("id").and_then(|value| value.as_str())
}
