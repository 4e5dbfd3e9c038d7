//! Speech request extracted from an inbound `speech.created` payload.

use serde::{Deserialize, Serialize};

use super::{speech_dto, Payload};
use crate::constants::defaults;

/// A request to synthesize one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub speech_id: String,
    pub user_id: String,
    pub name: String,
    pub language: String,
    pub text: String,
    pub character: Option<String>,
    pub speed: Option<f64>,
}

impl SpeechRequest {
    /// Build a request from `data.speechId` and `data.speechDto`.
    ///
    /// Returns `None` when the speech id or the text is missing or empty.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        let dto = speech_dto(payload)?;
        let speech_id = payload
            .get("data")
            .and_then(|data| data.get("speechId"))
            .and_then(json_to_id)?;
        let text = dto.get("original_text").and_then(|v| v.as_str())?;

        if speech_id.is_empty() || text.is_empty() {
            return None;
        }

        let user_id = dto
            .get("user_uuid")
            .or_else(|| dto.get("userId"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Some(Self {
            speech_id,
            user_id,
            name: string_field(dto, "name").unwrap_or_default(),
            language: string_field(dto, "language")
                .unwrap_or_else(|| defaults::DEFAULT_LANGUAGE.to_string()),
            text: text.to_string(),
            character: string_field(dto, "character").filter(|c| !c.is_empty()),
            speed: dto.get("speed").and_then(|v| v.as_f64()),
        })
    }

    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Summary of validated text, recorded by the validation strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub length: usize,
    pub word_count: usize,
    pub language: String,
}

impl TextStats {
    pub fn from_text(text: &str, language: &str) -> Self {
        Self {
            length: text.chars().count(),
            word_count: text.split_whitespace().count(),
            language: language.to_string(),
        }
    }
}

fn string_field(dto: &Payload, key: &str) -> Option<String> {
    dto.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

// Speech ids arrive either as strings or as numbers
fn json_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
