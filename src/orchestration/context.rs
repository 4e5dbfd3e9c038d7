//! Per-item mutable state shared by the strategies of one chain run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::models::{GeneratedAudio, Payload, SpeechRequest, TextStats, WordSplitSummary};
use crate::services::UploadReceipt;

/// Created fresh for every item and never shared across items.
///
/// Well-known keys are typed fields; anything else goes into `extras`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedContext {
    pub item_id: String,

    pub validation_passed: bool,
    pub text_stats: Option<TextStats>,

    pub speech: Option<SpeechRequest>,
    pub voice_reference: Option<PathBuf>,
    pub audio: Option<GeneratedAudio>,
    pub audio_generated: bool,
    /// Subtitles derived from the source text
    pub basic_subtitles: Option<String>,

    /// Word-aligned subtitles from the alignment service
    pub aligned_subtitles: Option<String>,
    pub transcription_completed: bool,

    pub uploaded: bool,
    pub upload: Option<UploadReceipt>,

    pub word_split: Option<WordSplitSummary>,

    /// Most recent error recorded by any strategy
    pub last_error: Option<String>,

    pub extras: Payload,
}

impl SharedContext {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Self::default()
        }
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}
