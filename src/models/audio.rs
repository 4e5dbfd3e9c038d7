//! Generated audio artifacts and per-word synthesis outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Audio produced by the synthesis strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAudio {
    pub audio_id: String,
    pub speech_id: String,
    pub path: PathBuf,
    pub file_size: u64,
    pub was_chunked: bool,
    pub chunks_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Outcome of synthesizing and uploading one word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordOutcome {
    pub index: usize,
    pub word: String,
    pub audio_id: Option<String>,
    pub uploaded: bool,
    pub file_url: Option<String>,
    pub error: Option<String>,
}

/// Aggregate result of the word-split strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordSplitSummary {
    pub words_processed: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub words: Vec<WordOutcome>,
}

impl WordSplitSummary {
    pub fn record(&mut self, outcome: WordOutcome) {
        self.words_processed += 1;
        if outcome.error.is_some() {
            self.failed += 1;
        } else if outcome.uploaded {
            self.uploaded += 1;
        }
        self.words.push(outcome);
    }
}
