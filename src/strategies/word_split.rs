//! # Word-Split Strategy
//!
//! After the main rendition is published, synthesizes every word of the text
//! on its own and uploads each clip as a `word` artifact. Words are processed
//! one at a time. A failing word is recorded in the summary and the strategy
//! moves on to the next one.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WordProcessingConfig;
use crate::constants::{audio_types, strategy_names, strategy_orders};
use crate::models::{payload_id, Payload, SpeechRequest, WordOutcome, WordSplitSummary};
use crate::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};
use crate::services::{AudioUploader, MetadataStore, SpeechSynthesizer, UploadRequest};

pub struct WordSplitStrategy {
    config: WordProcessingConfig,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    uploader: Arc<dyn AudioUploader>,
    metadata: Arc<dyn MetadataStore>,
    totals: Mutex<WordTotals>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordTotals {
    pub processed: u64,
    pub uploaded: u64,
    pub failed: u64,
}

impl std::fmt::Debug for WordSplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordSplitStrategy")
            .field("config", &self.config)
            .field("totals", &*self.totals.lock())
            .finish_non_exhaustive()
    }
}

struct WordJob<'a> {
    index: usize,
    word: &'a str,
    speech: &'a SpeechRequest,
    voice: Option<&'a Path>,
    message_id: Option<&'a str>,
}

impl WordSplitStrategy {
    pub fn new(
        config: WordProcessingConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        uploader: Arc<dyn AudioUploader>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            uploader,
            metadata,
            totals: Mutex::new(WordTotals::default()),
        }
    }

    pub fn totals(&self) -> WordTotals {
        *self.totals.lock()
    }

    async fn process_word(&self, job: WordJob<'_>) -> WordOutcome {
        let mut outcome = WordOutcome {
            index: job.index,
            word: job.word.to_string(),
            audio_id: None,
            uploaded: false,
            file_url: None,
            error: None,
        };

        let timeout = self.config.word_timeout();
        let prompt = self.config.prompt_for(job.word);
        let generated = tokio::time::timeout(
            timeout,
            self.synthesizer
                .generate(&prompt, &job.speech.language, job.voice),
        )
        .await;
        let artifact = match generated {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(e)) => {
                outcome.error = Some(format!("Generation error: {e}"));
                return outcome;
            }
            Err(_) => {
                outcome.error = Some("Generation timeout".to_string());
                return outcome;
            }
        };

        let word_audio_id = Uuid::new_v4().to_string();
        let path = match rename_artifact(&artifact.path, &word_audio_id).await {
            Ok(path) => path,
            Err(e) => {
                outcome.error = Some(format!("Generation error: {e}"));
                return outcome;
            }
        };
        outcome.audio_id = Some(word_audio_id.clone());
        let file_size = self.metadata.get_size(&path).await;

        let mut upload_metadata = Payload::new();
        upload_metadata.insert("word_index".into(), json!(job.index));
        upload_metadata.insert("word_text".into(), json!(job.word));
        upload_metadata.insert("parent_message_id".into(), json!(job.message_id));
        let request = UploadRequest::new(&path, &job.speech.speech_id, audio_types::WORD)
            .with_metadata(upload_metadata)
            .with_text(job.word, &job.speech.language);

        let mut receipt = None;
        match self.uploader.upload(request).await {
            Ok(Some(uploaded)) => {
                outcome.uploaded = true;
                outcome.file_url = Some(uploaded.file_url.clone());
                receipt = Some(uploaded);
            }
            Ok(None) => outcome.error = Some("Upload failed".to_string()),
            Err(e) => outcome.error = Some(format!("Upload error: {e}")),
        }

        let record = json!({
            "word_index": job.index,
            "word_text": job.word,
            "parent_speech_id": job.speech.speech_id,
            "parent_message_id": job.message_id,
            "file_path": path.display().to_string(),
            "file_size": file_size,
            "uploaded": outcome.uploaded,
            "upload_result": receipt,
            "created_at": Utc::now().to_rfc3339(),
        });
        if let Some(record) = record.as_object() {
            if let Err(e) = self.metadata.save_metadata(&word_audio_id, record).await {
                warn!(word_index = job.index, error = %e, "Failed to save word metadata");
            }
        }
        outcome
    }
}

// Keep the synthesizer's extension, replace the stem with the word's own id
async fn rename_artifact(path: &Path, audio_id: &str) -> std::io::Result<PathBuf> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".to_string());
    let target = path.with_file_name(format!("{audio_id}.{extension}"));
    tokio::fs::rename(path, &target).await?;
    Ok(target)
}

#[async_trait]
impl Strategy for WordSplitStrategy {
    fn name(&self) -> &str {
        strategy_names::WORD_SPLIT
    }

    fn order(&self) -> i32 {
        strategy_orders::WORD_SPLIT
    }

    async fn can_handle(&self, _payload: &Payload) -> bool {
        self.config.enabled
    }

    async fn execute(
        &self,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        if !context.audio_generated {
            return Ok(StrategyResult::skipped("Skipped - no main audio generated"));
        }
        if !self.uploader.is_enabled() {
            return Ok(StrategyResult::skipped("Skipped - uploader not enabled"));
        }
        let Some(speech) = context.speech.clone().filter(|s| !s.text.is_empty()) else {
            return Ok(StrategyResult::skipped("Skipped - no speech text"));
        };

        let words: Vec<&str> = speech.text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(StrategyResult::skipped("No words to process"));
        }

        info!(
            item_id = %context.item_id,
            words = words.len(),
            "🔤 Starting word-by-word synthesis"
        );

        let voice = context.voice_reference.clone();
        let message_id = payload_id(payload);
        let mut summary = WordSplitSummary::default();
        for (index, word) in words.iter().enumerate() {
            let outcome = self
                .process_word(WordJob {
                    index,
                    word,
                    speech: &speech,
                    voice: voice.as_deref(),
                    message_id,
                })
                .await;
            match &outcome.error {
                Some(error) => warn!(
                    word_index = index,
                    total = words.len(),
                    error = %error,
                    "Word failed"
                ),
                None => debug!(word_index = index, total = words.len(), "Word processed"),
            }
            summary.record(outcome);
        }

        let totals = {
            let mut totals = self.totals.lock();
            totals.processed += summary.words_processed as u64;
            totals.uploaded += summary.uploaded as u64;
            totals.failed += summary.failed as u64;
            *totals
        };

        info!(
            item_id = %context.item_id,
            processed = summary.words_processed,
            uploaded = summary.uploaded,
            failed = summary.failed,
            "✅ Word processing completed"
        );

        let result = StrategyResult::success()
            .with_data("message", "Word processing completed")
            .with_data(
                "results",
                serde_json::to_value(&summary)
                    .map_err(|e| StrategyError::internal(e.to_string()))?,
            )
            .with_data(
                "stats",
                json!({
                    "total_words_processed": totals.processed,
                    "total_words_uploaded": totals.uploaded,
                    "total_words_failed": totals.failed,
                }),
            );
        context.word_split = Some(summary);
        Ok(result)
    }
}
