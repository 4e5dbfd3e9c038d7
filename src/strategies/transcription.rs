//! # Transcription Strategy
//!
//! Replaces the estimated sentence subtitles with word-aligned ones produced
//! from the generated audio. Alignment is best effort: every failure is
//! recorded on the result but reported as success, so it never fails an item.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TranscriptionConfig;
use crate::constants::{defaults, event_types, strategy_names, strategy_orders};
use crate::models::{event_type, Payload};
use crate::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};
use crate::services::AlignmentService;
use crate::utils::srt;

pub struct TranscriptionStrategy {
    config: TranscriptionConfig,
    alignment: Arc<dyn AlignmentService>,
}

impl std::fmt::Debug for TranscriptionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionStrategy")
            .field("config", &self.config)
            .field("alignment_available", &self.alignment.is_available())
            .finish()
    }
}

impl TranscriptionStrategy {
    pub fn new(config: TranscriptionConfig, alignment: Arc<dyn AlignmentService>) -> Self {
        Self { config, alignment }
    }
}

#[async_trait]
impl Strategy for TranscriptionStrategy {
    fn name(&self) -> &str {
        strategy_names::TRANSCRIPTION
    }

    fn order(&self) -> i32 {
        strategy_orders::TRANSCRIPTION
    }

    async fn can_handle(&self, payload: &Payload) -> bool {
        self.config.enabled
            && self.alignment.is_available()
            && event_type(payload)
                .is_some_and(|kind| event_types::ALIGNABLE.iter().any(|alignable| *alignable == kind))
    }

    async fn execute(
        &self,
        _payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        let Some(audio) = context.audio.as_ref() else {
            return Ok(StrategyResult::skipped("No audio to transcribe"));
        };
        let language = context
            .speech
            .as_ref()
            .map(|speech| speech.language.clone())
            .unwrap_or_else(|| defaults::DEFAULT_LANGUAGE.to_string());
        let reference_text = context.speech.as_ref().map(|speech| speech.text.clone());
        let path = audio.path.clone();

        info!(
            item_id = %context.item_id,
            audio = %path.display(),
            language = %language,
            "🎧 Aligning subtitles to generated audio"
        );

        let timeout = self.config.timeout();
        let aligned = tokio::time::timeout(
            timeout,
            self.alignment
                .transcribe_with_alignment(&path, &language, reference_text.as_deref()),
        )
        .await;

        let subtitles = match aligned {
            Ok(Ok(subtitles)) => subtitles,
            Ok(Err(error)) => {
                warn!(item_id = %context.item_id, error = %error, "Alignment failed, keeping basic subtitles");
                return Ok(StrategyResult::success()
                    .with_data("message", format!("Transcription error: {error}"))
                    .with_data("error", true)
                    .with_error(error.to_string()));
            }
            Err(_) => {
                let error = StrategyError::timeout("Transcription", timeout);
                warn!(item_id = %context.item_id, error = %error, "Alignment timed out, keeping basic subtitles");
                return Ok(StrategyResult::success()
                    .with_data("message", format!("Transcription error: {error}"))
                    .with_data("error", true)
                    .with_error(error.to_string()));
            }
        };

        if subtitles.trim().is_empty() {
            warn!(item_id = %context.item_id, "Alignment returned no subtitles");
            return Ok(StrategyResult::skipped("Transcription returned empty content"));
        }

        let subtitle_count = srt::count_cues(&subtitles);
        info!(item_id = %context.item_id, subtitles = subtitle_count, "✅ Transcription completed");

        context.aligned_subtitles = Some(subtitles);
        context.transcription_completed = true;
        Ok(StrategyResult::success()
            .with_data("message", "Transcription completed successfully")
            .with_data("subtitle_count", subtitle_count)
            .with_data("language", language)
            .with_data("has_original_text", reference_text.is_some()))
    }
}
