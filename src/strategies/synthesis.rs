//! # Synthesis Strategy
//!
//! Turns the request text into audio. Texts longer than the chunk budget are
//! split and synthesized in one chunked call whose timeout scales with the
//! number of chunks. A timeout leaves the chain running and reports an error
//! carrying the `timeout` marker; any other collaborator failure stops the chain.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::SynthesisConfig;
use crate::constants::{strategy_names, strategy_orders};
use crate::models::{original_text, payload_id, GeneratedAudio, Payload, SpeechRequest};
use crate::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};
use crate::services::{
    CollaboratorError, MetadataStore, SpeechSynthesizer, SynthesizedAudio, VoiceReferenceService,
};
use crate::utils::{srt, TextChunker};

pub struct SynthesisStrategy {
    config: SynthesisConfig,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    chunker: Arc<dyn TextChunker>,
    metadata: Arc<dyn MetadataStore>,
    voices: Arc<dyn VoiceReferenceService>,
}

impl std::fmt::Debug for SynthesisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisStrategy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SynthesisStrategy {
    pub fn new(
        config: SynthesisConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        chunker: Arc<dyn TextChunker>,
        metadata: Arc<dyn MetadataStore>,
        voices: Arc<dyn VoiceReferenceService>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            chunker,
            metadata,
            voices,
        }
    }

    async fn synthesize(
        &self,
        speech: &SpeechRequest,
        voice: Option<&std::path::Path>,
    ) -> Result<(SynthesizedAudio, Option<usize>), StrategyError> {
        if speech.text_length() <= self.config.max_chunk_length {
            let timeout = self.config.generation_timeout();
            let audio = with_timeout(
                "Audio generation",
                timeout,
                self.synthesizer.generate(&speech.text, &speech.language, voice),
            )
            .await?;
            return Ok((audio, None));
        }

        let chunks = self.chunker.split(&speech.text, self.config.max_chunk_length);
        let timeout = self.config.generation_timeout() * chunks.len().max(1) as u32;
        info!(
            speech_id = %speech.speech_id,
            chunks = chunks.len(),
            timeout_secs = timeout.as_secs(),
            "Text exceeds chunk budget, generating in chunks"
        );
        let audio = with_timeout(
            "Chunked audio generation",
            timeout,
            self.synthesizer
                .generate_chunked(&chunks, &speech.language, voice),
        )
        .await?;
        Ok((audio, Some(chunks.len())))
    }
}

async fn with_timeout<T>(
    operation: &str,
    timeout: Duration,
    call: impl std::future::Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, StrategyError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(StrategyError::from),
        Err(_) => Err(StrategyError::timeout(operation, timeout)),
    }
}

#[async_trait]
impl Strategy for SynthesisStrategy {
    fn name(&self) -> &str {
        strategy_names::SYNTHESIS
    }

    fn order(&self) -> i32 {
        strategy_orders::SYNTHESIS
    }

    async fn can_handle(&self, payload: &Payload) -> bool {
        original_text(payload).is_some_and(|text| !text.is_empty())
    }

    async fn execute(
        &self,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        let Some(speech) = SpeechRequest::from_payload(payload) else {
            return Ok(StrategyResult::failure("Invalid speech data")
                .with_data("message", "Invalid speech data"));
        };

        let voice = speech
            .character
            .as_deref()
            .and_then(|character| self.voices.voice_path(Some(character)));
        if let Some(path) = &voice {
            info!(character = ?speech.character, voice = %path.display(), "Using character voice");
        }

        info!(
            item_id = %context.item_id,
            speech_id = %speech.speech_id,
            language = %speech.language,
            text_length = speech.text_length(),
            "🎙️ Generating speech audio"
        );

        context.speech = Some(speech.clone());
        context.voice_reference = voice.clone();

        let (audio, chunked) = match self.synthesize(&speech, voice.as_deref()).await {
            Ok(generated) => generated,
            Err(error @ StrategyError::Timeout { .. }) => {
                error!(speech_id = %speech.speech_id, error = %error, "Audio generation timed out");
                context.audio_generated = false;
                return Ok(StrategyResult::failure(error.to_string())
                    .with_data("message", "Audio generation timed out"));
            }
            Err(error) => {
                error!(speech_id = %speech.speech_id, error = %error, "Audio generation failed");
                context.audio_generated = false;
                return Ok(StrategyResult::failure(error.to_string())
                    .with_data("message", "Processing failed")
                    .stop());
            }
        };

        let file_size = self.metadata.get_size(&audio.path).await;
        let generated = GeneratedAudio {
            audio_id: audio.audio_id.clone(),
            speech_id: speech.speech_id.clone(),
            path: audio.path.clone(),
            file_size,
            was_chunked: chunked.is_some(),
            chunks_count: chunked.unwrap_or(1),
            created_at: Utc::now(),
        };

        let metadata = json!({
            "audio_id": generated.audio_id,
            "speech_id": speech.speech_id,
            "speech_name": speech.name,
            "user_id": speech.user_id,
            "language": speech.language,
            "text_length": speech.text_length(),
            "was_chunked": generated.was_chunked,
            "chunks_count": generated.chunks_count,
            "file_size": file_size,
            "created_at": generated.created_at.to_rfc3339(),
            "message_id": payload_id(payload),
        });
        if let Value::Object(metadata) = metadata {
            self.metadata
                .save_metadata(&generated.audio_id, &metadata)
                .await?;
        }

        let subtitles = srt::generate_srt_from_text(&speech.text);
        info!(
            audio_id = %generated.audio_id,
            file_size = file_size,
            cues = srt::count_cues(&subtitles),
            "✅ Audio generated"
        );

        let result = StrategyResult::success()
            .with_data("audio_id", generated.audio_id.clone())
            .with_data("file_path", generated.path.display().to_string())
            .with_data("file_size", file_size)
            .with_data("was_chunked", generated.was_chunked)
            .with_data("chunks_count", generated.chunks_count);

        context.basic_subtitles = Some(subtitles);
        context.audio = Some(generated);
        context.audio_generated = true;
        context.uploaded = false;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;
    use crate::services::{InMemoryMetadataStore, LocalVoiceReferenceService, MockSpeechSynthesizer};
    use crate::utils::SimpleTextChunker;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        synthesizer: Arc<MockSpeechSynthesizer>,
        metadata: Arc<InMemoryMetadataStore>,
        strategy: SynthesisStrategy,
    }

    fn fixture(config: SynthesisConfig, latency: Duration) -> Fixture {
        let dir = TempDir::new().unwrap();
        let synthesizer =
            Arc::new(MockSpeechSynthesizer::new(dir.path().join("audio")).with_latency(latency));
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let voices = Arc::new(LocalVoiceReferenceService::from_config(&VoiceConfig::default()));
        let strategy = SynthesisStrategy::new(
            config,
            synthesizer.clone(),
            Arc::new(SimpleTextChunker::new()),
            metadata.clone(),
            voices,
        );
        Fixture {
            _dir: dir,
            synthesizer,
            metadata,
            strategy,
        }
    }

    fn payload(text: &str) -> Payload {
        json!({
            "id": "msg-1",
            "type": "speech.created",
            "data": {"speechId": 42, "speechDto": {"original_text": text, "name": "Intro"}}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn test_generates_audio_and_metadata() {
        let fx = fixture(SynthesisConfig::default(), Duration::ZERO);
        let mut context = SharedContext::new("msg-1");

        let result = fx.strategy.execute(&payload("Hello world."), &mut context).await.unwrap();

        assert!(result.success);
        assert!(context.audio_generated);
        let audio = context.audio.as_ref().unwrap();
        assert_eq!(audio.speech_id, "42");
        assert!(!audio.was_chunked);
        assert!(audio.file_size > 0);
        assert!(context.basic_subtitles.as_ref().unwrap().contains("Hello world."));

        let stored = fx.metadata.read_metadata(&audio.audio_id).await.unwrap().unwrap();
        assert_eq!(stored["message_id"], "msg-1");
        assert_eq!(stored["speech_name"], "Intro");
    }

    #[tokio::test]
    async fn test_long_text_is_chunked() {
        let config = SynthesisConfig {
            max_chunk_length: 20,
            ..SynthesisConfig::default()
        };
        let fx = fixture(config, Duration::ZERO);
        let mut context = SharedContext::new("msg-1");
        let text = "First sentence here. Second sentence there. Third one.";

        fx.strategy.execute(&payload(text), &mut context).await.unwrap();

        let audio = context.audio.unwrap();
        assert!(audio.was_chunked);
        assert_eq!(audio.chunks_count, 3);
        assert_eq!(fx.synthesizer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_speech_id_is_invalid() {
        let fx = fixture(SynthesisConfig::default(), Duration::ZERO);
        let mut context = SharedContext::new("msg-1");
        let payload = json!({"id": "m", "data": {"speechDto": {"original_text": "hi"}}})
            .as_object()
            .cloned()
            .unwrap();

        let result = fx.strategy.execute(&payload, &mut context).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Invalid speech data"));
        assert_eq!(fx.synthesizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_timeout_keeps_chain_running() {
        let config = SynthesisConfig {
            generation_timeout_seconds: 1,
            ..SynthesisConfig::default()
        };
        let fx = fixture(config, Duration::from_secs(5));
        let mut context = SharedContext::new("msg-1");

        let result = fx.strategy.execute(&payload("slow"), &mut context).await.unwrap();

        assert!(!result.success);
        assert!(result.should_continue);
        assert!(result.error.unwrap().contains("timeout"));
        assert!(!context.audio_generated);
    }

    #[tokio::test]
    async fn test_can_handle_requires_text() {
        let fx = fixture(SynthesisConfig::default(), Duration::ZERO);
        assert!(fx.strategy.can_handle(&payload("text")).await);
        assert!(!fx.strategy.can_handle(&payload("")).await);
    }
}
