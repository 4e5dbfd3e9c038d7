//! # Post-Processing Strategy
//!
//! Publishes a generated rendition: uploads it with its aligned subtitles,
//! records analytics, prepares the user notification, fires the completion
//! webhook and optionally removes intermediate synthesis files.
//!
//! The main upload waits for aligned subtitles; without them the upload is
//! reported as `waiting_for_transcription` and nothing is sent.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::PostProcessingConfig;
use crate::constants::{audio_types, strategy_names, strategy_orders};
use crate::models::{payload_id, GeneratedAudio, Payload, SpeechRequest};
use crate::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};
use crate::services::{
    AudioUploader, MetadataStore, SpeechSynthesizer, UploadReceipt, UploadRequest, WebhookNotifier,
};

/// Lifetime counters across every item this strategy handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PostProcessingStats {
    pub total_processed: u64,
    pub total_uploaded: u64,
    pub total_bytes_processed: u64,
}

impl PostProcessingStats {
    fn to_value(self) -> Value {
        json!({
            "total_processed": self.total_processed,
            "total_uploaded": self.total_uploaded,
            "upload_rate": if self.total_processed > 0 {
                self.total_uploaded as f64 / self.total_processed as f64 * 100.0
            } else {
                0.0
            },
            "total_mb_processed": self.total_bytes_processed as f64 / (1024.0 * 1024.0),
        })
    }
}

pub struct PostProcessingStrategy {
    config: PostProcessingConfig,
    uploader: Arc<dyn AudioUploader>,
    metadata: Arc<dyn MetadataStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    webhook: Option<Arc<dyn WebhookNotifier>>,
    stats: Mutex<PostProcessingStats>,
}

impl std::fmt::Debug for PostProcessingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessingStrategy")
            .field("config", &self.config)
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}

impl PostProcessingStrategy {
    pub fn new(
        config: PostProcessingConfig,
        uploader: Arc<dyn AudioUploader>,
        metadata: Arc<dyn MetadataStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        webhook: Option<Arc<dyn WebhookNotifier>>,
    ) -> Self {
        Self {
            config,
            uploader,
            metadata,
            synthesizer,
            webhook,
            stats: Mutex::new(PostProcessingStats::default()),
        }
    }

    pub fn stats(&self) -> PostProcessingStats {
        *self.stats.lock()
    }

    async fn upload_main(
        &self,
        audio: &GeneratedAudio,
        speech: &SpeechRequest,
        context: &SharedContext,
        results: &mut Payload,
    ) -> Result<Option<UploadReceipt>, StrategyError> {
        let subtitles = match (&context.aligned_subtitles, context.transcription_completed) {
            (Some(subtitles), true) => subtitles.clone(),
            _ => {
                results.insert(
                    "upload".into(),
                    json!({"success": false, "reason": "waiting_for_transcription"}),
                );
                return Ok(None);
            }
        };

        let request = UploadRequest::new(&audio.path, &speech.speech_id, audio_types::MAIN)
            .with_text(&speech.text, &speech.language)
            .with_subtitles(subtitles);
        let Some(receipt) = self.uploader.upload(request).await? else {
            warn!(item_id = %context.item_id, "❌ Audio upload failed");
            results.insert(
                "upload".into(),
                json!({"success": false, "reason": "upload_failed"}),
            );
            return Ok(None);
        };

        info!(item_id = %context.item_id, file_url = %receipt.file_url, "📤 Main audio uploaded");
        results.insert(
            "upload".into(),
            json!({"success": true, "srt_type": "transcription"}),
        );
        self.record_upload(&audio.audio_id, &receipt).await;
        Ok(Some(receipt))
    }

    // Merge upload details into the stored metadata record; failures are logged only
    async fn record_upload(&self, audio_id: &str, receipt: &UploadReceipt) {
        let mut record = match self.metadata.read_metadata(audio_id).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                error!(audio_id = %audio_id, error = %e, "Failed to read metadata");
                return;
            }
        };
        record.insert(
            "upload_result".into(),
            json!({
                "uploaded": true,
                "upload_time": receipt.uploaded_at.to_rfc3339(),
                "server_uuid": receipt.uuid,
                "server_url": receipt.file_url,
                "server_path": receipt.file_path,
                "srt_type": "transcription",
            }),
        );
        if let Err(e) = self.metadata.save_metadata(audio_id, &record).await {
            error!(audio_id = %audio_id, error = %e, "Failed to update metadata");
        }
    }

    fn analytics(
        message_id: Option<&str>,
        audio: &GeneratedAudio,
        speech: Option<&SpeechRequest>,
        receipt: Option<&UploadReceipt>,
    ) -> Value {
        let data = json!({
            "message_id": message_id,
            "speech_id": speech.map(|s| s.speech_id.as_str()),
            "audio_id": audio.audio_id,
            "language": speech.map(|s| s.language.as_str()),
            "text_length": speech.map(SpeechRequest::text_length).unwrap_or(0),
            "file_size": audio.file_size,
            "was_chunked": audio.was_chunked,
            "chunks_count": audio.chunks_count,
            "uploaded": receipt.is_some(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        info!(analytics = %data, "📊 Processing analytics recorded");
        json!({"success": true, "data": data})
    }

    fn notification(
        message_id: Option<&str>,
        audio: &GeneratedAudio,
        speech: Option<&SpeechRequest>,
        receipt: Option<&UploadReceipt>,
    ) -> Value {
        let user_id = speech.map(|s| s.user_id.as_str());
        let notification = json!({
            "type": "audio_processing_completed",
            "message_id": message_id,
            "speech_id": speech.map(|s| s.speech_id.as_str()),
            "audio_id": audio.audio_id,
            "user_id": user_id,
            "status": if receipt.is_some() { "uploaded" } else { "generated" },
            "file_url": receipt.map(|r| r.file_url.as_str()),
            "timestamp": Utc::now().to_rfc3339(),
        });
        info!(
            user_id = ?user_id,
            audio_id = %audio.audio_id,
            "🔔 Notification prepared: audio is ready"
        );
        debug!(notification = %notification, "Notification payload");
        json!({"success": true, "notification_type": "audio_ready", "user_notified": user_id})
    }

    async fn send_webhook(
        &self,
        url: &str,
        notifier: &dyn WebhookNotifier,
        message_id: Option<&str>,
        audio: &GeneratedAudio,
        speech: Option<&SpeechRequest>,
        receipt: &UploadReceipt,
    ) -> Value {
        let payload = json!({
            "event": "audio_processing_completed",
            "message_id": message_id,
            "speech_id": speech.map(|s| s.speech_id.as_str()),
            "audio_id": audio.audio_id,
            "file_url": receipt.file_url,
            "file_size": audio.file_size,
            "language": speech.map(|s| s.language.as_str()),
            "processing_stats": {
                "was_chunked": audio.was_chunked,
                "chunks_count": audio.chunks_count,
                "text_length": speech.map(SpeechRequest::text_length).unwrap_or(0),
            },
            "timestamp": Utc::now().to_rfc3339(),
        });

        match notifier.notify(url, &payload).await {
            Ok(delivery) => json!({
                "success": true,
                "webhook_url": url,
                "status": delivery.status,
                "payload_size": delivery.payload_size,
            }),
            Err(e) => {
                error!(url = %url, error = %e, "Webhook delivery failed");
                json!({"success": false, "error": e.to_string()})
            }
        }
    }
}

#[async_trait]
impl Strategy for PostProcessingStrategy {
    fn name(&self) -> &str {
        strategy_names::POST_PROCESSING
    }

    fn order(&self) -> i32 {
        strategy_orders::POST_PROCESSING
    }

    async fn can_handle(&self, _payload: &Payload) -> bool {
        true
    }

    async fn execute(
        &self,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        let audio = match (&context.audio, context.audio_generated) {
            (Some(audio), true) => audio.clone(),
            _ => {
                debug!(item_id = %context.item_id, "No audio generated, skipping post-processing");
                return Ok(StrategyResult::skipped("Skipped - no audio generated"));
            }
        };
        let speech = context.speech.clone();
        let message_id = payload_id(payload);
        let mut results = Payload::new();

        let mut receipt = None;
        if self.uploader.is_enabled() {
            if let Some(speech) = &speech {
                receipt = self.upload_main(&audio, speech, context, &mut results).await?;
            }
        }
        if let Some(receipt) = &receipt {
            context.uploaded = true;
            context.upload = Some(receipt.clone());
        }

        if self.config.analytics_enabled {
            results.insert(
                "analytics".into(),
                Self::analytics(message_id, &audio, speech.as_ref(), receipt.as_ref()),
            );
        }

        if self.config.notifications_enabled {
            results.insert(
                "notifications".into(),
                Self::notification(message_id, &audio, speech.as_ref(), receipt.as_ref()),
            );
        }

        if let (Some(url), Some(notifier), Some(receipt)) =
            (&self.config.webhook_url, &self.webhook, &receipt)
        {
            let outcome = self
                .send_webhook(url, notifier.as_ref(), message_id, &audio, speech.as_ref(), receipt)
                .await;
            results.insert("webhook".into(), outcome);
        }

        if self.config.cleanup_temp_files {
            let cleanup = match self.synthesizer.cleanup_temp_files().await {
                Ok(removed) => json!({"success": true, "files_cleaned": removed}),
                Err(e) => {
                    error!(error = %e, "Temp file cleanup failed");
                    json!({"success": false, "error": e.to_string()})
                }
            };
            results.insert("cleanup".into(), cleanup);
        }

        let stats = {
            let mut stats = self.stats.lock();
            stats.total_processed += 1;
            stats.total_bytes_processed += audio.file_size;
            if receipt.is_some() {
                stats.total_uploaded += 1;
            }
            *stats
        };

        info!(
            item_id = %context.item_id,
            uploaded = context.uploaded,
            "✅ Post-processing completed"
        );
        Ok(StrategyResult::success()
            .with_data("message", "Post-processing completed")
            .with_data("results", results)
            .with_data("stats", stats.to_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        CollaboratorError, CollaboratorResult, DisabledUploader, InMemoryMetadataStore,
        InMemoryUploader, MockSpeechSynthesizer, WebhookDelivery,
    };
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingWebhook {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl WebhookNotifier for RecordingWebhook {
        async fn notify(&self, url: &str, payload: &Value) -> CollaboratorResult<WebhookDelivery> {
            self.calls.lock().push((url.to_string(), payload.clone()));
            Ok(WebhookDelivery {
                status: 200,
                payload_size: payload.to_string().len(),
            })
        }
    }

    fn payload() -> Payload {
        json!({"id": "msg-9", "type": "speech.created", "data": {}})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn generated_context(aligned: bool) -> SharedContext {
        let mut context = SharedContext::new("msg-9");
        context.audio = Some(GeneratedAudio {
            audio_id: "audio-1".into(),
            speech_id: "42".into(),
            path: PathBuf::from("/tmp/audio-1.wav"),
            file_size: 2048,
            was_chunked: false,
            chunks_count: 1,
            created_at: Utc::now(),
        });
        context.audio_generated = true;
        context.speech = Some(SpeechRequest {
            speech_id: "42".into(),
            user_id: "user-7".into(),
            name: "Intro".into(),
            language: "en".into(),
            text: "Hello world.".into(),
            character: None,
            speed: None,
        });
        if aligned {
            context.aligned_subtitles = Some("1\n00:00:00,000 --> 00:00:00,400\nHello\n".into());
            context.transcription_completed = true;
        }
        context
    }

    fn strategy(
        config: PostProcessingConfig,
        uploader: Arc<dyn AudioUploader>,
        metadata: Arc<InMemoryMetadataStore>,
        webhook: Option<Arc<dyn WebhookNotifier>>,
    ) -> PostProcessingStrategy {
        PostProcessingStrategy::new(
            config,
            uploader,
            metadata,
            Arc::new(MockSpeechSynthesizer::new(std::env::temp_dir())),
            webhook,
        )
    }

    #[tokio::test]
    async fn test_skips_without_audio() {
        let strategy = strategy(
            PostProcessingConfig::default(),
            Arc::new(DisabledUploader),
            Arc::new(InMemoryMetadataStore::new()),
            None,
        );
        let mut context = SharedContext::new("msg-9");
        let result = strategy.execute(&payload(), &mut context).await.unwrap();
        assert!(result.is_skipped());
        assert_eq!(strategy.stats().total_processed, 0);
    }

    #[tokio::test]
    async fn test_uploads_with_aligned_subtitles_and_fires_webhook() {
        let uploader = Arc::new(InMemoryUploader::new("https://files.test"));
        let metadata = Arc::new(InMemoryMetadataStore::new());
        metadata
            .save_metadata("audio-1", &json!({"audio_id": "audio-1"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let webhook = Arc::new(RecordingWebhook::default());
        let config = PostProcessingConfig {
            webhook_url: Some("https://hooks.test/done".into()),
            ..PostProcessingConfig::default()
        };
        let strategy = strategy(config, uploader.clone(), metadata.clone(), Some(webhook.clone()));
        let mut context = generated_context(true);

        let result = strategy.execute(&payload(), &mut context).await.unwrap();

        assert!(result.success);
        assert!(context.uploaded);
        assert_eq!(uploader.upload_count(), 1);
        assert_eq!(uploader.uploads()[0].audio_type, "main");
        assert_eq!(result.data["results"]["upload"]["srt_type"], "transcription");
        assert_eq!(result.data["results"]["notifications"]["user_notified"], "user-7");

        let stored = metadata.read_metadata("audio-1").await.unwrap().unwrap();
        assert_eq!(stored["upload_result"]["uploaded"], true);

        let calls = webhook.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://hooks.test/done");
        assert_eq!(calls[0].1["event"], "audio_processing_completed");
        assert_eq!(calls[0].1["processing_stats"]["text_length"], 12);
        assert_eq!(strategy.stats().total_uploaded, 1);
    }

    #[tokio::test]
    async fn test_upload_waits_for_transcription() {
        let uploader = Arc::new(InMemoryUploader::new("https://files.test"));
        let webhook = Arc::new(RecordingWebhook::default());
        let config = PostProcessingConfig {
            webhook_url: Some("https://hooks.test/done".into()),
            ..PostProcessingConfig::default()
        };
        let strategy = strategy(
            config,
            uploader.clone(),
            Arc::new(InMemoryMetadataStore::new()),
            Some(webhook.clone()),
        );
        let mut context = generated_context(false);

        let result = strategy.execute(&payload(), &mut context).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data["results"]["upload"]["reason"], "waiting_for_transcription");
        assert_eq!(uploader.upload_count(), 0);
        assert!(webhook.calls.lock().is_empty());
        assert!(!context.uploaded);
    }

    #[tokio::test]
    async fn test_upload_error_fails_without_stopping_chain() {
        let uploader = Arc::new(InMemoryUploader::new("https://files.test"));
        uploader.fail_with(CollaboratorError::failed("uploader", "disk full"));
        let strategy = strategy(
            PostProcessingConfig::default(),
            uploader,
            Arc::new(InMemoryMetadataStore::new()),
            None,
        );
        let mut context = generated_context(true);

        let error = strategy.execute(&payload(), &mut context).await.unwrap_err();
        assert!(error.to_string().contains("disk full"));
    }
}
