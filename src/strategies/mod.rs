//! # Built-in Strategies
//!
//! The speech pipeline as an ordered chain:
//!
//! ```text
//! validation(10) -> synthesis(100) -> transcription(150) -> post_processing(200) -> word_split(250)
//! ```
//!
//! [`default_chain`] wires all five from configuration and a [`Collaborators`]
//! bundle. [`Collaborators::local`] builds the development set: file-writing
//! mock synthesizer, estimated alignment, local metadata files and an
//! in-memory uploader when uploads are enabled.

pub mod post_processing;
pub mod synthesis;
pub mod transcription;
pub mod validation;
pub mod word_split;

pub use post_processing::{PostProcessingStats, PostProcessingStrategy};
pub use synthesis::SynthesisStrategy;
pub use transcription::TranscriptionStrategy;
pub use validation::ValidationStrategy;
pub use word_split::{WordSplitStrategy, WordTotals};

use std::sync::Arc;
use tracing::info;

use crate::config::SpeechflowConfig;
use crate::error::Result;
use crate::orchestration::{Strategy, StrategyOrchestrator};
use crate::services::{
    AlignmentService, AudioUploader, CollaboratorResult, DisabledUploader,
    EstimatedAlignmentService, HttpWebhookNotifier, InMemoryUploader, LocalFileStorage,
    LocalVoiceReferenceService, MetadataStore, MockSpeechSynthesizer, SpeechSynthesizer,
    UnavailableAlignmentService, VoiceReferenceService, WebhookNotifier,
};
use crate::utils::{SimpleTextChunker, TextChunker};

const LOCAL_UPLOAD_BASE_URL: &str = "http://localhost/files";

/// External services the built-in strategies depend on
#[derive(Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub alignment: Arc<dyn AlignmentService>,
    pub uploader: Arc<dyn AudioUploader>,
    pub metadata: Arc<dyn MetadataStore>,
    pub voices: Arc<dyn VoiceReferenceService>,
    pub chunker: Arc<dyn TextChunker>,
    pub webhook: Option<Arc<dyn WebhookNotifier>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("alignment_available", &self.alignment.is_available())
            .field("upload_enabled", &self.uploader.is_enabled())
            .field("webhook", &self.webhook.is_some())
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Development collaborators that only touch the local filesystem
    pub fn local(config: &SpeechflowConfig) -> CollaboratorResult<Self> {
        let alignment: Arc<dyn AlignmentService> = if config.transcription.enabled {
            Arc::new(EstimatedAlignmentService)
        } else {
            Arc::new(UnavailableAlignmentService)
        };

        let uploader: Arc<dyn AudioUploader> = if config.upload.enabled {
            Arc::new(InMemoryUploader::new(
                config
                    .upload
                    .base_url
                    .as_deref()
                    .unwrap_or(LOCAL_UPLOAD_BASE_URL),
            ))
        } else {
            Arc::new(DisabledUploader)
        };

        let webhook: Option<Arc<dyn WebhookNotifier>> = match &config.post_processing.webhook_url {
            Some(_) => {
                let notifier = HttpWebhookNotifier::new(config.post_processing.webhook_timeout())?;
                Some(Arc::new(notifier) as Arc<dyn WebhookNotifier>)
            }
            None => None,
        };

        Ok(Self {
            synthesizer: Arc::new(MockSpeechSynthesizer::new(
                &config.synthesis.output_directory,
            )),
            alignment,
            uploader,
            metadata: Arc::new(LocalFileStorage::new(&config.storage.metadata_directory)),
            voices: Arc::new(LocalVoiceReferenceService::from_config(&config.voices)),
            chunker: Arc::new(SimpleTextChunker::new()),
            webhook,
        })
    }
}

/// The five built-in strategies, unsorted
pub fn default_strategies(
    config: &SpeechflowConfig,
    collaborators: &Collaborators,
) -> Result<Vec<Arc<dyn Strategy>>> {
    let validation = ValidationStrategy::new(config.validation.clone())?;

    let strategies: Vec<Arc<dyn Strategy>> = vec![
        Arc::new(validation),
        Arc::new(SynthesisStrategy::new(
            config.synthesis.clone(),
            collaborators.synthesizer.clone(),
            collaborators.chunker.clone(),
            collaborators.metadata.clone(),
            collaborators.voices.clone(),
        )),
        Arc::new(TranscriptionStrategy::new(
            config.transcription.clone(),
            collaborators.alignment.clone(),
        )),
        Arc::new(PostProcessingStrategy::new(
            config.post_processing.clone(),
            collaborators.uploader.clone(),
            collaborators.metadata.clone(),
            collaborators.synthesizer.clone(),
            collaborators.webhook.clone(),
        )),
        Arc::new(WordSplitStrategy::new(
            config.word_processing.clone(),
            collaborators.synthesizer.clone(),
            collaborators.uploader.clone(),
            collaborators.metadata.clone(),
        )),
    ];
    Ok(strategies)
}

/// Build and validate the standard speech chain
pub fn default_chain(
    config: &SpeechflowConfig,
    collaborators: &Collaborators,
) -> Result<StrategyOrchestrator> {
    let strategies = default_strategies(config, collaborators)?;
    let orchestrator = StrategyOrchestrator::from_config(strategies, &config.orchestrator)?;
    info!(
        strategies = orchestrator.len(),
        collaborators = ?collaborators,
        "🧩 Default speech chain assembled"
    );
    Ok(orchestrator)
}
