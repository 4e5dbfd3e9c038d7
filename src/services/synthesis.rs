//! # Speech Synthesis
//!
//! Interface to the text-to-speech engine plus a file-writing mock used by tests
//! and the development worker.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::CollaboratorResult;

/// Artifact produced by a synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub audio_id: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        language: &str,
        voice_reference: Option<&Path>,
    ) -> CollaboratorResult<SynthesizedAudio>;

    /// Synthesize each chunk and join them into a single artifact
    async fn generate_chunked(
        &self,
        chunks: &[String],
        language: &str,
        voice_reference: Option<&Path>,
    ) -> CollaboratorResult<SynthesizedAudio>;

    fn supported_languages(&self) -> Vec<String>;

    /// Remove intermediate files, returning how many were deleted
    async fn cleanup_temp_files(&self) -> CollaboratorResult<usize>;
}

/// Writes the requested text to `<output>/<uuid>.wav` instead of real audio
#[derive(Debug)]
pub struct MockSpeechSynthesizer {
    output_directory: PathBuf,
    latency: Duration,
    languages: Vec<String>,
    temp_files: Mutex<Vec<PathBuf>>,
    calls: AtomicUsize,
}

impl MockSpeechSynthesizer {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            latency: Duration::ZERO,
            languages: crate::constants::defaults::SUPPORTED_LANGUAGES
                .iter()
                .map(|l| l.to_string())
                .collect(),
            temp_files: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay every synthesis call, for exercising timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `generate` / `generate_chunked` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn write_artifact(&self, name: &str, body: &str) -> CollaboratorResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_directory).await?;
        let path = self.output_directory.join(name);
        tokio::fs::write(&path, body.as_bytes()).await?;
        Ok(path)
    }

    async fn simulate_work(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn generate(
        &self,
        text: &str,
        language: &str,
        voice_reference: Option<&Path>,
    ) -> CollaboratorResult<SynthesizedAudio> {
        self.simulate_work().await;
        let audio_id = Uuid::new_v4().to_string();
        let path = self
            .write_artifact(&format!("{audio_id}.wav"), text)
            .await?;

        debug!(
            audio_id = %audio_id,
            language = %language,
            voice = ?voice_reference,
            "Mock audio generated"
        );
        Ok(SynthesizedAudio { path, audio_id })
    }

    async fn generate_chunked(
        &self,
        chunks: &[String],
        language: &str,
        voice_reference: Option<&Path>,
    ) -> CollaboratorResult<SynthesizedAudio> {
        self.simulate_work().await;
        let audio_id = Uuid::new_v4().to_string();

        for (i, chunk) in chunks.iter().enumerate() {
            let chunk_path = self
                .write_artifact(&format!("{audio_id}_chunk{i}.wav"), chunk)
                .await?;
            self.temp_files.lock().push(chunk_path);
        }

        let path = self
            .write_artifact(&format!("{audio_id}.wav"), &chunks.join(" "))
            .await?;

        info!(
            audio_id = %audio_id,
            chunks = chunks.len(),
            language = %language,
            voice = ?voice_reference,
            "Mock chunked audio generated"
        );
        Ok(SynthesizedAudio { path, audio_id })
    }

    fn supported_languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    async fn cleanup_temp_files(&self) -> CollaboratorResult<usize> {
        let files: Vec<PathBuf> = std::mem::take(&mut *self.temp_files.lock());
        let mut removed = 0;
        for file in files {
            if tokio::fs::remove_file(&file).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
