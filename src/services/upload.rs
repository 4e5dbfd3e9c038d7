//! # Audio Upload
//!
//! Pushes finished audio (and its subtitles) to remote storage. An uploader
//! returning `Ok(None)` means the server declined the file; strategies treat
//! that as "not uploaded" rather than as an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{CollaboratorError, CollaboratorResult};
use crate::models::Payload;

/// Everything an uploader needs to publish one artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub speech_id: String,
    /// `main` for the full rendition, `word` for single-word clips
    pub audio_type: String,
    pub metadata: Option<Payload>,
    pub original_text: Option<String>,
    pub language: Option<String>,
    pub subtitles: Option<String>,
}

impl UploadRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        speech_id: impl Into<String>,
        audio_type: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            speech_id: speech_id.into(),
            audio_type: audio_type.into(),
            metadata: None,
            original_text: None,
            language: None,
            subtitles: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Payload) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>, language: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self.language = Some(language.into());
        self
    }

    pub fn with_subtitles(mut self, subtitles: impl Into<String>) -> Self {
        self.subtitles = Some(subtitles.into());
        self
    }
}

/// Server acknowledgement for an uploaded artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub uuid: String,
    pub file_url: String,
    pub file_path: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[async_trait]
pub trait AudioUploader: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> CollaboratorResult<Option<UploadReceipt>>;

    fn is_enabled(&self) -> bool;
}

/// Uploader used when no remote storage is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploader;

#[async_trait]
impl AudioUploader for DisabledUploader {
    async fn upload(&self, request: UploadRequest) -> CollaboratorResult<Option<UploadReceipt>> {
        debug!(speech_id = %request.speech_id, "Upload skipped, uploader disabled");
        Ok(None)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Records uploads in memory and hands back synthetic URLs
#[derive(Debug)]
pub struct InMemoryUploader {
    base_url: String,
    uploads: Mutex<Vec<UploadRequest>>,
    fail_with: Mutex<Option<CollaboratorError>>,
}

impl InMemoryUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            uploads: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        }
    }

    /// Make every following upload fail with `error`
    pub fn fail_with(&self, error: CollaboratorError) {
        *self.fail_with.lock() = Some(error);
    }

    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl AudioUploader for InMemoryUploader {
    async fn upload(&self, request: UploadRequest) -> CollaboratorResult<Option<UploadReceipt>> {
        let failure = self.fail_with.lock().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let uuid = Uuid::new_v4().to_string();
        let file_name = request
            .file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{uuid}.wav"));
        let server_path = format!("{}/{}/{}", request.audio_type, request.speech_id, file_name);

        let receipt = UploadReceipt {
            file_url: format!("{}/{}", self.base_url, server_path),
            file_path: Some(server_path),
            uuid,
            uploaded_at: Utc::now(),
        };

        info!(
            speech_id = %request.speech_id,
            audio_type = %request.audio_type,
            file_url = %receipt.file_url,
            "📤 Audio uploaded"
        );
        self.uploads.lock().push(request);
        Ok(Some(receipt))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
