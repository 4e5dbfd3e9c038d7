//! Forced alignment of generated audio against its source text.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use super::errors::{CollaboratorError, CollaboratorResult};
use crate::utils::srt;

#[async_trait]
pub trait AlignmentService: Send + Sync {
    /// Word-level SRT for `audio_path`, aligned to `reference_text` when given
    async fn transcribe_with_alignment(
        &self,
        audio_path: &Path,
        language: &str,
        reference_text: Option<&str>,
    ) -> CollaboratorResult<String>;

    fn is_available(&self) -> bool;
}

/// Stand-in when no alignment model is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAlignmentService;

#[async_trait]
impl AlignmentService for UnavailableAlignmentService {
    async fn transcribe_with_alignment(
        &self,
        _audio_path: &Path,
        _language: &str,
        _reference_text: Option<&str>,
    ) -> CollaboratorResult<String> {
        Err(CollaboratorError::unavailable(
            "alignment",
            "no alignment model configured",
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Produces word-level subtitles from the reference text at a fixed speaking
/// rate, without inspecting the audio
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedAlignmentService;

#[async_trait]
impl AlignmentService for EstimatedAlignmentService {
    async fn transcribe_with_alignment(
        &self,
        audio_path: &Path,
        language: &str,
        reference_text: Option<&str>,
    ) -> CollaboratorResult<String> {
        if !tokio::fs::try_exists(audio_path).await.unwrap_or(false) {
            return Err(CollaboratorError::failed(
                "alignment",
                format!("audio file not found: {}", audio_path.display()),
            ));
        }

        let subtitles = reference_text.map(srt::generate_word_srt).unwrap_or_default();
        debug!(
            path = %audio_path.display(),
            language = %language,
            cues = srt::count_cues(&subtitles),
            "Estimated alignment produced"
        );
        Ok(subtitles)
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unavailable_service() {
        let service = UnavailableAlignmentService;
        assert!(!service.is_available());
        let result = service
            .transcribe_with_alignment(Path::new("/nope.wav"), "en", None)
            .await;
        assert!(matches!(result, Err(CollaboratorError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_estimated_alignment() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("a.wav");
        std::fs::write(&audio, b"audio").unwrap();

        let service = EstimatedAlignmentService;
        let subtitles = service
            .transcribe_with_alignment(&audio, "en", Some("hello brave world"))
            .await
            .unwrap();
        assert_eq!(srt::count_cues(&subtitles), 3);

        let empty = service.transcribe_with_alignment(&audio, "en", None).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_estimated_alignment_missing_audio() {
        let result = EstimatedAlignmentService
            .transcribe_with_alignment(Path::new("/definitely/missing.wav"), "en", Some("hi"))
            .await;
        assert!(matches!(result, Err(CollaboratorError::Failed { .. })));
    }
}
