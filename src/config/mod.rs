//! # Speechflow Configuration System
//!
//! Layered configuration: built-in defaults, `config/speechflow.toml`,
//! `config/speechflow.{environment}.toml`, then `SPEECHFLOW__SECTION__KEY`
//! environment variables. Every section is optional and falls back to defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use speechflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let processors = manager.config().worker.concurrent_processors;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechflowConfig {
    pub logging: LoggingConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub orchestrator: OrchestratorConfig,
    pub validation: ValidationConfig,
    pub synthesis: SynthesisConfig,
    pub voices: VoiceConfig,
    pub transcription: TranscriptionConfig,
    pub post_processing: PostProcessingConfig,
    pub word_processing: WordProcessingConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; when unset the environment default applies
    pub level: Option<String>,
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            json: false,
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued items; 0 means unbounded
    pub max_size: usize,
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::MAX_QUEUE_SIZE,
            max_retries: defaults::MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrent_processors: usize,
    pub idle_poll_interval_ms: u64,
    pub drain_timeout_seconds: u64,
    pub drain_poll_interval_ms: u64,
    /// Interval of the periodic statistics log line; 0 disables the monitor
    pub stats_interval_seconds: u64,
    /// Case-insensitive substring of `speechDto.user_uuid` marking high-value requests
    pub high_value_marker: String,
    /// Terminal item statuses kept for status queries
    pub status_retention: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrent_processors: defaults::CONCURRENT_PROCESSORS,
            idle_poll_interval_ms: defaults::IDLE_POLL_INTERVAL_MS,
            drain_timeout_seconds: defaults::DRAIN_TIMEOUT_SECONDS,
            drain_poll_interval_ms: defaults::DRAIN_POLL_INTERVAL_MS,
            stats_interval_seconds: defaults::STATS_INTERVAL_SECONDS,
            high_value_marker: defaults::HIGH_VALUE_MARKER.to_string(),
            status_retention: defaults::STATUS_RETENTION,
        }
    }
}

impl WorkerConfig {
    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_seconds > 0).then(|| Duration::from_secs(self.stats_interval_seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on strategy executions per item, guarding against jump cycles
    pub max_strategy_executions: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_strategy_executions: defaults::MAX_STRATEGY_EXECUTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_text_length: usize,
    pub max_text_length: usize,
    pub supported_languages: Vec<String>,
    pub default_language: String,
    pub forbidden_patterns: Vec<String>,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_text_length: defaults::MIN_TEXT_LENGTH,
            max_text_length: defaults::MAX_TEXT_LENGTH,
            supported_languages: defaults::SUPPORTED_LANGUAGES
                .iter()
                .map(|l| l.to_string())
                .collect(),
            default_language: defaults::DEFAULT_LANGUAGE.to_string(),
            forbidden_patterns: defaults::FORBIDDEN_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            min_speed: defaults::MIN_SPEED,
            max_speed: defaults::MAX_SPEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Texts longer than this many characters are chunked
    pub max_chunk_length: usize,
    /// Timeout for a single generation; chunked generation gets this per chunk
    pub generation_timeout_seconds: u64,
    pub output_directory: PathBuf,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: defaults::MAX_CHUNK_LENGTH,
            generation_timeout_seconds: defaults::GENERATION_TIMEOUT_SECONDS,
            output_directory: PathBuf::from(defaults::OUTPUT_DIRECTORY),
        }
    }
}

impl SynthesisConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub reference_directory: PathBuf,
    pub default_character: String,
    /// Character name to reference clip file name, relative to `reference_directory`
    pub characters: HashMap<String, String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        let mut characters = HashMap::new();
        characters.insert(
            defaults::DEFAULT_CHARACTER.to_string(),
            format!("{}.wav", defaults::DEFAULT_CHARACTER),
        );
        Self {
            reference_directory: PathBuf::from(defaults::VOICE_REFERENCE_DIRECTORY),
            default_character: defaults::DEFAULT_CHARACTER.to_string(),
            characters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub enabled: bool,
    pub timeout_seconds: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: defaults::TRANSCRIPTION_TIMEOUT_SECONDS,
        }
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessingConfig {
    pub analytics_enabled: bool,
    pub notifications_enabled: bool,
    pub cleanup_temp_files: bool,
    pub webhook_url: Option<String>,
    pub webhook_timeout_seconds: u64,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            analytics_enabled: true,
            notifications_enabled: true,
            cleanup_temp_files: false,
            webhook_url: None,
            webhook_timeout_seconds: defaults::WEBHOOK_TIMEOUT_SECONDS,
        }
    }
}

impl PostProcessingConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordProcessingConfig {
    pub enabled: bool,
    pub word_timeout_seconds: u64,
    /// Prompt synthesized for each word; `{word}` is replaced by the word
    pub prompt_template: String,
}

impl Default for WordProcessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            word_timeout_seconds: defaults::WORD_TIMEOUT_SECONDS,
            prompt_template: defaults::WORD_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl WordProcessingConfig {
    pub fn word_timeout(&self) -> Duration {
        Duration::from_secs(self.word_timeout_seconds)
    }

    pub fn prompt_for(&self, word: &str) -> String {
        self.prompt_template.replace("{word}", word)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    /// Prefix of the file URLs handed back by the development uploader
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub metadata_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_directory: PathBuf::from(defaults::METADATA_DIRECTORY),
        }
    }
}

impl SpeechflowConfig {
    /// Validate cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker.concurrent_processors == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker.concurrent_processors",
                self.worker.concurrent_processors,
                "at least one processing task is required",
            ));
        }

        if self.worker.idle_poll_interval_ms == 0 || self.worker.drain_poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker.idle_poll_interval_ms",
                self.worker.idle_poll_interval_ms,
                "poll intervals must be positive",
            ));
        }

        if self.orchestrator.max_strategy_executions == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.max_strategy_executions",
                0,
                "must allow at least one execution",
            ));
        }

        let validation = &self.validation;
        if validation.min_text_length > validation.max_text_length {
            return Err(ConfigurationError::invalid_value(
                "validation.min_text_length",
                validation.min_text_length,
                format!("must not exceed max_text_length ({})", validation.max_text_length),
            ));
        }

        if validation.min_speed > validation.max_speed {
            return Err(ConfigurationError::invalid_value(
                "validation.min_speed",
                validation.min_speed,
                format!("must not exceed max_speed ({})", validation.max_speed),
            ));
        }

        if !validation
            .supported_languages
            .iter()
            .any(|l| l == &validation.default_language)
        {
            return Err(ConfigurationError::invalid_value(
                "validation.default_language",
                &validation.default_language,
                "must be one of supported_languages",
            ));
        }

        for pattern in &validation.forbidden_patterns {
            if let Err(e) = Regex::new(pattern) {
                return Err(ConfigurationError::invalid_value(
                    "validation.forbidden_patterns",
                    pattern,
                    e.to_string(),
                ));
            }
        }

        if self.synthesis.max_chunk_length == 0 {
            return Err(ConfigurationError::invalid_value(
                "synthesis.max_chunk_length",
                0,
                "must be positive",
            ));
        }

        for (field, seconds) in [
            ("synthesis.generation_timeout_seconds", self.synthesis.generation_timeout_seconds),
            ("transcription.timeout_seconds", self.transcription.timeout_seconds),
            ("word_processing.word_timeout_seconds", self.word_processing.word_timeout_seconds),
        ] {
            if seconds == 0 {
                return Err(ConfigurationError::invalid_value(field, 0, "timeouts must be positive"));
            }
        }

        if self.voices.default_character.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "default_character",
                "voices",
            ));
        }

        if !self.word_processing.prompt_template.contains("{word}") {
            return Err(ConfigurationError::invalid_value(
                "word_processing.prompt_template",
                &self.word_processing.prompt_template,
                "must contain the {word} placeholder",
            ));
        }

        if let Some(url) = &self.post_processing.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigurationError::invalid_value(
                    "post_processing.webhook_url",
                    url,
                    "must be an http(s) URL",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SpeechflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.max_size, 1000);
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.worker.concurrent_processors, 3);
        assert!(!config.upload.enabled);
        assert!(config.transcription.enabled);
    }

    #[test]
    fn test_zero_processors_rejected() {
        let mut config = SpeechflowConfig::default();
        config.worker.concurrent_processors = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. }) if field == "worker.concurrent_processors"
        ));
    }

    #[test]
    fn test_bad_forbidden_pattern_rejected() {
        let mut config = SpeechflowConfig::default();
        config.validation.forbidden_patterns.push("(unclosed".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_url_must_be_http() {
        let mut config = SpeechflowConfig::default();
        config.post_processing.webhook_url = Some("ftp://example.com/hook".to_string());
        assert!(config.validate().is_err());

        config.post_processing.webhook_url = Some("https://example.com/hook".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_word_prompt() {
        let config = WordProcessingConfig::default();
        assert_eq!(config.prompt_for("casa"), "  The word is: \"casa\" ");
    }

    #[test]
    fn test_stats_interval_zero_disables_monitor() {
        let config = WorkerConfig {
            stats_interval_seconds: 0,
            ..WorkerConfig::default()
        };
        assert!(config.stats_interval().is_none());
    }
}
