//! # System Constants
//!
//! Strategy identifiers, event types, retry markers and operational defaults
//! shared by the queue, the orchestrator and the worker.

/// Registered names of the built-in strategies
pub mod strategy_names {
    pub const VALIDATION: &str = "validation";
    pub const SYNTHESIS: &str = "synthesis";
    pub const TRANSCRIPTION: &str = "transcription";
    pub const POST_PROCESSING: &str = "post_processing";
    pub const WORD_SPLIT: &str = "word_split";
}

/// Sort keys of the built-in strategies (ascending = earlier in the chain)
pub mod strategy_orders {
    pub const VALIDATION: i32 = 10;
    pub const SYNTHESIS: i32 = 100;
    pub const TRANSCRIPTION: i32 = 150;
    pub const POST_PROCESSING: i32 = 200;
    pub const WORD_SPLIT: i32 = 250;
}

/// Inbound event types
pub mod event_types {
    pub const SPEECH_CREATED: &str = "speech.created";
    pub const TTS_REQUESTED: &str = "tts.requested";
    pub const AUDIO_GENERATE: &str = "audio.generate";

    /// Event types eligible for forced alignment
    pub const ALIGNABLE: [&str; 3] = [SPEECH_CREATED, TTS_REQUESTED, AUDIO_GENERATE];
}

/// Substrings used to classify recorded strategy errors (matched case-insensitively)
pub mod retry_markers {
    /// Any of these makes the failure worth another attempt
    pub const TRANSIENT: [&str; 4] = ["timeout", "connection", "temporary", "unavailable"];

    /// Any of these makes the failure permanent, regardless of transient markers
    pub const TERMINAL: [&str; 2] = ["validation", "invalid"];
}

/// Upload artifact types
pub mod audio_types {
    pub const MAIN: &str = "main";
    pub const WORD: &str = "word";
}

/// Operational defaults, overridable through configuration
pub mod defaults {
    pub const MAX_QUEUE_SIZE: usize = 1000;
    pub const MAX_RETRIES: u32 = 3;

    pub const CONCURRENT_PROCESSORS: usize = 3;
    pub const IDLE_POLL_INTERVAL_MS: u64 = 100;
    pub const DRAIN_TIMEOUT_SECONDS: u64 = 30;
    pub const DRAIN_POLL_INTERVAL_MS: u64 = 500;
    pub const STATS_INTERVAL_SECONDS: u64 = 30;
    pub const STATUS_RETENTION: usize = 10_000;
    pub const HIGH_VALUE_MARKER: &str = "premium";

    pub const MAX_STRATEGY_EXECUTIONS: usize = 256;

    pub const MIN_TEXT_LENGTH: usize = 1;
    pub const MAX_TEXT_LENGTH: usize = 10_000;
    pub const DEFAULT_LANGUAGE: &str = "en";
    pub const SUPPORTED_LANGUAGES: [&str; 9] = ["en", "es", "pt", "fr", "de", "it", "ja", "ko", "zh"];
    pub const FORBIDDEN_PATTERNS: [&str; 3] = [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?i)javascript:",
        r"(?i)data:text/html",
    ];
    pub const MIN_SPEED: f64 = 0.5;
    pub const MAX_SPEED: f64 = 2.0;

    pub const MAX_CHUNK_LENGTH: usize = 566;
    pub const GENERATION_TIMEOUT_SECONDS: u64 = 300;
    pub const TRANSCRIPTION_TIMEOUT_SECONDS: u64 = 300;
    pub const WORD_TIMEOUT_SECONDS: u64 = 300;
    pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
    pub const WORD_PROMPT_TEMPLATE: &str = "  The word is: \"{word}\" ";

    pub const DEFAULT_CHARACTER: &str = "belinda";
    pub const OUTPUT_DIRECTORY: &str = "output";
    pub const VOICE_REFERENCE_DIRECTORY: &str = "voices";
    pub const METADATA_DIRECTORY: &str = "output/metadata";
}

/// Subtitle timing parameters
pub mod subtitles {
    pub const WORDS_PER_SECOND: f64 = 2.5;
    pub const MIN_CUE_SECONDS: f64 = 1.0;
    pub const CUE_GAP_SECONDS: f64 = 0.5;
}
