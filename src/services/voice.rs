//! Voice reference clips used to condition synthesis on a named character.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::VoiceConfig;

pub trait VoiceReferenceService: Send + Sync {
    /// Reference clip for `character`, or for the default character when the
    /// requested one is unknown or its file is missing
    fn voice_path(&self, character: Option<&str>) -> Option<PathBuf>;

    fn default_character(&self) -> &str;

    fn available_characters(&self) -> Vec<String>;
}

/// Resolves characters to files under a reference directory
#[derive(Debug, Clone)]
pub struct LocalVoiceReferenceService {
    reference_directory: PathBuf,
    default_character: String,
    characters: HashMap<String, String>,
}

impl LocalVoiceReferenceService {
    pub fn new(
        reference_directory: impl Into<PathBuf>,
        default_character: impl Into<String>,
        characters: HashMap<String, String>,
    ) -> Self {
        Self {
            reference_directory: reference_directory.into(),
            default_character: default_character.into().to_lowercase(),
            characters: characters
                .into_iter()
                .map(|(name, file)| (name.to_lowercase(), file))
                .collect(),
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            &config.reference_directory,
            &config.default_character,
            config.characters.clone(),
        )
    }

    fn existing_path(&self, character: &str) -> Option<PathBuf> {
        let file = self.characters.get(character)?;
        let path = self.reference_directory.join(file);
        if path.exists() {
            Some(path)
        } else {
            warn!(character = %character, path = %path.display(), "Voice file not found");
            None
        }
    }
}

impl VoiceReferenceService for LocalVoiceReferenceService {
    fn voice_path(&self, character: Option<&str>) -> Option<PathBuf> {
        let requested = character
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.default_character.clone());

        if let Some(path) = self.existing_path(&requested) {
            debug!(character = %requested, path = %path.display(), "Voice reference resolved");
            return Some(path);
        }

        if requested != self.default_character {
            debug!(
                requested = %requested,
                fallback = %self.default_character,
                "Falling back to default voice"
            );
            return self.existing_path(&self.default_character);
        }
        None
    }

    fn default_character(&self) -> &str {
        &self.default_character
    }

    fn available_characters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.characters.keys().cloned().collect();
        names.sort();
        names
    }
}
