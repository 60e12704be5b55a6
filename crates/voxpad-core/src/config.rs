use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VoxpadError};
use crate::types::{DictationMode, LanguageModel};

/// Top-level configuration for the Voxpad application.
///
/// Loaded from `~/.voxpad/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxpadConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dictation: DictationConfig,
}

impl Default for VoxpadConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            dictation: DictationConfig::default(),
        }
    }
}

impl VoxpadConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VoxpadConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VoxpadError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.voxpad/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Dictation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictationConfig {
    /// BCP 47 locale tag passed to the recognizer for each attempt.
    pub locale: String,
    /// Language-model hint passed to the recognizer.
    pub language_model: LanguageModel,
    /// How finalized utterances are routed.
    pub mode: DictationMode,
    /// Title given to notes created by auto-commit dictation.
    pub note_title: String,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            language_model: LanguageModel::FreeForm,
            mode: DictationMode::AutoCommit,
            note_title: "Dictated Note".to_string(),
        }
    }
}
