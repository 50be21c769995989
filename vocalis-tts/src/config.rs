//! Settings for the TTS configuration core

use crate::emotion::{validate_alpha, EmotionCatalog};
use crate::error::TtsConfigError;
use crate::meta::{builtin_engines, EngineMeta};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vocalis_core::config::env_var;

/// TTS configuration core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Region filled in for new cloud entries that do not name one
    pub default_region: String,

    /// Speed ratio for new entries (> 0, default 1.0)
    pub default_speed_ratio: f64,

    /// Emotion intensity used when an entry stores none (0.0-1.0, default 0.6)
    pub default_emo_alpha: f64,

    /// Mask secrets in snapshots handed to callers
    pub mask_secrets: bool,

    /// Log level for `vocalis_core::init_tracing`
    pub log_level: String,

    /// Seed provider metadata, replaced when a backend is synced
    pub engines: Vec<EngineMeta>,

    /// Seed emotion categories, replaced when a backend is synced
    pub emotions: EmotionCatalog,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            default_region: "ap-guangzhou".to_string(),
            default_speed_ratio: 1.0,
            default_emo_alpha: 0.6,
            mask_secrets: true,
            log_level: "info".to_string(),
            engines: builtin_engines(),
            emotions: EmotionCatalog::default(),
        }
    }
}

impl TtsSettings {
    /// Load settings from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TtsConfigError> {
        let settings: TtsSettings = vocalis_core::load_file(path)?;
        settings.validate().map_err(TtsConfigError::Config)?;
        Ok(settings)
    }

    /// Load settings from a JSON, TOML or YAML string
    pub fn from_str(content: &str) -> Result<Self, TtsConfigError> {
        let settings: TtsSettings = vocalis_core::load_str(content)?;
        settings.validate().map_err(TtsConfigError::Config)?;
        Ok(settings)
    }

    /// Defaults overlaid with `VOCALIS_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay `VOCALIS_*` environment variables. Malformed values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(region) = env_var::<String>("VOCALIS_TTS_REGION") {
            self.default_region = region;
        }
        if let Some(ratio) = env_var::<f64>("VOCALIS_TTS_SPEED_RATIO") {
            self.default_speed_ratio = ratio;
        }
        if let Some(alpha) = env_var::<f64>("VOCALIS_TTS_EMO_ALPHA") {
            self.default_emo_alpha = alpha;
        }
        if let Some(mask) = env_var::<bool>("VOCALIS_TTS_MASK_SECRETS") {
            self.mask_secrets = mask;
        }
        if let Some(level) = env_var::<String>("VOCALIS_LOG_LEVEL") {
            self.log_level = level;
        }
        self
    }

    /// Install the tracing subscriber at `log_level`
    pub fn init_logging(&self) -> bool {
        vocalis_core::init_tracing(&self.log_level)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if !(self.default_speed_ratio.is_finite() && self.default_speed_ratio > 0.0) {
            return Err("default_speed_ratio must be greater than 0".to_string());
        }

        validate_alpha(self.default_emo_alpha)
            .map_err(|_| "default_emo_alpha must be between 0.0 and 1.0".to_string())?;

        if self.default_region.trim().is_empty() {
            return Err("default_region cannot be empty".to_string());
        }

        if self.log_level.trim().is_empty() {
            return Err("log_level cannot be empty".to_string());
        }

        for (i, meta) in self.engines.iter().enumerate() {
            if meta.provider.trim().is_empty() {
                return Err(format!("engines[{}] has an empty provider", i));
            }
            if self.engines[..i].iter().any(|m| m.provider == meta.provider) {
                return Err(format!("engine '{}' listed twice", meta.provider));
            }
        }

        Ok(())
    }
}
