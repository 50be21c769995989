//! Validation of candidate configurations before they are committed
//!
//! Checks run in a fixed order and stop at the first violation:
//! provider immutability, required fields, reserved extension keys,
//! emotion settings, speed ratio.

use crate::emotion::{EmotionCatalog, EmotionPolicy};
use crate::error::Violation;
use crate::meta::{EngineCatalog, EngineMeta};
use crate::model::{ConfigPatch, EngineConfig};
use tracing::debug;

/// Validates new entries and patches against provider metadata
pub struct ConfigValidator<'a> {
    engines: &'a EngineCatalog,
    emotions: &'a EmotionCatalog,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(engines: &'a EngineCatalog, emotions: &'a EmotionCatalog) -> Self {
        Self { engines, emotions }
    }

    /// Validate `patch` against `current`, returning the merged entry to persist.
    pub fn validate_patch(
        &self,
        current: &EngineConfig,
        patch: &ConfigPatch,
    ) -> Result<EngineConfig, Violation> {
        if let Some(requested) = &patch.provider {
            if requested.trim() != current.provider {
                return Err(Violation::ProviderImmutable {
                    current: current.provider.clone(),
                    requested: requested.clone(),
                });
            }
        }

        let meta = self.engines.get(&current.provider);
        let mut merged = current.merged(patch);

        self.check_required(meta, &merged)?;

        if let Some(extra) = &patch.extra_params {
            if let Some(key) = extra.reserved_key() {
                return Err(Violation::ReservedField { key: key.to_string() });
            }
            if let Some(meta) = meta {
                for key in extra.extensions.keys().filter(|k| !meta.declares(k)) {
                    debug!("Passing undeclared key '{}' through for provider '{}'", key, meta.provider);
                }
            }
        }

        if patch.touches_emotion() {
            self.check_emotion_support(meta, &current.provider)?;
            let emotion_patch = patch
                .extra_params
                .as_ref()
                .map(|extra| extra.emotion.clone())
                .unwrap_or_default();
            merged.extra_params.emotion =
                EmotionPolicy::new(self.emotions).apply(&current.extra_params.emotion, &emotion_patch)?;
        }

        check_speed_ratio(merged.speed_ratio)?;

        Ok(merged)
    }

    /// Validate a complete entry about to be added.
    ///
    /// Entering `manual` without a category is normalised the same way a
    /// mode-change patch would be.
    pub fn validate_new(&self, config: &EngineConfig) -> Result<EngineConfig, Violation> {
        if config.provider.trim().is_empty() {
            return Err(Violation::missing("provider"));
        }

        let meta = self.engines.get(&config.provider);
        let mut candidate = config.clone();
        candidate.provider = config.provider.trim().to_string();

        self.check_required(meta, &candidate)?;

        if let Some(key) = candidate.extra_params.reserved_key() {
            return Err(Violation::ReservedField { key: key.to_string() });
        }

        if !candidate.extra_params.emotion.is_empty() {
            self.check_emotion_support(meta, &candidate.provider)?;
            let policy = EmotionPolicy::new(self.emotions);
            candidate.extra_params.emotion =
                policy.apply(&Default::default(), &config.extra_params.emotion)?;
        }

        check_speed_ratio(candidate.speed_ratio)?;

        Ok(candidate)
    }

    fn check_required(&self, meta: Option<&EngineMeta>, config: &EngineConfig) -> Result<(), Violation> {
        let meta = match meta {
            Some(meta) => meta,
            None => {
                debug!("No metadata for provider '{}', skipping required-field check", config.provider);
                return Ok(());
            }
        };

        match meta.required_fields.iter().find(|f| !config.has_field(f)) {
            Some(field) => Err(Violation::missing(field.clone())),
            None => Ok(()),
        }
    }

    fn check_emotion_support(&self, meta: Option<&EngineMeta>, provider: &str) -> Result<(), Violation> {
        match meta {
            Some(meta) if !meta.supports_emotion => Err(Violation::emotion(format!(
                "provider '{}' does not support emotion control",
                provider
            ))),
            _ => Ok(()),
        }
    }
}

fn check_speed_ratio(speed_ratio: f64) -> Result<(), Violation> {
    if speed_ratio.is_finite() && speed_ratio > 0.0 {
        Ok(())
    } else {
        Err(Violation::out_of_range("speed_ratio", speed_ratio, "> 0"))
    }
}
