//! Engine configurations, partial updates and the configuration collection

use crate::emotion::{EmotionMode, EmotionSettings};
use crate::error::Violation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder shown instead of a stored secret
pub const SECRET_MASK: &str = "***";

/// Top-level attribute names; extension keys may not reuse them
pub const RESERVED_KEYS: [&str; 9] = [
    "provider",
    "secret_id",
    "secret_key",
    "region",
    "description",
    "enabled",
    "active_voice_id",
    "speed_ratio",
    "extra_params",
];

/// Extra parameter names that have typed slots in [`ExtraParams`]
pub const TYPED_EXTRA_KEYS: [&str; 4] = ["emotion_mode", "default_emotion", "emo_alpha", "use_fp16"];

fn default_speed_ratio() -> f64 {
    1.0
}

/// Provider credentials
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl Credentials {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: Some(secret_id.into().trim().to_string()),
            secret_key: Some(secret_key.into().trim().to_string()),
        }
    }

    pub fn masked(&self) -> Self {
        Self {
            secret_id: mask(&self.secret_id),
            secret_key: mask(&self.secret_key),
        }
    }
}

fn mask(secret: &Option<String>) -> Option<String> {
    match secret {
        Some(s) if !s.is_empty() => Some(SECRET_MASK.to_string()),
        other => other.clone(),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = self.masked();
        f.debug_struct("Credentials")
            .field("secret_id", &masked.secret_id)
            .field("secret_key", &masked.secret_key)
            .finish()
    }
}

/// Provider-specific parameters.
///
/// Emotion settings and `use_fp16` are typed; any other key is kept verbatim
/// in `extensions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtraParams {
    #[serde(flatten)]
    pub emotion: EmotionSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_fp16: Option<bool>,

    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ExtraParams {
    pub fn is_empty(&self) -> bool {
        self.emotion.is_empty() && self.use_fp16.is_none() && self.extensions.is_empty()
    }

    /// Whether `key` holds a value
    pub fn contains(&self, key: &str) -> bool {
        match key {
            "emotion_mode" => self.emotion.emotion_mode.is_some(),
            "default_emotion" => self.emotion.default_emotion.is_some(),
            "emo_alpha" => self.emotion.emo_alpha.is_some(),
            "use_fp16" => self.use_fp16.is_some(),
            other => self
                .extensions
                .get(other)
                .map(|v| !v.is_null() && v.as_str().map_or(true, |s| !s.trim().is_empty()))
                .unwrap_or(false),
        }
    }

    /// Key-level merge. Typed slots are overwritten when the patch sets them;
    /// an extension set to `null` is removed.
    pub fn merge(&mut self, patch: &ExtraParams) {
        if patch.emotion.emotion_mode.is_some() {
            self.emotion.emotion_mode = patch.emotion.emotion_mode;
        }
        if patch.emotion.default_emotion.is_some() {
            self.emotion.default_emotion = patch.emotion.default_emotion.clone();
        }
        if patch.emotion.emo_alpha.is_some() {
            self.emotion.emo_alpha = patch.emotion.emo_alpha;
        }
        if patch.use_fp16.is_some() {
            self.use_fp16 = patch.use_fp16;
        }
        for (key, value) in &patch.extensions {
            if value.is_null() {
                self.extensions.remove(key);
            } else {
                self.extensions.insert(key.clone(), value.clone());
            }
        }
    }

    /// First extension key that collides with a reserved or typed name
    pub fn reserved_key(&self) -> Option<&str> {
        self.extensions
            .keys()
            .map(String::as_str)
            .find(|k| RESERVED_KEYS.contains(k) || TYPED_EXTRA_KEYS.contains(k))
    }
}

/// One configuration entry for a TTS provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub provider: String,

    #[serde(flatten)]
    pub credentials: Credentials,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_voice_id: Option<String>,

    #[serde(default = "default_speed_ratio")]
    pub speed_ratio: f64,

    #[serde(default, skip_serializing_if = "ExtraParams::is_empty")]
    pub extra_params: ExtraParams,
}

impl EngineConfig {
    /// A disabled entry for `provider` at normal speed
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            credentials: Credentials::default(),
            region: None,
            description: None,
            enabled: false,
            active_voice_id: None,
            speed_ratio: default_speed_ratio(),
            extra_params: ExtraParams::default(),
        }
    }

    pub fn with_credentials(mut self, secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.credentials = Credentials::new(secret_id, secret_key);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.active_voice_id = Some(voice_id.into());
        self
    }

    pub fn with_speed_ratio(mut self, speed_ratio: f64) -> Self {
        self.speed_ratio = speed_ratio;
        self
    }

    pub fn with_emotion_mode(mut self, mode: EmotionMode) -> Self {
        self.extra_params.emotion.emotion_mode = Some(mode);
        self
    }

    pub fn with_default_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.extra_params.emotion.default_emotion = Some(emotion.into());
        self
    }

    pub fn with_emo_alpha(mut self, alpha: f64) -> Self {
        self.extra_params.emotion.emo_alpha = Some(alpha);
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_params.extensions.insert(key.into(), value);
        self
    }

    pub fn emotion(&self) -> &EmotionSettings {
        &self.extra_params.emotion
    }

    /// Whether a named field holds a non-blank value, looking at top-level
    /// attributes first and extra parameters otherwise.
    pub fn has_field(&self, name: &str) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().map_or(false, |s| !s.trim().is_empty())
        }

        match name {
            "provider" => !self.provider.trim().is_empty(),
            "secret_id" => present(&self.credentials.secret_id),
            "secret_key" => present(&self.credentials.secret_key),
            "region" => present(&self.region),
            "description" => present(&self.description),
            "active_voice_id" => present(&self.active_voice_id),
            "enabled" | "speed_ratio" => true,
            other => self.extra_params.contains(other),
        }
    }

    /// Field-level merge of a patch, without validation. The provider is
    /// never changed here.
    pub fn merged(&self, patch: &ConfigPatch) -> EngineConfig {
        let mut next = self.clone();

        if let Some(secret_id) = &patch.secret_id {
            next.credentials.secret_id = Some(secret_id.trim().to_string());
        }
        if let Some(secret_key) = &patch.secret_key {
            next.credentials.secret_key = Some(secret_key.trim().to_string());
        }
        if let Some(region) = &patch.region {
            next.region = Some(region.clone());
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(enabled) = patch.enabled {
            next.enabled = enabled;
        }
        if let Some(voice) = &patch.active_voice_id {
            next.active_voice_id = Some(voice.clone());
        }
        if let Some(speed_ratio) = patch.speed_ratio {
            next.speed_ratio = speed_ratio;
        }
        if let Some(extra) = &patch.extra_params {
            next.extra_params.merge(extra);
        }

        next
    }

    /// Copy with secrets replaced by a mask
    pub fn redacted(&self) -> EngineConfig {
        EngineConfig {
            credentials: self.credentials.masked(),
            ..self.clone()
        }
    }
}

/// A partial update to an [`EngineConfig`]. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_voice_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_params: Option<ExtraParams>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn credentials(mut self, secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.secret_id = Some(secret_id.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn voice(mut self, voice_id: impl Into<String>) -> Self {
        self.active_voice_id = Some(voice_id.into());
        self
    }

    pub fn speed_ratio(mut self, speed_ratio: f64) -> Self {
        self.speed_ratio = Some(speed_ratio);
        self
    }

    pub fn emotion_mode(mut self, mode: EmotionMode) -> Self {
        self.extra_mut().emotion.emotion_mode = Some(mode);
        self
    }

    pub fn default_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.extra_mut().emotion.default_emotion = Some(emotion.into());
        self
    }

    pub fn emo_alpha(mut self, alpha: f64) -> Self {
        self.extra_mut().emotion.emo_alpha = Some(alpha);
        self
    }

    pub fn use_fp16(mut self, use_fp16: bool) -> Self {
        self.extra_mut().use_fp16 = Some(use_fp16);
        self
    }

    /// Set an extension key; `Value::Null` removes it on merge
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_mut().extensions.insert(key.into(), value);
        self
    }

    fn extra_mut(&mut self) -> &mut ExtraParams {
        self.extra_params.get_or_insert_with(ExtraParams::default)
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }

    /// Whether the patch sets any emotion-control key
    pub fn touches_emotion(&self) -> bool {
        self.extra_params
            .as_ref()
            .map_or(false, |extra| !extra.emotion.is_empty())
    }

    /// Build a patch from a raw JSON object as received by a transport.
    ///
    /// `null` top-level values mean "not set". Unknown top-level keys are
    /// carried into the extension map.
    pub fn from_json(value: Value) -> Result<ConfigPatch, Violation> {
        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(Violation::InvalidValue {
                    field: "patch".to_string(),
                    reason: format!("expected an object, got {}", json_type(&other)),
                })
            }
        };

        let mut patch = ConfigPatch::default();
        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "provider" => patch.provider = Some(json_string(&key, value)?),
                "secret_id" => patch.secret_id = Some(json_string(&key, value)?),
                "secret_key" => patch.secret_key = Some(json_string(&key, value)?),
                "region" => patch.region = Some(json_string(&key, value)?),
                "description" => patch.description = Some(json_string(&key, value)?),
                "active_voice_id" => patch.active_voice_id = Some(json_voice_id(value)?),
                "enabled" => match value {
                    Value::Bool(b) => patch.enabled = Some(b),
                    other => return Err(type_mismatch(&key, "a boolean", &other)),
                },
                "speed_ratio" => match value.as_f64() {
                    Some(ratio) => patch.speed_ratio = Some(ratio),
                    None => return Err(type_mismatch(&key, "a number", &value)),
                },
                "extra_params" => match value {
                    Value::Object(extra) => merge_json_extra(patch.extra_mut(), extra)?,
                    other => return Err(type_mismatch(&key, "an object", &other)),
                },
                _ => {
                    patch.extra_mut().extensions.insert(key, value);
                }
            }
        }

        Ok(patch)
    }
}

fn merge_json_extra(extra: &mut ExtraParams, object: Map<String, Value>) -> Result<(), Violation> {
    for (key, value) in object {
        match key.as_str() {
            "emotion_mode" => match &value {
                Value::Null => {}
                Value::String(s) => extra.emotion.emotion_mode = Some(s.parse()?),
                other => {
                    return Err(Violation::emotion(format!(
                        "emotion_mode must be a string, got {}",
                        json_type(other)
                    )))
                }
            },
            "default_emotion" => match &value {
                Value::Null => {}
                Value::String(s) => extra.emotion.default_emotion = Some(s.trim().to_string()),
                other => {
                    return Err(Violation::emotion(format!(
                        "default_emotion must be a string, got {}",
                        json_type(other)
                    )))
                }
            },
            "emo_alpha" => match &value {
                Value::Null => {}
                other => match other.as_f64() {
                    Some(alpha) => extra.emotion.emo_alpha = Some(alpha),
                    None => {
                        return Err(Violation::emotion(format!(
                            "emo_alpha must be a number, got {}",
                            json_type(other)
                        )))
                    }
                },
            },
            "use_fp16" => match value {
                Value::Null => {}
                Value::Bool(b) => extra.use_fp16 = Some(b),
                other => return Err(type_mismatch("use_fp16", "a boolean", &other)),
            },
            _ => {
                extra.extensions.insert(key, value);
            }
        }
    }
    Ok(())
}

fn json_string(field: &str, value: Value) -> Result<String, Violation> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_mismatch(field, "a string", &other)),
    }
}

// Voice ids arrive as strings or bare numbers depending on the provider
fn json_voice_id(value: Value) -> Result<String, Violation> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(type_mismatch("active_voice_id", "a string", &other)),
    }
}

fn type_mismatch(field: &str, expected: &str, got: &Value) -> Violation {
    Violation::InvalidValue {
        field: field.to_string(),
        reason: format!("expected {}, got {}", expected, json_type(got)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// All configurations plus the id of the active one
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigCollection {
    #[serde(default)]
    configs: BTreeMap<String, EngineConfig>,

    #[serde(default)]
    active_config_id: Option<String>,

    /// Bumped on every committed mutation
    #[serde(default)]
    revision: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl ConfigCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from loaded data. An active id that does not name
    /// an enabled entry is dropped.
    pub fn from_parts(configs: BTreeMap<String, EngineConfig>, active_config_id: Option<String>) -> Self {
        let active_config_id = active_config_id
            .filter(|id| configs.get(id).map_or(false, |c| c.enabled));
        Self {
            configs,
            active_config_id,
            revision: 0,
            updated_at: None,
        }
    }

    pub fn configs(&self) -> &BTreeMap<String, EngineConfig> {
        &self.configs
    }

    pub fn get(&self, id: &str) -> Option<&EngineConfig> {
        self.configs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.configs.contains_key(id)
    }

    pub fn active_config_id(&self) -> Option<&str> {
        self.active_config_id.as_deref()
    }

    pub fn active(&self) -> Option<(&str, &EngineConfig)> {
        let id = self.active_config_id.as_deref()?;
        self.configs.get(id).map(|c| (id, c))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_config_id.as_deref() == Some(id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    /// Copy with every entry's secrets masked
    pub fn redacted(&self) -> ConfigCollection {
        ConfigCollection {
            configs: self
                .configs
                .iter()
                .map(|(id, c)| (id.clone(), c.redacted()))
                .collect(),
            ..self.clone()
        }
    }

    /// Check the collection-level invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(id) = &self.active_config_id {
            match self.configs.get(id) {
                None => return Err(format!("active config '{}' does not exist", id)),
                Some(c) if !c.enabled => return Err(format!("active config '{}' is disabled", id)),
                Some(_) => {}
            }
        }
        for (id, config) in &self.configs {
            if !(config.speed_ratio.is_finite() && config.speed_ratio > 0.0) {
                return Err(format!("config '{}' has non-positive speed_ratio", id));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, id: String, config: EngineConfig) {
        self.configs.insert(id, config);
    }

    pub(crate) fn take(&mut self, id: &str) -> Option<EngineConfig> {
        let removed = self.configs.remove(id);
        if removed.is_some() && self.is_active(id) {
            self.active_config_id = None;
        }
        removed
    }

    pub(crate) fn set_active(&mut self, id: Option<String>) {
        self.active_config_id = id;
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Some(Utc::now());
    }

    pub(crate) fn advance_past(&mut self, revision: u64) {
        self.revision = revision;
        self.touch();
    }
}
