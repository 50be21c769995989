//! Per-provider metadata driving field-presence checks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Description of one TTS provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineMeta {
    pub provider: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required_fields: Vec<String>,

    #[serde(default)]
    pub optional_fields: Vec<String>,

    /// Whether the engine accepts emotion-control parameters
    #[serde(default)]
    pub supports_emotion: bool,
}

impl EngineMeta {
    pub fn new(provider: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            display_name: display_name.into(),
            description: None,
            required_fields: Vec::new(),
            optional_fields: Vec::new(),
            supports_emotion: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn require(mut self, fields: &[&str]) -> Self {
        self.required_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn allow(mut self, fields: &[&str]) -> Self {
        self.optional_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_emotion(mut self) -> Self {
        self.supports_emotion = true;
        self
    }

    /// Whether `field` is declared, required or optional
    pub fn declares(&self, field: &str) -> bool {
        self.required_fields.iter().any(|f| f == field) || self.optional_fields.iter().any(|f| f == field)
    }
}

/// Known providers, keyed by provider identifier
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCatalog {
    engines: BTreeMap<String, EngineMeta>,
}

impl Default for EngineCatalog {
    fn default() -> Self {
        Self::from_metas(builtin_engines())
    }
}

impl EngineCatalog {
    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    /// Later entries for the same provider replace earlier ones
    pub fn from_metas(metas: impl IntoIterator<Item = EngineMeta>) -> Self {
        let engines = metas
            .into_iter()
            .map(|meta| (meta.provider.clone(), meta))
            .collect();
        Self { engines }
    }

    pub fn get(&self, provider: &str) -> Option<&EngineMeta> {
        self.engines.get(provider)
    }

    pub fn insert(&mut self, meta: EngineMeta) {
        self.engines.insert(meta.provider.clone(), meta);
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn metas(&self) -> impl Iterator<Item = &EngineMeta> {
        self.engines.values()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// Providers known without asking a backend
pub fn builtin_engines() -> Vec<EngineMeta> {
    vec![
        EngineMeta::new("tencent_tts", "Tencent Cloud TTS")
            .with_description("Cloud synthesis with a large catalog of numbered voices")
            .require(&["secret_id", "secret_key"])
            .allow(&["region", "active_voice_id", "description"]),
        EngineMeta::new("edge_tts", "Edge TTS")
            .with_description("Free online neural voices")
            .allow(&["active_voice_id", "description", "proxy_url"]),
        EngineMeta::new("index_tts", "IndexTTS2")
            .with_description("Local zero-shot voice cloning with emotion control")
            .allow(&[
                "active_voice_id",
                "description",
                "emotion_mode",
                "default_emotion",
                "emo_alpha",
                "use_fp16",
            ])
            .with_emotion(),
    ]
}
