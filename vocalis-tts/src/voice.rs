//! Provider voice lists and voice metadata stamping

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A voice offered by a provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TtsVoice {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_wav_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_type_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_human_style: Option<String>,
    /// Numeric voice code for providers that address voices by number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_type: Option<i64>,
}

impl TtsVoice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_voice_type(mut self, voice_type: i64) -> Self {
        self.voice_type = Some(voice_type);
        self
    }
}

/// Numeric voice code for `voice_id`: a bare number is taken as the code,
/// otherwise the voice is looked up by id or name.
pub fn resolve_voice_type(voice_id: &str, voices: &[TtsVoice]) -> Option<i64> {
    let voice_id = voice_id.trim();
    if !voice_id.is_empty() && voice_id.chars().all(|c| c.is_ascii_digit()) {
        return voice_id.parse().ok();
    }
    voices
        .iter()
        .find(|v| v.id == voice_id || v.name == voice_id)
        .and_then(|v| v.voice_type)
}

/// Numeric voice code given explicitly as a `VoiceType` value, either a
/// number or a numeric string
pub fn parse_voice_type(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extension keys describing the voice with code `voice_type`.
///
/// `VoiceType` is always set. When the code names a listed voice its
/// metadata is added, and metadata the voice lacks is set to `null` so a
/// merge clears values left over from the previous voice.
pub fn voice_stamp(voice_type: i64, voices: &[TtsVoice]) -> BTreeMap<String, Value> {
    let mut stamp = BTreeMap::new();
    stamp.insert("VoiceType".to_string(), json!(voice_type));

    if let Some(voice) = voices.iter().find(|v| v.voice_type == Some(voice_type)) {
        stamp.insert("VoiceName".to_string(), json!(voice.name));
        let optional = [
            ("VoiceDesc", &voice.description),
            ("VoiceQuality", &voice.voice_quality),
            ("VoiceTypeTag", &voice.voice_type_tag),
            ("VoiceHumanStyle", &voice.voice_human_style),
            ("VoiceGender", &voice.gender),
        ];
        for (key, value) in optional {
            let value = value.as_ref().map_or(Value::Null, |v| json!(v));
            stamp.insert(key.to_string(), value);
        }
    }
    stamp
}

/// Cached voice lists, per provider
#[derive(Default)]
pub struct VoiceDirectory {
    voices: RwLock<HashMap<String, Arc<Vec<TtsVoice>>>>,
}

impl VoiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, provider: &str) -> Option<Arc<Vec<TtsVoice>>> {
        self.voices.read().get(provider).cloned()
    }

    pub fn insert(&self, provider: &str, voices: Vec<TtsVoice>) -> Arc<Vec<TtsVoice>> {
        let voices = Arc::new(voices);
        self.voices.write().insert(provider.to_string(), voices.clone());
        voices
    }

    pub fn invalidate(&self, provider: &str) {
        self.voices.write().remove(provider);
    }

    pub fn clear(&self) {
        self.voices.write().clear();
    }
}
