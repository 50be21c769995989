//! Emotion control: modes, categories and the policy tying them together
//!
//! The mode is a flat enumeration. Any mode may follow any other; the only
//! side effect of a transition is that entering `manual` without a category
//! picks the first category of the catalog, so `manual` always has one.

use crate::error::Violation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion control mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmotionMode {
    /// Infer the emotion from the text being spoken
    Auto,
    /// Apply one fixed emotion category
    Manual,
    /// No emotion control, neutral delivery
    #[default]
    Disabled,
}

impl EmotionMode {
    pub const ALL: [EmotionMode; 3] = [EmotionMode::Disabled, EmotionMode::Auto, EmotionMode::Manual];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionMode::Auto => "auto",
            EmotionMode::Manual => "manual",
            EmotionMode::Disabled => "disabled",
        }
    }
}

impl fmt::Display for EmotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionMode {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(EmotionMode::Auto),
            "manual" => Ok(EmotionMode::Manual),
            "disabled" => Ok(EmotionMode::Disabled),
            other => Err(Violation::emotion(format!(
                "unknown emotion mode '{}' (expected auto, manual or disabled)",
                other
            ))),
        }
    }
}

/// The emotion category selector only matters for a fixed emotion.
pub fn is_emotion_selector_relevant(mode: EmotionMode) -> bool {
    mode == EmotionMode::Manual
}

/// The intensity coefficient matters whenever emotion control is on.
pub fn is_intensity_relevant(mode: EmotionMode) -> bool {
    mode != EmotionMode::Disabled
}

/// Check an emotion intensity coefficient, inclusive of both bounds.
pub fn validate_alpha(value: f64) -> Result<f64, Violation> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Violation::out_of_range("emo_alpha", value, "0.0..=1.0"))
    }
}

/// Emotion-related subset of a config's extra parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmotionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_mode: Option<EmotionMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_emotion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emo_alpha: Option<f64>,
}

impl EmotionSettings {
    /// Effective mode; an unset mode behaves as `disabled`
    pub fn mode(&self) -> EmotionMode {
        self.emotion_mode.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.emotion_mode.is_none() && self.default_emotion.is_none() && self.emo_alpha.is_none()
    }

    /// Intensity as applied by an engine. A stored alpha is inert while disabled.
    pub fn effective_alpha(&self) -> Option<f64> {
        if is_intensity_relevant(self.mode()) {
            self.emo_alpha
        } else {
            None
        }
    }
}

/// One selectable emotion category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EmotionInfo {
    pub fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            description: None,
        }
    }
}

/// Ordered set of emotion categories a manual mode may select from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<EmotionInfo>", into = "Vec<EmotionInfo>")]
pub struct EmotionCatalog {
    entries: Vec<EmotionInfo>,
}

impl From<Vec<EmotionInfo>> for EmotionCatalog {
    fn from(entries: Vec<EmotionInfo>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<EmotionCatalog> for Vec<EmotionInfo> {
    fn from(catalog: EmotionCatalog) -> Self {
        catalog.entries
    }
}

impl Default for EmotionCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                EmotionInfo::new("happy", "Happy", "😊"),
                EmotionInfo::new("sad", "Sad", "😢"),
                EmotionInfo::new("angry", "Angry", "😠"),
                EmotionInfo::new("afraid", "Afraid", "😨"),
                EmotionInfo::new("calm", "Calm", "😌"),
                EmotionInfo::new("surprised", "Surprised", "😲"),
                EmotionInfo::new("melancholic", "Melancholic", "😔"),
                EmotionInfo::new("disgusted", "Disgusted", "🤢"),
            ],
        }
    }
}

impl EmotionCatalog {
    /// Build a catalog from backend entries.
    ///
    /// Backends list the modes (`auto`, `disabled`) alongside the categories;
    /// those entries and duplicate ids are dropped. An empty result falls back
    /// to the built-in categories.
    pub fn from_entries(entries: Vec<EmotionInfo>) -> Self {
        let mut kept: Vec<EmotionInfo> = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.id.trim().to_string();
            if id.is_empty() || id.parse::<EmotionMode>().is_ok() {
                continue;
            }
            if kept.iter().any(|e| e.id == id) {
                continue;
            }
            kept.push(EmotionInfo { id, ..entry });
        }

        if kept.is_empty() {
            Self::default()
        } else {
            Self { entries: kept }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Category chosen when `manual` is entered without one
    pub fn first(&self) -> &EmotionInfo {
        // every constructor goes through from_entries or default, never empty
        &self.entries[0]
    }

    pub fn get(&self, id: &str) -> Option<&EmotionInfo> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[EmotionInfo] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Axis order of the emotion vector expected by expressive engines
pub const EMOTION_AXES: [&str; 8] = [
    "happy",
    "angry",
    "sad",
    "afraid",
    "disgusted",
    "melancholic",
    "surprised",
    "calm",
];

/// One-hot emotion vector for a category, if the engine has an axis for it
pub fn emotion_vector(emotion: &str) -> Option<[f32; 8]> {
    let index = EMOTION_AXES.iter().position(|axis| *axis == emotion)?;
    let mut vector = [0.0f32; 8];
    vector[index] = 1.0;
    Some(vector)
}

/// Emotion instructions handed to a synthesis engine
#[derive(Debug, Clone, PartialEq)]
pub enum EmotionDirective {
    /// No emotion conditioning
    Neutral,
    /// Infer emotion from the text, blended at `alpha`
    Inferred { alpha: f64 },
    /// Fixed category
    Fixed {
        emotion: String,
        vector: [f32; 8],
        alpha: f64,
    },
}

/// Emotion rules evaluated against a category catalog
pub struct EmotionPolicy<'a> {
    catalog: &'a EmotionCatalog,
}

impl<'a> EmotionPolicy<'a> {
    pub fn new(catalog: &'a EmotionCatalog) -> Self {
        Self { catalog }
    }

    /// Switch to `mode`. Always accepted; entering `manual` without a
    /// category selects the catalog's first one.
    pub fn transition(&self, settings: &mut EmotionSettings, mode: EmotionMode) {
        settings.emotion_mode = Some(mode);
        if mode == EmotionMode::Manual && settings.default_emotion.is_none() {
            settings.default_emotion = Some(self.catalog.first().id.clone());
        }
    }

    /// Merge `patch` into `current` and check the result.
    ///
    /// Category and intensity from the patch are applied before the mode, so a
    /// patch carrying both `manual` and a category keeps that category.
    pub fn apply(
        &self,
        current: &EmotionSettings,
        patch: &EmotionSettings,
    ) -> Result<EmotionSettings, Violation> {
        let mut merged = current.clone();

        if let Some(alpha) = patch.emo_alpha {
            merged.emo_alpha = Some(validate_alpha(alpha)?);
        }

        if let Some(emotion) = &patch.default_emotion {
            let emotion = emotion.trim();
            if !self.catalog.contains(emotion) {
                return Err(Violation::emotion(format!(
                    "unknown emotion category '{}'",
                    emotion
                )));
            }
            merged.default_emotion = Some(emotion.to_string());
        }

        if let Some(mode) = patch.emotion_mode {
            self.transition(&mut merged, mode);
        }

        self.check(&merged)?;
        Ok(merged)
    }

    /// Check the emotion invariants of stored settings.
    pub fn check(&self, settings: &EmotionSettings) -> Result<(), Violation> {
        if let Some(alpha) = settings.emo_alpha {
            validate_alpha(alpha)?;
        }

        match (&settings.emotion_mode, &settings.default_emotion) {
            (Some(EmotionMode::Manual), None) => Err(Violation::emotion(
                "manual mode requires a default emotion",
            )),
            (Some(EmotionMode::Manual), Some(emotion)) if !self.catalog.contains(emotion) => {
                Err(Violation::emotion(format!(
                    "unknown emotion category '{}'",
                    emotion
                )))
            }
            _ => Ok(()),
        }
    }

    /// Directive for an engine, falling back to `default_alpha` when no
    /// intensity is stored.
    pub fn directive(&self, settings: &EmotionSettings, default_alpha: f64) -> EmotionDirective {
        let alpha = settings.emo_alpha.unwrap_or(default_alpha);
        match settings.mode() {
            EmotionMode::Disabled => EmotionDirective::Neutral,
            EmotionMode::Auto => EmotionDirective::Inferred { alpha },
            EmotionMode::Manual => {
                let fixed = settings
                    .default_emotion
                    .as_deref()
                    .filter(|e| self.catalog.contains(e))
                    .and_then(|e| emotion_vector(e).map(|v| (e.to_string(), v)));
                match fixed {
                    Some((emotion, vector)) => EmotionDirective::Fixed {
                        emotion,
                        vector,
                        alpha,
                    },
                    None => EmotionDirective::Neutral,
                }
            }
        }
    }
}
