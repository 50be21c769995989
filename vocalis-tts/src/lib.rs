//! vocalis-tts: configuration core for multi-provider text-to-speech
//!
//! Provides:
//! - Engine configurations with typed emotion-control settings
//! - Emotion mode policy (auto / manual / disabled)
//! - Provider-aware validation of partial updates
//! - A config store with a single active entry and atomic commits
//! - A backend seam for persistence, voice lists and connectivity tests

pub mod error;
pub mod config;
pub mod model;
pub mod emotion;
pub mod meta;
pub mod validator;
pub mod store;
pub mod voice;
pub mod backend;
pub mod service;

pub use error::{ErrorKind, TtsConfigError, Violation};
pub use config::TtsSettings;
pub use model::{ConfigCollection, ConfigPatch, Credentials, EngineConfig, ExtraParams};
pub use emotion::{
    is_emotion_selector_relevant, is_intensity_relevant, validate_alpha, EmotionCatalog,
    EmotionDirective, EmotionInfo, EmotionMode, EmotionPolicy, EmotionSettings,
};
pub use meta::{EngineCatalog, EngineMeta};
pub use validator::ConfigValidator;
pub use store::ConfigStore;
pub use voice::{TtsVoice, VoiceDirectory};
pub use backend::{ConfigBackend, ConnectionTestResult, EngineStatus};
pub use backend::memory::MemoryBackend;
pub use service::TtsSettingsService;
