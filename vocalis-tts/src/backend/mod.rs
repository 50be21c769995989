//! Persistence and transport seam
//!
//! A backend owns durable storage and everything that talks to providers.
//! The core hands it validated data and treats its answers as pass-through,
//! except the emotion catalog which feeds validation.

pub mod memory;

use crate::emotion::EmotionInfo;
use crate::error::TtsConfigError;
use crate::meta::EngineMeta;
use crate::model::{ConfigCollection, EngineConfig};
use crate::voice::TtsVoice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a provider connectivity test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub config_id: String,
    pub provider: String,
    pub message: String,
}

/// Load state of a local engine model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    pub loaded: bool,
    pub loading: bool,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Trait for configuration backends
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Provider metadata
    async fn fetch_engines(&self) -> Result<Vec<EngineMeta>, TtsConfigError>;

    /// Stored configurations and the active id
    async fn fetch_configs(&self) -> Result<ConfigCollection, TtsConfigError>;

    /// Emotion categories (may include mode entries, which are filtered)
    async fn fetch_emotions(&self) -> Result<Vec<EmotionInfo>, TtsConfigError>;

    /// Store a validated entry under `id`, creating or replacing it
    async fn save_config(&self, id: &str, config: &EngineConfig) -> Result<(), TtsConfigError>;

    /// Record `id` as the active configuration
    async fn save_activation(&self, id: &str) -> Result<(), TtsConfigError>;

    /// Record that no configuration is active
    async fn clear_activation(&self) -> Result<(), TtsConfigError>;

    /// Delete an entry
    async fn delete_config(&self, id: &str) -> Result<(), TtsConfigError>;

    /// Voices offered by a provider
    async fn list_voices(&self, provider: &str) -> Result<Vec<TtsVoice>, TtsConfigError>;

    /// Check connectivity of a stored entry
    async fn test_connection(&self, id: &str) -> Result<ConnectionTestResult, TtsConfigError>;

    /// Model status of a local engine
    async fn engine_status(&self, _provider: &str) -> Result<EngineStatus, TtsConfigError> {
        Ok(EngineStatus::default())
    }

    /// Get backend name
    fn name(&self) -> &str;
}
