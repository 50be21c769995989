//! In-process backend

use super::{ConfigBackend, ConnectionTestResult, EngineStatus};
use crate::emotion::{EmotionCatalog, EmotionInfo};
use crate::error::TtsConfigError;
use crate::meta::{builtin_engines, EngineMeta};
use crate::model::{ConfigCollection, EngineConfig};
use crate::voice::TtsVoice;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// Backend keeping everything in memory
pub struct MemoryBackend {
    engines: RwLock<Vec<EngineMeta>>,
    emotions: RwLock<Vec<EmotionInfo>>,
    configs: RwLock<BTreeMap<String, EngineConfig>>,
    active: RwLock<Option<String>>,
    voices: RwLock<HashMap<String, Vec<TtsVoice>>>,
    statuses: RwLock<HashMap<String, EngineStatus>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(builtin_engines()),
            emotions: RwLock::new(EmotionCatalog::default().entries().to_vec()),
            configs: RwLock::new(BTreeMap::new()),
            active: RwLock::new(None),
            voices: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_config(self, id: &str, config: EngineConfig) -> Self {
        self.configs.write().insert(id.to_string(), config);
        self
    }

    pub fn with_active(self, id: &str) -> Self {
        *self.active.write() = Some(id.to_string());
        self
    }

    pub fn with_engines(self, engines: Vec<EngineMeta>) -> Self {
        *self.engines.write() = engines;
        self
    }

    pub fn with_emotions(self, emotions: Vec<EmotionInfo>) -> Self {
        *self.emotions.write() = emotions;
        self
    }

    pub fn with_voices(self, provider: &str, voices: Vec<TtsVoice>) -> Self {
        self.voices.write().insert(provider.to_string(), voices);
        self
    }

    pub fn with_status(self, provider: &str, status: EngineStatus) -> Self {
        self.statuses.write().insert(provider.to_string(), status);
        self
    }

    /// Make every write fail, to exercise error paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: &str) -> Option<EngineConfig> {
        self.configs.read().get(id).cloned()
    }

    pub fn stored_active(&self) -> Option<String> {
        self.active.read().clone()
    }

    fn check_writable(&self) -> Result<(), TtsConfigError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TtsConfigError::Backend("memory backend rejected the write".to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigBackend for MemoryBackend {
    async fn fetch_engines(&self) -> Result<Vec<EngineMeta>, TtsConfigError> {
        Ok(self.engines.read().clone())
    }

    async fn fetch_configs(&self) -> Result<ConfigCollection, TtsConfigError> {
        let configs = self.configs.read().clone();
        let active = self.active.read().clone();
        Ok(ConfigCollection::from_parts(configs, active))
    }

    async fn fetch_emotions(&self) -> Result<Vec<EmotionInfo>, TtsConfigError> {
        Ok(self.emotions.read().clone())
    }

    async fn save_config(&self, id: &str, config: &EngineConfig) -> Result<(), TtsConfigError> {
        self.check_writable()?;
        self.configs.write().insert(id.to_string(), config.clone());
        self.record_write();
        debug!("Stored TTS config '{}'", id);
        Ok(())
    }

    async fn save_activation(&self, id: &str) -> Result<(), TtsConfigError> {
        self.check_writable()?;
        if !self.configs.read().contains_key(id) {
            return Err(TtsConfigError::NotFound(id.to_string()));
        }
        *self.active.write() = Some(id.to_string());
        self.record_write();
        Ok(())
    }

    async fn clear_activation(&self) -> Result<(), TtsConfigError> {
        self.check_writable()?;
        *self.active.write() = None;
        self.record_write();
        Ok(())
    }

    async fn delete_config(&self, id: &str) -> Result<(), TtsConfigError> {
        self.check_writable()?;
        if self.configs.write().remove(id).is_none() {
            return Err(TtsConfigError::NotFound(id.to_string()));
        }
        let mut active = self.active.write();
        if active.as_deref() == Some(id) {
            *active = None;
        }
        self.record_write();
        Ok(())
    }

    async fn list_voices(&self, provider: &str) -> Result<Vec<TtsVoice>, TtsConfigError> {
        Ok(self.voices.read().get(provider).cloned().unwrap_or_default())
    }

    async fn test_connection(&self, id: &str) -> Result<ConnectionTestResult, TtsConfigError> {
        let config = self
            .stored(id)
            .ok_or_else(|| TtsConfigError::NotFound(id.to_string()))?;

        let (success, message) = if config.enabled {
            (true, format!("{} reachable", config.provider))
        } else {
            (false, format!("{} is disabled", config.provider))
        };

        Ok(ConnectionTestResult {
            success,
            config_id: id.to_string(),
            provider: config.provider,
            message,
        })
    }

    async fn engine_status(&self, provider: &str) -> Result<EngineStatus, TtsConfigError> {
        Ok(self.statuses.read().get(provider).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
