//! Authoritative holder of the configuration collection
//!
//! Readers get an `Arc` snapshot and never block each other. Writers are
//! serialized by the write lock; each mutation works on a copy of the
//! collection and swaps it in only after validation, so no reader ever sees
//! a half-applied change.

use crate::config::TtsSettings;
use crate::emotion::{EmotionCatalog, EmotionDirective, EmotionPolicy};
use crate::error::{Result, TtsConfigError, Violation};
use crate::meta::{EngineCatalog, EngineMeta};
use crate::model::{ConfigCollection, ConfigPatch, EngineConfig};
use crate::validator::ConfigValidator;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Thread-safe configuration store
pub struct ConfigStore {
    state: RwLock<Arc<ConfigCollection>>,
    engines: RwLock<Arc<EngineCatalog>>,
    emotions: RwLock<Arc<EmotionCatalog>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Empty store with the built-in engine and emotion catalogs
    pub fn new() -> Self {
        Self::with_catalogs(EngineCatalog::default(), EmotionCatalog::default())
    }

    pub fn with_catalogs(engines: EngineCatalog, emotions: EmotionCatalog) -> Self {
        Self {
            state: RwLock::new(Arc::new(ConfigCollection::new())),
            engines: RwLock::new(Arc::new(engines)),
            emotions: RwLock::new(Arc::new(emotions)),
        }
    }

    pub fn from_settings(settings: &TtsSettings) -> Self {
        Self::with_catalogs(
            EngineCatalog::from_metas(settings.engines.iter().cloned()),
            settings.emotions.clone(),
        )
    }

    /// Snapshot of the current collection
    pub fn list(&self) -> Arc<ConfigCollection> {
        self.state.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<EngineConfig> {
        self.state.read().get(id).cloned()
    }

    /// Id and entry of the active configuration
    pub fn active(&self) -> Option<(String, EngineConfig)> {
        let snapshot = self.list();
        snapshot.active().map(|(id, c)| (id.to_string(), c.clone()))
    }

    pub fn engines(&self) -> Arc<EngineCatalog> {
        self.engines.read().clone()
    }

    pub fn emotions(&self) -> Arc<EmotionCatalog> {
        self.emotions.read().clone()
    }

    /// Replace the provider metadata used for validation
    pub fn set_engines(&self, metas: Vec<EngineMeta>) {
        let catalog = EngineCatalog::from_metas(metas);
        debug!("Engine catalog updated ({} providers)", catalog.len());
        *self.engines.write() = Arc::new(catalog);
    }

    /// Replace the emotion categories manual mode validates against
    pub fn set_emotions(&self, catalog: EmotionCatalog) {
        debug!("Emotion catalog updated ({} categories)", catalog.len());
        *self.emotions.write() = Arc::new(catalog);
    }

    /// Replace the whole collection with loaded data.
    ///
    /// Every loaded entry is validated as if it were added; entries that fail
    /// are dropped with a warning. An active id that does not point at a
    /// surviving enabled entry is dropped too.
    pub fn replace_all(&self, collection: ConfigCollection) -> Arc<ConfigCollection> {
        let engines = self.engines();
        let emotions = self.emotions();
        let validator = ConfigValidator::new(&engines, &emotions);

        let mut configs = BTreeMap::new();
        for (id, config) in collection.configs() {
            if id.trim().is_empty() {
                warn!("Dropping loaded TTS config with an empty id");
                continue;
            }
            match validator.validate_new(config) {
                Ok(valid) => {
                    configs.insert(id.clone(), valid);
                }
                Err(violation) => warn!("Dropping loaded TTS config '{}': {}", id, violation),
            }
        }

        let active = collection.active_config_id().map(str::to_string);
        let mut next = ConfigCollection::from_parts(configs, active.clone());
        if next.active_config_id().is_none() {
            if let Some(id) = active {
                warn!("Dropping active config '{}': missing or disabled", id);
            }
        }

        let mut state = self.state.write();
        next.advance_past(state.revision());
        let next = Arc::new(next);
        *state = next.clone();
        info!("Loaded {} of {} TTS configs", next.len(), collection.len());
        next
    }

    /// Validate `config` as a new entry without committing it
    pub fn check_add(&self, id: &str, config: &EngineConfig) -> Result<EngineConfig> {
        let snapshot = self.list();
        self.prepare_add(&snapshot, id, config)
    }

    /// Add a new entry
    pub fn add(&self, id: &str, config: EngineConfig) -> Result<EngineConfig> {
        self.commit(|collection, store| {
            let validated = store.prepare_add(collection, id, &config)?;
            collection.insert(id.to_string(), validated.clone());
            info!("Added TTS config '{}' (provider {})", id, validated.provider);
            Ok(validated)
        })
    }

    /// Validate a patch without committing it
    pub fn check_patch(&self, id: &str, patch: &ConfigPatch) -> Result<EngineConfig> {
        let snapshot = self.list();
        self.prepare_patch(&snapshot, id, patch)
    }

    /// Merge a patch into an existing entry
    pub fn patch(&self, id: &str, patch: ConfigPatch) -> Result<EngineConfig> {
        self.commit(|collection, store| {
            let merged = store.prepare_patch(collection, id, &patch)?;
            if !merged.enabled && collection.is_active(id) {
                warn!("TTS config '{}' disabled while active, clearing active config", id);
                collection.set_active(None);
            }
            collection.insert(id.to_string(), merged.clone());
            info!("Patched TTS config '{}'", id);
            Ok(merged)
        })
    }

    /// Check that `id` could be activated right now
    pub fn check_activate(&self, id: &str) -> Result<()> {
        let snapshot = self.list();
        check_activatable(&snapshot, id)
    }

    /// Make `id` the active configuration, returning the previously active id.
    ///
    /// The switch is a single swap: observers see either the old or the new
    /// active entry, never both and never none.
    pub fn activate(&self, id: &str) -> Result<Option<String>> {
        self.commit(|collection, _| {
            check_activatable(collection, id)?;
            let previous = collection.active_config_id().map(str::to_string);
            collection.set_active(Some(id.to_string()));
            info!("Activated TTS config '{}' (previous: {:?})", id, previous);
            Ok(previous)
        })
    }

    /// Delete an entry, clearing the active id if it pointed here
    pub fn remove(&self, id: &str) -> Result<EngineConfig> {
        self.commit(|collection, _| {
            let was_active = collection.is_active(id);
            let removed = collection
                .take(id)
                .ok_or_else(|| TtsConfigError::NotFound(id.to_string()))?;
            if was_active {
                info!("Removed active TTS config '{}', no config is active now", id);
            } else {
                info!("Removed TTS config '{}'", id);
            }
            Ok(removed)
        })
    }

    /// Emotion directive for an entry
    pub fn directive(&self, id: &str, default_alpha: f64) -> Result<EmotionDirective> {
        let config = self.get(id).ok_or_else(|| TtsConfigError::NotFound(id.to_string()))?;
        let emotions = self.emotions();
        Ok(EmotionPolicy::new(&emotions).directive(config.emotion(), default_alpha))
    }

    fn prepare_add(&self, collection: &ConfigCollection, id: &str, config: &EngineConfig) -> Result<EngineConfig> {
        if id.trim().is_empty() {
            return Err(TtsConfigError::invalid(id, Violation::missing("id")));
        }
        if collection.contains(id) {
            return Err(TtsConfigError::AlreadyExists(id.to_string()));
        }

        let engines = self.engines();
        let emotions = self.emotions();
        ConfigValidator::new(&engines, &emotions)
            .validate_new(config)
            .map_err(|violation| rejected(id, violation))
    }

    fn prepare_patch(&self, collection: &ConfigCollection, id: &str, patch: &ConfigPatch) -> Result<EngineConfig> {
        let current = collection
            .get(id)
            .ok_or_else(|| TtsConfigError::NotFound(id.to_string()))?;

        let engines = self.engines();
        let emotions = self.emotions();
        ConfigValidator::new(&engines, &emotions)
            .validate_patch(current, patch)
            .map_err(|violation| rejected(id, violation))
    }

    /// Run `op` on a copy of the collection under the write lock and publish
    /// the copy only if `op` succeeds.
    fn commit<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut ConfigCollection, &ConfigStore) -> Result<T>,
    {
        let mut state = self.state.write();
        let mut next = ConfigCollection::clone(&state);
        let value = op(&mut next, self)?;
        next.touch();
        debug_assert!(next.check_invariants().is_ok());
        *state = Arc::new(next);
        Ok(value)
    }
}

fn check_activatable(collection: &ConfigCollection, id: &str) -> Result<()> {
    match collection.get(id) {
        None => Err(TtsConfigError::NotFound(id.to_string())),
        Some(config) if !config.enabled => Err(TtsConfigError::Disabled(id.to_string())),
        Some(_) => Ok(()),
    }
}

fn rejected(id: &str, violation: Violation) -> TtsConfigError {
    warn!("Rejected change to TTS config '{}': {}", id, violation);
    TtsConfigError::invalid(id, violation)
}
