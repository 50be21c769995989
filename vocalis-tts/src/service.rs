//! Settings service: the store paired with a persistence backend
//!
//! Every write is validated against the store first, persisted through the
//! backend second and committed to the store last. A backend failure leaves
//! the store untouched.

use crate::backend::{ConfigBackend, ConnectionTestResult, EngineStatus};
use crate::config::TtsSettings;
use crate::emotion::{EmotionCatalog, EmotionDirective};
use crate::error::{Result, TtsConfigError};
use crate::model::{ConfigCollection, ConfigPatch, EngineConfig};
use crate::store::ConfigStore;
use crate::voice::{parse_voice_type, resolve_voice_type, voice_stamp, TtsVoice, VoiceDirectory};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct TtsSettingsService<B: ConfigBackend> {
    store: Arc<ConfigStore>,
    backend: Arc<B>,
    voices: VoiceDirectory,
    settings: TtsSettings,
    write_lock: Mutex<()>,
}

impl<B: ConfigBackend> TtsSettingsService<B> {
    pub fn new(backend: Arc<B>, settings: TtsSettings) -> Self {
        Self {
            store: Arc::new(ConfigStore::from_settings(&settings)),
            backend,
            voices: VoiceDirectory::new(),
            settings,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn settings(&self) -> &TtsSettings {
        &self.settings
    }

    /// Reload catalogs and configurations from the backend
    pub async fn sync(&self) -> Result<Arc<ConfigCollection>> {
        let _guard = self.write_lock.lock().await;

        let engines = self.backend.fetch_engines().await?;
        let emotions = self.backend.fetch_emotions().await?;
        let configs = self.backend.fetch_configs().await?;

        self.store.set_engines(engines);
        self.store.set_emotions(EmotionCatalog::from_entries(emotions));
        self.voices.clear();
        let snapshot = self.store.replace_all(configs);

        info!("Synced TTS settings from {} backend", self.backend.name());
        Ok(self.present(snapshot))
    }

    /// Current collection, with secrets masked unless disabled in settings
    pub fn list(&self) -> Arc<ConfigCollection> {
        self.present(self.store.list())
    }

    pub fn get(&self, id: &str) -> Option<EngineConfig> {
        let config = self.store.get(id)?;
        Some(if self.settings.mask_secrets { config.redacted() } else { config })
    }

    /// A fresh entry for `provider` carrying the configured defaults
    pub fn draft(&self, provider: &str) -> EngineConfig {
        let mut config = EngineConfig::new(provider).with_speed_ratio(self.settings.default_speed_ratio);
        if self.declares_region(provider) {
            config.region = Some(self.settings.default_region.clone());
        }
        config
    }

    pub async fn add(&self, id: &str, mut config: EngineConfig) -> Result<EngineConfig> {
        let _guard = self.write_lock.lock().await;

        if config.region.is_none() && self.declares_region(&config.provider) {
            config.region = Some(self.settings.default_region.clone());
        }

        let validated = self.store.check_add(id, &config)?;
        self.backend.save_config(id, &validated).await?;
        self.store.add(id, validated)
    }

    /// Apply a partial update.
    ///
    /// When the patch selects a voice, the numeric voice code is taken from an
    /// explicit `VoiceType` extension first and from `active_voice_id`
    /// otherwise, and the provider's metadata for that voice is stamped in.
    /// Disabling the active entry also clears the backend's activation.
    pub async fn patch(&self, id: &str, mut patch: ConfigPatch) -> Result<EngineConfig> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .store
            .get(id)
            .ok_or_else(|| TtsConfigError::NotFound(id.to_string()))?;

        let explicit = patch
            .extra_params
            .as_ref()
            .and_then(|extra| extra.extensions.get("VoiceType"))
            .and_then(parse_voice_type);

        if explicit.is_some() || patch.active_voice_id.is_some() {
            let voices = match self.voices(&current.provider).await {
                Ok(voices) => voices,
                Err(e) => {
                    warn!("No voice list for {}: {}", current.provider, e);
                    Arc::new(Vec::new())
                }
            };
            let voice_type = explicit.or_else(|| {
                patch
                    .active_voice_id
                    .as_deref()
                    .and_then(|voice_id| resolve_voice_type(voice_id, &voices))
            });
            if let Some(code) = voice_type {
                for (key, value) in voice_stamp(code, &voices) {
                    patch = patch.extension(key, value);
                }
            }
        }

        let merged = self.store.check_patch(id, &patch)?;
        let deactivates = !merged.enabled && self.store.list().is_active(id);

        self.backend.save_config(id, &merged).await?;
        if deactivates {
            self.backend.clear_activation().await?;
        }
        self.store.patch(id, patch)
    }

    /// Activate `id`, returning the previously active id
    pub async fn activate(&self, id: &str) -> Result<Option<String>> {
        let _guard = self.write_lock.lock().await;

        self.store.check_activate(id)?;
        self.backend.save_activation(id).await?;
        self.store.activate(id)
    }

    pub async fn remove(&self, id: &str) -> Result<EngineConfig> {
        let _guard = self.write_lock.lock().await;

        if self.store.get(id).is_none() {
            return Err(TtsConfigError::NotFound(id.to_string()));
        }
        self.backend.delete_config(id).await?;
        self.store.remove(id)
    }

    /// Voices for a provider, fetched once and cached until the next sync
    pub async fn voices(&self, provider: &str) -> Result<Arc<Vec<TtsVoice>>> {
        if let Some(voices) = self.voices.get(provider) {
            return Ok(voices);
        }
        let voices = self.backend.list_voices(provider).await?;
        debug!("Fetched {} voices for {}", voices.len(), provider);
        Ok(self.voices.insert(provider, voices))
    }

    pub async fn test_connection(&self, id: &str) -> Result<ConnectionTestResult> {
        if self.store.get(id).is_none() {
            return Err(TtsConfigError::NotFound(id.to_string()));
        }
        let result = self.backend.test_connection(id).await?;
        if result.success {
            info!("Connection test for '{}' passed: {}", id, result.message);
        } else {
            warn!("Connection test for '{}' failed: {}", id, result.message);
        }
        Ok(result)
    }

    pub async fn engine_status(&self, provider: &str) -> Result<EngineStatus> {
        self.backend.engine_status(provider).await
    }

    /// Emotion directive for an entry, using the configured default intensity
    pub fn emotion_directive(&self, id: &str) -> Result<EmotionDirective> {
        self.store.directive(id, self.settings.default_emo_alpha)
    }

    /// Emotion directive for the active entry, if any
    pub fn active_directive(&self) -> Option<(String, EmotionDirective)> {
        let (id, _) = self.store.active()?;
        let directive = self.emotion_directive(&id).ok()?;
        Some((id, directive))
    }

    fn present(&self, snapshot: Arc<ConfigCollection>) -> Arc<ConfigCollection> {
        if self.settings.mask_secrets {
            Arc::new(snapshot.redacted())
        } else {
            snapshot
        }
    }

    fn declares_region(&self, provider: &str) -> bool {
        self.store
            .engines()
            .get(provider)
            .map_or(false, |meta| meta.declares("region"))
    }
}
