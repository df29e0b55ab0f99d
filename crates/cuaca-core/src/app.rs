use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::preferences::PreferencesStore;
use crate::storage::{FileStore, KeyValueStore};
use crate::Config;

/// Application context: configuration plus the shared storage handle.
///
/// Stores built on top of it (weather, locations, preferences) receive the
/// storage handle explicitly rather than reaching for globals.
pub struct App {
    config: Arc<Config>,
    storage: Arc<dyn KeyValueStore>,
    preferences: Arc<RwLock<PreferencesStore>>,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        let storage = FileStore::open(config.storage_path())
            .with_context(|| format!("Failed to open storage at {:?}", config.storage_path()))?;

        Ok(Self::with_parts(config, Arc::new(storage)))
    }

    /// Assemble an application from explicit parts
    pub fn with_parts(config: Config, storage: Arc<dyn KeyValueStore>) -> Self {
        tracing::info!(
            "Application context ready with {} configured locations",
            config.locations.len()
        );

        let preferences = PreferencesStore::load_with_defaults(
            Arc::clone(&storage),
            config.settings.preference_defaults(),
        );
        let preferences = Arc::new(RwLock::new(preferences));

        Self {
            config: Arc::new(config),
            storage,
            preferences,
        }
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Shared persisted key-value store
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.storage)
    }

    /// The single preferences store shared by every caller
    pub fn preferences(&self) -> Arc<RwLock<PreferencesStore>> {
        Arc::clone(&self.preferences)
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{Language, PreferenceUpdate, TemperatureUnit};
    use crate::storage::{keys, MemoryStore};

    #[test]
    fn test_with_parts_shares_storage() {
        let storage = Arc::new(MemoryStore::new());
        let app = App::with_parts(Config::default(), storage.clone());

        assert!(matches!(storage.get(keys::PREFERENCES), Ok(Some(_))));
        assert_eq!(app.config().locations.len(), 3);
    }

    #[test]
    fn test_preference_updates_visible_to_later_callers() {
        let app = App::with_parts(Config::default(), Arc::new(MemoryStore::new()));

        app.preferences()
            .write()
            .update_preference(PreferenceUpdate::TemperatureUnit(TemperatureUnit::Fahrenheit));

        let prefs = app.preferences();
        assert_eq!(
            prefs.read().preferences().temperature_unit,
            TemperatureUnit::Fahrenheit
        );
        assert!(Arc::ptr_eq(&prefs, &app.preferences()));
    }

    #[test]
    fn test_first_run_preferences_follow_settings() {
        let mut config = Config::default();
        config.settings.language = Language::Id;
        let app = App::with_parts(config, Arc::new(MemoryStore::new()));

        assert_eq!(app.preferences().read().preferences().language, Language::Id);
    }
}
