//! Display preferences, persisted under `weather:preferences`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::{keys, load_json, save_json, KeyValueStore};

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Wind speed unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindSpeedUnit {
    #[default]
    Kmh,
    Mph,
    Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Id,
    #[default]
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub temperature_unit: TemperatureUnit,
    pub wind_speed_unit: WindSpeedUnit,
    pub language: Language,
    pub time_format: TimeFormat,
    pub auto_refresh: bool,
    /// Minutes between automatic refreshes. Not range-checked.
    pub refresh_interval: i32,
    pub max_locations: i32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Celsius,
            wind_speed_unit: WindSpeedUnit::Kmh,
            language: Language::En,
            time_format: TimeFormat::TwentyFourHour,
            auto_refresh: true,
            refresh_interval: 15,
            max_locations: 10,
        }
    }
}

/// A single-field change to [`UserPreferences`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceUpdate {
    TemperatureUnit(TemperatureUnit),
    WindSpeedUnit(WindSpeedUnit),
    Language(Language),
    TimeFormat(TimeFormat),
    AutoRefresh(bool),
    RefreshInterval(i32),
    MaxLocations(i32),
}

impl UserPreferences {
    pub fn apply(&mut self, update: PreferenceUpdate) {
        match update {
            PreferenceUpdate::TemperatureUnit(v) => self.temperature_unit = v,
            PreferenceUpdate::WindSpeedUnit(v) => self.wind_speed_unit = v,
            PreferenceUpdate::Language(v) => self.language = v,
            PreferenceUpdate::TimeFormat(v) => self.time_format = v,
            PreferenceUpdate::AutoRefresh(v) => self.auto_refresh = v,
            PreferenceUpdate::RefreshInterval(v) => self.refresh_interval = v,
            PreferenceUpdate::MaxLocations(v) => self.max_locations = v,
        }
    }
}

/// Owns the current preferences and keeps them in sync with storage.
pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
    preferences: UserPreferences,
    defaults: UserPreferences,
}

impl PreferencesStore {
    /// Load stored preferences, falling back to (and persisting) the defaults.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_defaults(store, UserPreferences::default())
    }

    /// Like [`load`](Self::load), with deployment-supplied defaults used for
    /// first run and for [`reset`](Self::reset).
    pub fn load_with_defaults(store: Arc<dyn KeyValueStore>, defaults: UserPreferences) -> Self {
        let preferences = match load_json(store.as_ref(), keys::PREFERENCES) {
            Some(prefs) => prefs,
            None => {
                save_json(store.as_ref(), keys::PREFERENCES, &defaults);
                defaults.clone()
            }
        };

        Self {
            store,
            preferences,
            defaults,
        }
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    /// Replace one field and persist the whole record.
    pub fn update_preference(&mut self, update: PreferenceUpdate) {
        tracing::debug!("Updating preference: {:?}", update);
        self.preferences.apply(update);
        self.persist();
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) {
        self.preferences = self.defaults.clone();
        self.persist();
    }

    fn persist(&self) {
        save_json(self.store.as_ref(), keys::PREFERENCES, &self.preferences);
    }
}
