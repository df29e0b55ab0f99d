use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::preferences::{Language, TemperatureUnit, TimeFormat, UserPreferences, WindSpeedUnit};

const APP_DIR: &str = "cuaca";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A forecast location from static configuration.
///
/// `enabled` and `order` only seed first-run state; after that the user's
/// persisted choices win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    pub provinsi: String,
    pub kotkab: String,
    pub kecamatan: String,
    pub desa: String,
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub order: i32,
}

impl LocationConfig {
    /// Short label for logs and listings, e.g. "Gambir, Kota Adm. Jakarta Pusat".
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.desa, self.kotkab)
    }
}

/// Dashboard-wide settings shipped alongside the location list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSettings {
    pub max_enabled: u32,
    /// Minutes between refreshes
    pub refresh_interval: u32,
    pub temperature_unit: TemperatureUnit,
    pub wind_speed_unit: WindSpeedUnit,
    pub language: Language,
    pub time_format: TimeFormat,
}

impl LocationSettings {
    /// Preferences a first run starts from, and that a reset returns to.
    pub fn preference_defaults(&self) -> UserPreferences {
        let base = UserPreferences::default();
        UserPreferences {
            temperature_unit: self.temperature_unit,
            wind_speed_unit: self.wind_speed_unit,
            language: self.language,
            time_format: self.time_format,
            refresh_interval: i32::try_from(self.refresh_interval).unwrap_or(base.refresh_interval),
            max_locations: i32::try_from(self.max_enabled).unwrap_or(base.max_locations),
            ..base
        }
    }
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            max_enabled: 10,
            refresh_interval: 15,
            temperature_unit: TemperatureUnit::Celsius,
            wind_speed_unit: WindSpeedUnit::Kmh,
            language: Language::En,
            time_format: TimeFormat::TwentyFourHour,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Forecast endpoint; `lat` and `lon` are appended as query parameters
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://weather.bmkg.go.id/api/df/v1/forecast/coord".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched forecast stays fresh
    pub ttl_minutes: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_minutes: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Forecast API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Forecast cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub settings: LocationSettings,

    /// Baseline location list
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

fn default_locations() -> Vec<LocationConfig> {
    vec![
        LocationConfig {
            id: "31.71.01.1001".to_string(),
            provinsi: "DKI Jakarta".to_string(),
            kotkab: "Kota Adm. Jakarta Pusat".to_string(),
            kecamatan: "Gambir".to_string(),
            desa: "Gambir".to_string(),
            lat: -6.1754,
            lon: 106.8272,
            timezone: "Asia/Jakarta".to_string(),
            enabled: true,
            order: 1,
        },
        LocationConfig {
            id: "32.73.07.1001".to_string(),
            provinsi: "Jawa Barat".to_string(),
            kotkab: "Kota Bandung".to_string(),
            kecamatan: "Sumur Bandung".to_string(),
            desa: "Braga".to_string(),
            lat: -6.9175,
            lon: 107.6091,
            timezone: "Asia/Jakarta".to_string(),
            enabled: true,
            order: 2,
        },
        LocationConfig {
            id: "51.71.03.1002".to_string(),
            provinsi: "Bali".to_string(),
            kotkab: "Kota Denpasar".to_string(),
            kecamatan: "Denpasar Barat".to_string(),
            desa: "Dauh Puri".to_string(),
            lat: -8.6705,
            lon: 115.2126,
            timezone: "Asia/Makassar".to_string(),
            enabled: false,
            order: 3,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            config_dir,
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            settings: LocationSettings::default(),
            locations: default_locations(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing the default there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {:?}", path);
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        Self::check(config)
    }

    /// Like [`Config::load_validated`], for an explicit path
    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(path)?;
        Self::check(config)
    }

    fn check(config: Self) -> Result<(Self, ValidationResult)> {
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.timeout_secs == 0 {
            result.add_error("api.timeout_secs", "Request timeout must be greater than 0");
        }

        if self.cache.ttl_minutes == 0 {
            result.add_warning(
                "cache.ttl_minutes",
                "Forecast caching disabled (0 minutes)",
            );
        } else if self.cache.ttl_minutes > 1440 {
            result.add_warning(
                "cache.ttl_minutes",
                "Cached forecasts kept for more than 24 hours",
            );
        }

        if self.locations.is_empty() {
            result.add_warning("locations", "No locations configured");
        }

        let mut seen = HashSet::new();
        for (i, loc) in self.locations.iter().enumerate() {
            let field = format!("locations[{}]", i);

            if loc.id.trim().is_empty() {
                result.add_error(&field, "Location id must not be empty");
            } else if !seen.insert(loc.id.as_str()) {
                result.add_error(&field, format!("Duplicate location id: {}", loc.id));
            }

            if !(-90.0..=90.0).contains(&loc.lat) {
                result.add_error(&field, format!("Latitude out of range: {}", loc.lat));
            }
            if !(-180.0..=180.0).contains(&loc.lon) {
                result.add_error(&field, format!("Longitude out of range: {}", loc.lon));
            }
        }

        let enabled = self.locations.iter().filter(|l| l.enabled).count();
        if enabled > self.settings.max_enabled as usize {
            result.add_warning(
                "settings.maxEnabled",
                format!(
                    "{} locations enabled by default, more than maxEnabled ({})",
                    enabled, self.settings.max_enabled
                ),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the persisted key-value store
    pub fn storage_path(&self) -> PathBuf {
        self.config_dir.join("storage.json")
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }
}
