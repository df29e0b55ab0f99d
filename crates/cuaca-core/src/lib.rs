pub mod app;
pub mod config;
pub mod error;
pub mod preferences;
pub mod storage;

pub use app::App;
pub use config::{ApiConfig, CacheConfig, Config, LocationConfig, LocationSettings, ValidationResult};
pub use error::{AppError, ConfigError, StorageError};
pub use preferences::{
    Language, PreferenceUpdate, PreferencesStore, TemperatureUnit, TimeFormat, UserPreferences,
    WindSpeedUnit,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Cuaca core initialized");
    Ok(())
}
