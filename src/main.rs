use std::sync::Arc;

use anyhow::Result;
use cuaca_core::{Language, LocationConfig};
use cuaca_weather::format::{format_hour, format_temperature, format_wind_speed};
use cuaca_weather::{BmkgProvider, LocationRegistry, WeatherStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    cuaca_core::init()?;

    let app = cuaca_core::App::new()?;
    let config = app.shared_config();
    let prefs = app.preferences().read().preferences().clone();

    let registry = LocationRegistry::new(config.locations.clone(), app.storage());
    let enabled: Vec<LocationConfig> = registry.enabled_locations().into_iter().cloned().collect();

    let provider = Arc::new(BmkgProvider::new(&config.api)?);
    let store = Arc::new(WeatherStore::with_ttl_minutes(
        provider,
        app.storage(),
        config.cache.ttl_minutes,
    ));

    // Show cached forecasts first; only go to the network for the rest.
    let stale: Vec<LocationConfig> = enabled
        .iter()
        .filter(|loc| store.load_cached(&loc.id).is_none())
        .cloned()
        .collect();
    tracing::info!(
        "{} of {} locations served from cache",
        enabled.len() - stale.len(),
        enabled.len()
    );
    store.refresh_all(&stale).await;

    println!("Cuaca - weather for {} locations", enabled.len());
    for loc in &enabled {
        println!("\n{}", loc.display_name());

        if let Some(err) = store.error(&loc.id) {
            println!("  error: {}", err);
            continue;
        }

        for slot in store.available_slots(&loc.id) {
            let Some(record) = store.data_for_slot(&loc.id, &slot) else {
                continue;
            };
            let desc = match prefs.language {
                Language::Id => &record.weather_desc,
                Language::En => &record.weather_desc_en,
            };
            println!(
                "  {:>8}  {:>5}  {:>10}  {}",
                format_hour(slot.hour, prefs.time_format),
                format_temperature(record.t, prefs.temperature_unit),
                format_wind_speed(record.ws, prefs.wind_speed_unit),
                desc
            );
        }
    }

    // Graceful shutdown
    app.shutdown();

    Ok(())
}
