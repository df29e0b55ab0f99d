//! Expiring forecast cache on top of the shared key-value store.

use chrono::{Duration, Utc};
use std::sync::Arc;

use cuaca_core::storage::{keys, load_json, save_json, KeyValueStore};

use crate::types::{CachedForecast, LocationForecast};

/// Default freshness window for a fetched forecast.
pub const DEFAULT_TTL_MINUTES: i64 = 10;

/// Per-location forecast cache stored under `weather:cache:<id>`.
#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write `data` with a fresh expiry. Failures are logged only.
    pub fn store(&self, location_id: &str, data: &LocationForecast) {
        let now = Utc::now();
        let entry = CachedForecast {
            data: Some(data.clone()),
            cached_at: now,
            expires_at: now + self.ttl,
        };

        if save_json(self.store.as_ref(), &keys::cache_key(location_id), &entry) {
            tracing::debug!("Cached forecast for {} until {}", location_id, entry.expires_at);
        }
    }

    /// Fresh entry for `location_id`, if any.
    ///
    /// Expired entries and entries without a payload are deleted. Unreadable
    /// entries are reported as missing and left in place.
    pub fn load(&self, location_id: &str) -> Option<CachedForecast> {
        let key = keys::cache_key(location_id);
        let entry: CachedForecast = load_json(self.store.as_ref(), &key)?;

        if !entry.is_expired_at(Utc::now()) && entry.data.is_some() {
            return Some(entry);
        }

        tracing::debug!("Dropping stale cache entry {}", key);
        if let Err(e) = self.store.remove(&key) {
            tracing::warn!("Failed to remove expired cache entry {}: {}", key, e);
        }
        None
    }

    /// Delete every cache entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let stored = match self.store.keys() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to clear cache: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in stored.iter().filter(|k| k.starts_with(keys::CACHE_PREFIX)) {
            match self.store.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove cache entry {}: {}", key, e),
            }
        }

        tracing::info!("Cleared {} cached forecasts", removed);
        removed
    }
}
