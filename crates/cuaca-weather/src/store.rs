//! Live forecast state per location, backed by the expiring cache.
//!
//! Each location has independent loading, error, data and last-updated
//! state. A failed fetch records a message for that location and leaves its
//! previous data alone; nothing here fails the caller.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use cuaca_core::storage::KeyValueStore;
use cuaca_core::LocationConfig;

use crate::cache::WeatherCache;
use crate::provider::ForecastProvider;
use crate::time_slots::{self, TimeSlot};
use crate::types::{LocationForecast, WeatherError, WeatherRecord};

/// Shown when a provider error renders to an empty message.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch weather";

#[derive(Debug, Default)]
struct LocationState {
    loading: bool,
    error: Option<String>,
    data: Option<LocationForecast>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct WeatherStore {
    provider: Arc<dyn ForecastProvider>,
    cache: WeatherCache,
    state: Mutex<HashMap<String, LocationState>>,
}

/// Clears the loading flag however the fetch ends, including cancellation.
struct LoadingGuard<'a> {
    store: &'a WeatherStore,
    location_id: &'a str,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.with_state(self.location_id, |s| s.loading = false);
    }
}

impl WeatherStore {
    pub fn new(provider: Arc<dyn ForecastProvider>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_cache(provider, WeatherCache::new(storage))
    }

    pub fn with_cache(provider: Arc<dyn ForecastProvider>, cache: WeatherCache) -> Self {
        Self {
            provider,
            cache,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Store with the TTL taken from configuration, in minutes.
    pub fn with_ttl_minutes(
        provider: Arc<dyn ForecastProvider>,
        storage: Arc<dyn KeyValueStore>,
        ttl_minutes: u32,
    ) -> Self {
        let cache = WeatherCache::new(storage).with_ttl(Duration::minutes(i64::from(ttl_minutes)));
        Self::with_cache(provider, cache)
    }

    fn with_state<R>(&self, location_id: &str, f: impl FnOnce(&mut LocationState) -> R) -> R {
        let mut state = self.state.lock();
        f(state.entry(location_id.to_string()).or_default())
    }

    fn read_state<R>(&self, location_id: &str, f: impl FnOnce(&LocationState) -> R) -> Option<R> {
        self.state.lock().get(location_id).map(f)
    }

    /// Fetch and cache the forecast for one location.
    ///
    /// On success the first forecast entry becomes the location's data. On
    /// failure the error message is recorded and prior data is kept.
    pub async fn fetch_for_location(&self, location: &LocationConfig) {
        let location_id = location.id.as_str();

        self.with_state(location_id, |s| {
            s.loading = true;
            s.error = None;
        });
        let _loading = LoadingGuard {
            store: self,
            location_id,
        };

        let result = self
            .provider
            .get_forecast(location.lat, location.lon)
            .await
            .and_then(|response| response.data.into_iter().next().ok_or(WeatherError::NoForecast));

        match result {
            Ok(forecast) => {
                self.with_state(location_id, |s| {
                    s.data = Some(forecast.clone());
                    s.last_updated = Some(Utc::now());
                });
                self.persist(location_id, forecast).await;
                tracing::info!("Updated weather for {}", location.display_name());
            }
            Err(e) => {
                let message = match e.to_string() {
                    m if m.trim().is_empty() => FETCH_FAILED_MESSAGE.to_string(),
                    m => m,
                };
                tracing::error!("Failed to fetch weather for {}: {}", location.desa, message);
                self.with_state(location_id, |s| s.error = Some(message));
            }
        }
    }

    /// Write through to the cache on the blocking pool; file-backed stores do sync I/O.
    async fn persist(&self, location_id: &str, forecast: LocationForecast) {
        let cache = self.cache.clone();
        let id = location_id.to_string();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.store(&id, &forecast)).await {
            tracing::error!("Cache write for {} did not complete: {}", location_id, e);
        }
    }

    /// Fetch every location concurrently and wait for all of them to settle.
    pub async fn refresh_all(self: &Arc<Self>, locations: &[LocationConfig]) {
        tracing::info!("Refreshing weather for {} locations", locations.len());

        let mut tasks = JoinSet::new();
        for location in locations {
            let store = Arc::clone(self);
            let location = location.clone();
            tasks.spawn(async move { store.fetch_for_location(&location).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Weather refresh task failed: {}", e);
            }
        }
    }

    /// Promote a fresh cache entry into live state and return its data.
    pub fn load_cached(&self, location_id: &str) -> Option<LocationForecast> {
        let entry = self.cache.load(location_id)?;
        let data = entry.data?;

        self.with_state(location_id, |s| {
            s.data = Some(data.clone());
            s.last_updated = Some(entry.cached_at);
        });
        tracing::debug!("Loaded cached weather for {}", location_id);
        Some(data)
    }

    /// Remove all persisted forecasts. Live state is left as is.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn weather_data(&self, location_id: &str) -> Option<LocationForecast> {
        self.read_state(location_id, |s| s.data.clone()).flatten()
    }

    pub fn is_loading(&self, location_id: &str) -> bool {
        self.read_state(location_id, |s| s.loading).unwrap_or(false)
    }

    pub fn error(&self, location_id: &str) -> Option<String> {
        self.read_state(location_id, |s| s.error.clone())
            .flatten()
            .filter(|e| !e.is_empty())
    }

    pub fn last_updated(&self, location_id: &str) -> Option<DateTime<Utc>> {
        self.read_state(location_id, |s| s.last_updated).flatten()
    }

    pub fn available_slots(&self, location_id: &str) -> Vec<TimeSlot> {
        self.read_state(location_id, |s| {
            s.data.as_ref().map(time_slots::available_slots).unwrap_or_default()
        })
        .unwrap_or_default()
    }

    pub fn data_for_slot(&self, location_id: &str, slot: &TimeSlot) -> Option<WeatherRecord> {
        self.read_state(location_id, |s| {
            s.data
                .as_ref()
                .and_then(|data| time_slots::data_for_slot(data, slot))
                .cloned()
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::time_slots::tests::{forecast, record};
    use crate::types::{ForecastResponse, LocationInfo};
    use async_trait::async_trait;
    use cuaca_core::storage::{keys, MemoryStore};
    use std::collections::HashSet;
    use tokio::sync::Notify;

    fn location(id: &str, lat: f64) -> LocationConfig {
        LocationConfig {
            id: id.to_string(),
            provinsi: "DKI Jakarta".to_string(),
            kotkab: "Jakarta Pusat".to_string(),
            kecamatan: "Gambir".to_string(),
            desa: format!("Desa {}", id),
            lat,
            lon: 106.8,
            timezone: "Asia/Jakarta".to_string(),
            enabled: true,
            order: 0,
        }
    }

    fn response_with_temp(t: f64) -> ForecastResponse {
        ForecastResponse {
            location: LocationInfo::default(),
            data: vec![forecast(vec![vec![
                record("2026-01-11 06:00:00", t),
                record("2026-01-11 09:00:00", t + 2.0),
            ]])],
        }
    }

    /// Succeeds for every latitude except the ones listed in `failing`.
    struct FakeProvider {
        failing: Mutex<HashSet<u64>>,
        temp: f64,
    }

    impl FakeProvider {
        fn new(temp: f64) -> Self {
            Self {
                failing: Mutex::new(HashSet::new()),
                temp,
            }
        }

        fn fail_at(&self, lat: f64) {
            self.failing.lock().insert(lat.to_bits());
        }
    }

    #[async_trait]
    impl ForecastProvider for FakeProvider {
        async fn get_forecast(&self, lat: f64, _lon: f64) -> Result<ForecastResponse, WeatherError> {
            tokio::task::yield_now().await;
            if self.failing.lock().contains(&lat.to_bits()) {
                return Err(WeatherError::Provider("upstream timeout".into()));
            }
            Ok(response_with_temp(self.temp))
        }
    }

    struct EmptyProvider;

    #[async_trait]
    impl ForecastProvider for EmptyProvider {
        async fn get_forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastResponse, WeatherError> {
            Ok(ForecastResponse {
                location: LocationInfo::default(),
                data: vec![],
            })
        }
    }

    struct SilentFailure;

    #[async_trait]
    impl ForecastProvider for SilentFailure {
        async fn get_forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastResponse, WeatherError> {
            Err(WeatherError::Provider(String::new()))
        }
    }

    /// Blocks until released, to observe the in-flight state.
    struct GatedProvider {
        gate: Notify,
    }

    #[async_trait]
    impl ForecastProvider for GatedProvider {
        async fn get_forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastResponse, WeatherError> {
            self.gate.notified().await;
            Ok(response_with_temp(20.0))
        }
    }

    #[tokio::test]
    async fn test_fetch_success_populates_state_and_cache() {
        let storage = Arc::new(MemoryStore::new());
        let store = WeatherStore::new(Arc::new(FakeProvider::new(30.0)), storage.clone());
        let loc = location("a", -6.1);

        store.fetch_for_location(&loc).await;

        assert!(!store.is_loading("a"));
        assert!(store.error("a").is_none());
        assert!(store.last_updated("a").is_some());
        assert_eq!(store.weather_data("a").unwrap().batches[0].len(), 2);
        assert!(storage.get(&keys::cache_key("a")).unwrap().is_some());
    }

    /// Writes block the calling thread until `release` is called, or give up after 5s.
    #[derive(Default)]
    struct BlockingStore {
        inner: MemoryStore,
        entered: std::sync::atomic::AtomicBool,
        open: Mutex<bool>,
        opened: parking_lot::Condvar,
    }

    impl BlockingStore {
        fn release(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    impl KeyValueStore for BlockingStore {
        fn get(&self, key: &str) -> Result<Option<String>, cuaca_core::StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), cuaca_core::StorageError> {
            self.entered.store(true, std::sync::atomic::Ordering::SeqCst);
            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
            let mut open = self.open.lock();
            while !*open {
                if self.opened.wait_until(&mut open, deadline).timed_out() {
                    return Err(cuaca_core::StorageError::Unavailable("write timed out".into()));
                }
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), cuaca_core::StorageError> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>, cuaca_core::StorageError> {
            self.inner.keys()
        }
    }

    #[tokio::test]
    async fn test_cache_write_does_not_block_runtime() {
        // Single-threaded runtime: if the write ran inline, `release` could never run.
        let storage = Arc::new(BlockingStore::default());
        let store = WeatherStore::new(Arc::new(FakeProvider::new(30.0)), storage.clone());

        let release = async {
            while !storage.entered.load(std::sync::atomic::Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            storage.release();
        };
        let loc = location("a", 1.0);
        tokio::join!(store.fetch_for_location(&loc), release);

        assert!(storage.inner.get(&keys::cache_key("a")).unwrap().is_some());
        assert!(store.weather_data("a").is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let provider = Arc::new(FakeProvider::new(30.0));
        let store = WeatherStore::new(provider.clone(), Arc::new(MemoryStore::new()));
        let loc = location("a", -6.1);

        store.fetch_for_location(&loc).await;
        let before = store.weather_data("a").unwrap();
        let updated_before = store.last_updated("a");

        provider.fail_at(-6.1);
        store.fetch_for_location(&loc).await;

        assert_eq!(store.error("a").as_deref(), Some("upstream timeout"));
        assert_eq!(store.weather_data("a").unwrap(), before);
        assert_eq!(store.last_updated("a"), updated_before);
        assert!(!store.is_loading("a"));
    }

    #[tokio::test]
    async fn test_next_fetch_clears_error() {
        let provider = Arc::new(FakeProvider::new(30.0));
        provider.fail_at(-6.1);
        let store = WeatherStore::new(provider.clone(), Arc::new(MemoryStore::new()));
        let loc = location("a", -6.1);

        store.fetch_for_location(&loc).await;
        assert!(store.error("a").is_some());

        provider.failing.lock().clear();
        store.fetch_for_location(&loc).await;
        assert!(store.error("a").is_none());
        assert!(store.weather_data("a").is_some());
    }

    #[tokio::test]
    async fn test_empty_message_uses_fallback() {
        let store = WeatherStore::new(Arc::new(SilentFailure), Arc::new(MemoryStore::new()));
        store.fetch_for_location(&location("a", 1.0)).await;
        assert_eq!(store.error("a").as_deref(), Some(FETCH_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let store = WeatherStore::new(Arc::new(EmptyProvider), Arc::new(MemoryStore::new()));
        store.fetch_for_location(&location("a", 1.0)).await;
        assert!(store.weather_data("a").is_none());
        assert!(store.error("a").unwrap().contains("no data"));
    }

    #[tokio::test]
    async fn test_loading_flag_while_in_flight() {
        let provider = Arc::new(GatedProvider { gate: Notify::new() });
        let store = Arc::new(WeatherStore::new(provider.clone(), Arc::new(MemoryStore::new())));

        let handle = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.fetch_for_location(&location("a", 1.0)).await }
        });

        for _ in 0..100 {
            if store.is_loading("a") {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(store.is_loading("a"));

        provider.gate.notify_one();
        handle.await.unwrap();
        assert!(!store.is_loading("a"));
        assert!(store.weather_data("a").is_some());
    }

    #[tokio::test]
    async fn test_refresh_all_settles_every_location() {
        let provider = Arc::new(FakeProvider::new(30.0));
        let store = Arc::new(WeatherStore::new(provider.clone(), Arc::new(MemoryStore::new())));
        let locations = vec![location("a", 1.0), location("b", 2.0), location("c", 3.0)];

        store.refresh_all(&locations).await;
        let prior_b = store.weather_data("b").unwrap();

        provider.fail_at(2.0);
        store.refresh_all(&locations).await;

        for id in ["a", "c"] {
            assert!(store.weather_data(id).is_some());
            assert!(store.last_updated(id).is_some());
            assert!(store.error(id).is_none());
        }
        assert!(!store.error("b").unwrap().is_empty());
        assert_eq!(store.weather_data("b").unwrap(), prior_b);
        assert!(locations.iter().all(|l| !store.is_loading(&l.id)));
    }

    #[tokio::test]
    async fn test_load_cached_promotes_entry() {
        let storage = Arc::new(MemoryStore::new());
        let first = WeatherStore::new(Arc::new(FakeProvider::new(28.0)), storage.clone());
        first.fetch_for_location(&location("a", 1.0)).await;

        let second = WeatherStore::new(Arc::new(FakeProvider::new(0.0)), storage.clone());
        assert!(second.weather_data("a").is_none());

        let loaded = second.load_cached("a").unwrap();
        assert_eq!(Some(loaded), first.weather_data("a"));
        assert!(second.last_updated("a").is_some());
        assert!(second.load_cached("missing").is_none());
    }

    #[tokio::test]
    async fn test_expired_cache_not_promoted() {
        let storage = Arc::new(MemoryStore::new());
        let cache = WeatherCache::new(storage.clone()).with_ttl(Duration::minutes(-1));
        let store = WeatherStore::with_cache(Arc::new(FakeProvider::new(28.0)), cache);
        store.fetch_for_location(&location("a", 1.0)).await;

        let fresh = WeatherStore::new(Arc::new(FakeProvider::new(28.0)), storage.clone());
        assert!(fresh.load_cached("a").is_none());
        assert!(fresh.weather_data("a").is_none());
        assert!(storage.get(&keys::cache_key("a")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_live_state() {
        let storage = Arc::new(MemoryStore::new());
        let store = WeatherStore::new(Arc::new(FakeProvider::new(28.0)), storage.clone());
        store.fetch_for_location(&location("a", 1.0)).await;

        store.clear_cache();
        assert!(storage.get(&keys::cache_key("a")).unwrap().is_none());
        assert!(store.weather_data("a").is_some());
    }

    #[tokio::test]
    async fn test_slot_accessors_delegate() {
        let store = WeatherStore::new(Arc::new(FakeProvider::new(25.0)), Arc::new(MemoryStore::new()));
        assert!(store.available_slots("a").is_empty());

        store.fetch_for_location(&location("a", 1.0)).await;
        let slots = store.available_slots("a");
        assert_eq!(slots, vec![TimeSlot::new(6), TimeSlot::new(9)]);
        assert_eq!(store.data_for_slot("a", &slots[1]).unwrap().t, 27.0);
        assert!(store.data_for_slot("a", &TimeSlot::new(15)).is_none());
    }
}
