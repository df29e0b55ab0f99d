//! User-selected forecast locations and their display order.
//!
//! The configured list is static. Which of those locations are enabled, and
//! in what order they are shown, are two separately persisted id lists
//! (`weather:enabled` and `weather:order`). Missing or corrupt lists are
//! seeded from the configuration's `enabled`/`order` fields.

use std::collections::HashSet;
use std::sync::Arc;

use cuaca_core::storage::{keys, load_json, save_json, KeyValueStore};
use cuaca_core::LocationConfig;

pub struct LocationRegistry {
    store: Arc<dyn KeyValueStore>,
    locations: Vec<LocationConfig>,
    enabled_ids: Vec<String>,
    order: Vec<String>,
}

/// Ids of locations enabled in configuration, in configuration order.
pub fn default_enabled_ids(locations: &[LocationConfig]) -> Vec<String> {
    locations
        .iter()
        .filter(|loc| loc.enabled)
        .map(|loc| loc.id.clone())
        .collect()
}

/// Enabled ids sorted by the configured `order` field.
pub fn default_order(locations: &[LocationConfig]) -> Vec<String> {
    let mut enabled: Vec<&LocationConfig> = locations.iter().filter(|loc| loc.enabled).collect();
    enabled.sort_by_key(|loc| loc.order);
    enabled.into_iter().map(|loc| loc.id.clone()).collect()
}

impl LocationRegistry {
    pub fn new(locations: Vec<LocationConfig>, store: Arc<dyn KeyValueStore>) -> Self {
        let enabled_ids = load_or_seed(store.as_ref(), keys::ENABLED, || {
            default_enabled_ids(&locations)
        });
        let order = load_or_seed(store.as_ref(), keys::ORDER, || default_order(&locations));

        let mut registry = Self {
            store,
            locations,
            enabled_ids,
            order,
        };
        registry.normalize();

        tracing::debug!(
            "Location registry: {} configured, {} enabled",
            registry.locations.len(),
            registry.enabled_ids.len()
        );
        registry
    }

    /// Drop duplicate ids, and order entries that are not enabled.
    ///
    /// The two lists are persisted separately, so either may have been reseeded
    /// or edited without the other.
    fn normalize(&mut self) {
        let enabled_before = self.enabled_ids.len();
        let order_before = self.order.len();

        let mut seen = HashSet::new();
        self.enabled_ids.retain(|id| seen.insert(id.clone()));

        let mut seen = HashSet::new();
        let enabled: HashSet<&String> = self.enabled_ids.iter().collect();
        self.order
            .retain(|id| enabled.contains(id) && seen.insert(id.clone()));

        if self.enabled_ids.len() != enabled_before {
            tracing::warn!("Removed duplicate enabled location ids");
            self.persist_enabled();
        }
        if self.order.len() != order_before {
            tracing::warn!(
                "Removed {} stale entries from location order",
                order_before - self.order.len()
            );
            self.persist_order();
        }
    }

    pub fn all_locations(&self) -> &[LocationConfig] {
        &self.locations
    }

    pub fn location(&self, id: &str) -> Option<&LocationConfig> {
        self.locations.iter().find(|loc| loc.id == id)
    }

    pub fn enabled_ids(&self) -> &[String] {
        &self.enabled_ids
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.enabled_ids.iter().any(|e| e == id)
    }

    pub fn is_first(&self, id: &str) -> bool {
        self.order.first().is_some_and(|first| first == id)
    }

    pub fn is_last(&self, id: &str) -> bool {
        self.order.last().is_some_and(|last| last == id)
    }

    /// Enabled locations in display order.
    ///
    /// Enabled ids absent from the order list come last, keeping their
    /// configuration order.
    pub fn enabled_locations(&self) -> Vec<&LocationConfig> {
        let mut enabled: Vec<&LocationConfig> = self
            .locations
            .iter()
            .filter(|loc| self.is_enabled(&loc.id))
            .collect();

        enabled.sort_by_key(|loc| {
            self.order
                .iter()
                .position(|id| *id == loc.id)
                .unwrap_or(usize::MAX)
        });
        enabled
    }

    /// Disable an enabled location, or enable it at the end of the order.
    ///
    /// Ids that are not configured can be disabled but never enabled.
    pub fn toggle(&mut self, id: &str) {
        if self.is_enabled(id) {
            self.enabled_ids.retain(|e| e != id);
            self.order.retain(|e| e != id);
            tracing::info!("Disabled location {}", id);
        } else {
            if self.location(id).is_none() {
                tracing::debug!("Ignoring toggle for unknown location {}", id);
                return;
            }
            self.enabled_ids.push(id.to_string());
            self.order.retain(|e| e != id);
            self.order.push(id.to_string());
            tracing::info!("Enabled location {}", id);
        }

        self.persist_enabled();
        self.persist_order();
    }

    /// Swap with the previous location in the order. No-op at the top.
    pub fn move_up(&mut self, id: &str) {
        match self.order.iter().position(|e| e == id) {
            Some(index) if index > 0 => {
                self.order.swap(index - 1, index);
                self.persist_order();
            }
            _ => {}
        }
    }

    /// Swap with the next location in the order. No-op at the bottom.
    pub fn move_down(&mut self, id: &str) {
        match self.order.iter().position(|e| e == id) {
            Some(index) if index + 1 < self.order.len() => {
                self.order.swap(index, index + 1);
                self.persist_order();
            }
            _ => {}
        }
    }

    fn persist_enabled(&self) {
        save_json(self.store.as_ref(), keys::ENABLED, &self.enabled_ids);
    }

    fn persist_order(&self) {
        save_json(self.store.as_ref(), keys::ORDER, &self.order);
    }
}

fn load_or_seed(
    store: &dyn KeyValueStore,
    key: &str,
    seed: impl FnOnce() -> Vec<String>,
) -> Vec<String> {
    if let Some(ids) = load_json(store, key) {
        return ids;
    }

    let ids = seed();
    save_json(store, key, &ids);
    ids
}
