//! Weather dashboard state for Cuaca
//!
//! Fetches BMKG forecasts per location, caches them with an expiry in the
//! shared key-value store, and derives hourly display slots. Also owns the
//! user's location selection and ordering.

pub mod cache;
pub mod format;
pub mod location;
pub mod provider;
pub mod store;
pub mod time_slots;
pub mod types;

pub use cache::WeatherCache;
pub use location::LocationRegistry;
pub use provider::{BmkgProvider, ForecastProvider};
pub use store::WeatherStore;
pub use time_slots::{TimeSlot, SLOT_WINDOW_BATCHES};
pub use types::*;
