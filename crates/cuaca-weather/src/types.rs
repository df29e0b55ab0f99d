use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly forecast record as published by BMKG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub utc_datetime: String,
    /// Wall-clock time at the location, e.g. "2026-01-11 12:00:00"
    pub local_datetime: String,
    /// Temperature (Celsius)
    pub t: f64,
    /// Cloud cover (percent)
    #[serde(default)]
    pub tcc: f64,
    /// Precipitation (mm)
    #[serde(default)]
    pub tp: f64,
    pub weather: i32,
    #[serde(default)]
    pub weather_desc: String,
    #[serde(default)]
    pub weather_desc_en: String,
    #[serde(default)]
    pub wd_deg: f64,
    /// Wind direction (N, SW, ...)
    #[serde(default)]
    pub wd: String,
    #[serde(default)]
    pub wd_to: String,
    /// Wind speed (km/h)
    #[serde(default)]
    pub ws: f64,
    /// Humidity (percent)
    #[serde(default)]
    pub hu: f64,
    /// Visibility (meters)
    #[serde(default)]
    pub vs: f64,
    #[serde(default)]
    pub vs_text: String,
    #[serde(default)]
    pub time_index: String,
    #[serde(default)]
    pub analysis_date: String,
    #[serde(default)]
    pub image: String,
}

/// Administrative metadata for a forecast location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub adm1: String,
    #[serde(default)]
    pub adm2: String,
    #[serde(default)]
    pub adm3: String,
    #[serde(default)]
    pub adm4: String,
    #[serde(default)]
    pub provinsi: String,
    #[serde(default)]
    pub kotkab: String,
    #[serde(default)]
    pub kecamatan: String,
    #[serde(default)]
    pub desa: String,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Forecast for one location: metadata plus daily batches of hourly records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationForecast {
    #[serde(rename = "lokasi")]
    pub location: LocationInfo,
    /// Daily batches, each ordered by time
    #[serde(rename = "cuaca", default)]
    pub batches: Vec<Vec<WeatherRecord>>,
}

/// Provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(rename = "lokasi", default)]
    pub location: LocationInfo,
    #[serde(default)]
    pub data: Vec<LocationForecast>,
}

/// A forecast as persisted in the cache, with its freshness window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedForecast {
    pub data: Option<LocationForecast>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedForecast {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Provider(String),
    #[error("Forecast response contained no data")]
    NoForecast,
}
