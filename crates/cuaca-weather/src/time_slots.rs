//! Hourly display slots derived from irregular forecast records.
//!
//! BMKG publishes records at uneven intervals (usually every three hours),
//! so slots are built from whatever records exist rather than a fixed grid.

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{LocationForecast, WeatherRecord};

/// Number of leading daily batches that feed the slot view: today and the
/// next day, enough for a rolling near-term window.
pub const SLOT_WINDOW_BATCHES: usize = 2;

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub hour: u32,
    pub label: String,
}

impl TimeSlot {
    pub fn new(hour: u32) -> Self {
        Self {
            hour,
            label: format!("{:02}:00", hour),
        }
    }
}

/// Hour of day from a record's local timestamp, or `None` if it doesn't parse.
///
/// RFC 3339 values yield the wall-clock hour in their own offset.
pub fn local_hour(local_datetime: &str) -> Option<u32> {
    let s = local_datetime.trim();

    for fmt in LOCAL_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.hour());
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.hour())
}

/// Records inside the slot window, in order: the first batch followed by the second.
pub fn slot_window(batches: &[Vec<WeatherRecord>]) -> impl Iterator<Item = &WeatherRecord> {
    batches.iter().take(SLOT_WINDOW_BATCHES).flatten()
}

/// One slot per record, in record order. Hours repeated across days are kept.
pub fn generate_time_slots<'a, I>(records: I) -> Vec<TimeSlot>
where
    I: IntoIterator<Item = &'a WeatherRecord>,
{
    records
        .into_iter()
        .filter_map(|record| match local_hour(&record.local_datetime) {
            Some(hour) => Some(TimeSlot::new(hour)),
            None => {
                tracing::debug!("Skipping record with bad timestamp: {}", record.local_datetime);
                None
            }
        })
        .collect()
}

/// First record whose local hour is `hour`.
pub fn find_weather_for_hour<'a, I>(records: I, hour: u32) -> Option<&'a WeatherRecord>
where
    I: IntoIterator<Item = &'a WeatherRecord>,
{
    records
        .into_iter()
        .find(|record| local_hour(&record.local_datetime) == Some(hour))
}

/// Distinct hours with data, ascending.
pub fn available_hours<'a, I>(records: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a WeatherRecord>,
{
    records
        .into_iter()
        .filter_map(|record| local_hour(&record.local_datetime))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Slots for a forecast over the near-term window.
pub fn available_slots(forecast: &LocationForecast) -> Vec<TimeSlot> {
    generate_time_slots(slot_window(&forecast.batches))
}

/// Record for `slot` within the near-term window.
pub fn data_for_slot<'a>(forecast: &'a LocationForecast, slot: &TimeSlot) -> Option<&'a WeatherRecord> {
    find_weather_for_hour(slot_window(&forecast.batches), slot.hour)
}
