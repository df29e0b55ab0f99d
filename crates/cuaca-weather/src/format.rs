//! Display helpers for forecast values.

use chrono::NaiveDateTime;

use cuaca_core::{TemperatureUnit, TimeFormat, WindSpeedUnit};

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_local(datetime: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(datetime.trim(), LOCAL_FORMAT).ok()
}

/// "2026-01-11 12:00:00" -> "12:00". Empty when there is no time part.
pub fn format_time(datetime: &str) -> String {
    datetime
        .split(' ')
        .nth(1)
        .map(|time| time.chars().take(5).collect())
        .unwrap_or_default()
}

/// "2026-01-11 12:00:00" -> "Sun, Jan 11". Unparseable input is returned unchanged.
pub fn format_date(datetime: &str) -> String {
    parse_local(datetime)
        .map(|dt| dt.format("%a, %b %-d").to_string())
        .unwrap_or_else(|| datetime.to_string())
}

/// "2026-01-11 12:00:00" -> "11 Jan, 12:00"
pub fn format_date_time(datetime: &str) -> String {
    parse_local(datetime)
        .map(|dt| dt.format("%-d %b, %H:%M").to_string())
        .unwrap_or_else(|| datetime.to_string())
}

/// Slot hour in the user's clock format.
pub fn format_hour(hour: u32, format: TimeFormat) -> String {
    match format {
        TimeFormat::TwentyFourHour => format!("{:02}:00", hour),
        TimeFormat::TwelveHour => {
            let suffix = if hour < 12 { "AM" } else { "PM" };
            let h = match hour % 12 {
                0 => 12,
                h => h,
            };
            format!("{} {}", h, suffix)
        }
    }
}

pub fn day_label(index: usize) -> String {
    match index {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2 => "Day after Tomorrow".to_string(),
        n => format!("Day {}", n + 1),
    }
}

/// Arrow rotation for a wind bearing; the arrow points where the wind goes.
pub fn wind_rotation(degree: f64) -> f64 {
    degree + 180.0
}

pub fn wind_arrow(direction: &str) -> &'static str {
    match direction {
        "N" => "arrow_up",
        "NE" => "arrow_up_right",
        "E" => "arrow_right",
        "SE" => "arrow_down_right",
        "S" => "arrow_down",
        "SW" => "arrow_down_left",
        "W" => "arrow_left",
        "NW" => "arrow_up_left",
        _ => "circle",
    }
}

/// Visibility in meters as kilometers.
pub fn format_visibility(meters: f64) -> String {
    if meters >= 10_000.0 {
        "> 10 km".to_string()
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Empty for no precipitation.
pub fn format_precipitation(mm: f64) -> String {
    if mm == 0.0 {
        String::new()
    } else {
        format!("{} mm", mm)
    }
}

pub fn convert_temperature(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    }
}

pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    let symbol = match unit {
        TemperatureUnit::Celsius => "°C",
        TemperatureUnit::Fahrenheit => "°F",
    };
    format!("{:.0}{}", convert_temperature(celsius, unit), symbol)
}

pub fn convert_wind_speed(kmh: f64, unit: WindSpeedUnit) -> f64 {
    match unit {
        WindSpeedUnit::Kmh => kmh,
        WindSpeedUnit::Mph => kmh * 0.621_371,
        WindSpeedUnit::Ms => kmh / 3.6,
    }
}

pub fn format_wind_speed(kmh: f64, unit: WindSpeedUnit) -> String {
    let label = match unit {
        WindSpeedUnit::Kmh => "km/h",
        WindSpeedUnit::Mph => "mph",
        WindSpeedUnit::Ms => "m/s",
    };
    format!("{:.1} {}", convert_wind_speed(kmh, unit), label)
}
