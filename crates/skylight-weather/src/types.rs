//! Weather domain types: WMO condition mapping, display glyphs, and the
//! cache-warmed snapshot that travels through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skylight_core::store::keys;
use skylight_core::{StoreError, SyncStore};

/// Glyph rendered when a fetch fails and nothing better is known.
pub const PLACEHOLDER_GLYPH: &str = "🌤️";

/// Weather condition categories mapped from WMO codes.
/// See: https://open-meteo.com/en/docs#weathervariables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    #[default]
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Map a WMO weather code to a condition. Unknown codes land on
    /// `PartlyCloudy`, the neutral glyph.
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::PartlyCloudy,
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Overlay display glyph.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "🌤️",
            Self::Cloudy => "☁️",
            Self::Fog => "🌫️",
            Self::Drizzle => "🌦️",
            Self::Rain => "🌧️",
            Self::HeavyRain => "⛈️",
            Self::Snow => "❄️",
            Self::Sleet => "🌨️",
            Self::Thunderstorm => "⛈️",
        }
    }
}

/// Current conditions as returned by the forecast endpoint. Temperature
/// is always Celsius upstream; unit conversion is display-side only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub weather_code: i32,
}

impl CurrentConditions {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code)
    }
}

/// The "current weather" value cached in the store under
/// `lastWeatherData`. Both the background refresher and any overlay's own
/// fetch overwrite it; last write wins, which is fine since both fetch
/// the same upstream truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub weather_code: i32,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn from_conditions(conditions: CurrentConditions, fetched_at: DateTime<Utc>) -> Self {
        Self {
            temperature_c: conditions.temperature_c,
            weather_code: conditions.weather_code,
            fetched_at,
        }
    }

    pub fn conditions(&self) -> CurrentConditions {
        CurrentConditions {
            temperature_c: self.temperature_c,
            weather_code: self.weather_code,
        }
    }

    /// Read the cached snapshot, treating a damaged record as absent.
    pub fn load(store: &SyncStore) -> Result<Option<Self>, StoreError> {
        let Some(value) = store.get_one(keys::LAST_WEATHER_DATA)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!("Ignoring malformed cached weather: {}", e);
                Ok(None)
            }
        }
    }

    /// Cache this snapshot in the store.
    pub fn save(&self, store: &SyncStore) -> Result<(), StoreError> {
        let value = serde_json::to_value(self)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        store.set_one(keys::LAST_WEATHER_DATA, value)
    }
}

/// Format a Celsius reading in the user's unit, rounded: "22°C" / "72°F".
pub fn format_temperature(celsius: f64, is_celsius: bool) -> String {
    if is_celsius {
        format!("{}°C", celsius.round() as i64)
    } else {
        format!("{}°F", (celsius * 9.0 / 5.0 + 32.0).round() as i64)
    }
}
