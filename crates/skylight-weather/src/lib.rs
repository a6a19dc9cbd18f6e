//! Weather and geocoding clients for Skylight.
//!
//! Thin wrappers over the Open-Meteo forecast and geocoding endpoints,
//! plus the WMO condition mapping and the snapshot type cached in the
//! sync store.

pub mod geocode;
pub mod locate;
pub mod provider;
pub mod types;

pub use geocode::{GeocodeClient, GeocodeError, GeocodeMatch};
pub use locate::{FixedLocator, GeoSource, LocationError, SystemLocator};
pub use provider::{ForecastClient, WeatherError};
pub use types::{
    format_temperature, CurrentConditions, WeatherCondition, WeatherSnapshot, PLACEHOLDER_GLYPH,
};
