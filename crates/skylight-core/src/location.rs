//! Location records and the active-location precedence rule.
//!
//! Two variants live in the store: `lastLocation` (auto-detected,
//! coordinates only) and `customLocation` (user-searched, carries a label
//! and timezone). A present custom location always wins, regardless of
//! which record was written more recently.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A persisted location, in either stored variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl LocationRecord {
    /// The coordinates-only form written under `lastLocation` for
    /// consumers unaware of custom locations.
    pub fn coords_only(coordinates: Coordinates) -> Self {
        Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            label: None,
            timezone: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Where the active location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOrigin {
    Custom,
    LastKnown,
    Default,
}

/// The location record currently governing weather fetch and timezone
/// resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLocation {
    pub coordinates: Coordinates,
    pub label: Option<String>,
    /// Parsed IANA zone from the custom location, if any. `None` means
    /// the host's local timezone — never the weather API's `timezone=auto`
    /// echo.
    pub timezone: Option<Tz>,
    pub origin: LocationOrigin,
}

/// Hardcoded fallback when nothing is stored: New York City.
pub fn default_location() -> LocationRecord {
    LocationRecord {
        latitude: 40.7128,
        longitude: -74.0060,
        label: Some("New York".to_string()),
        timezone: None,
    }
}

/// Resolve the active location: custom > last-detected > default.
pub fn resolve_active(
    custom: Option<&LocationRecord>,
    last: Option<&LocationRecord>,
) -> ActiveLocation {
    if let Some(record) = custom {
        return ActiveLocation {
            coordinates: record.coordinates(),
            label: record.label.clone(),
            timezone: parse_timezone(record.timezone.as_deref()),
            origin: LocationOrigin::Custom,
        };
    }
    if let Some(record) = last {
        return ActiveLocation {
            coordinates: record.coordinates(),
            label: record.label.clone(),
            timezone: None,
            origin: LocationOrigin::LastKnown,
        };
    }
    let fallback = default_location();
    ActiveLocation {
        coordinates: fallback.coordinates(),
        label: fallback.label,
        timezone: None,
        origin: LocationOrigin::Default,
    }
}

fn parse_timezone(name: Option<&str>) -> Option<Tz> {
    let name = name?;
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!("Ignoring unparseable timezone '{}'", name);
            None
        }
    }
}
