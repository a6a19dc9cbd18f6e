//! System geolocation behind a source trait.
//!
//! The panel asks a [`GeoSource`] once on first open when no location is
//! stored. Denial or unavailability is an expected outcome — callers fall
//! back to the default location and surface the miss only in the panel
//! status line.

use std::future::Future;

use skylight_core::Coordinates;

/// Geolocation errors.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "Location access denied; using default location",
            LocationError::ServiceUnavailable => {
                "Location unavailable; using default location"
            }
            LocationError::Timeout => "Location request timed out; using default location",
            LocationError::Other(_) => "Could not detect location; using default location",
        }
    }
}

/// A provider of the device's current coordinates.
pub trait GeoSource: Send + Sync {
    fn current(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send;
}

/// The host platform's geolocation service. No platform backend is wired
/// up yet, so every request reports unavailability and the precedence
/// chain falls through to stored or default locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocator;

impl GeoSource for SystemLocator {
    fn current(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        async {
            tracing::debug!("System geolocation requested; no backend available");
            Err(LocationError::ServiceUnavailable)
        }
    }
}

/// A source that always reports the same coordinates. Useful for tests
/// and for hosts that pin their location.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator(pub Coordinates);

impl GeoSource for FixedLocator {
    fn current(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        let coordinates = self.0;
        async move { Ok(coordinates) }
    }
}
