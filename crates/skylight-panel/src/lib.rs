//! Panel (settings/location) controller for Skylight.

pub mod controller;

pub use controller::{PanelController, PanelSnapshot, PanelStatus, WeatherView};
