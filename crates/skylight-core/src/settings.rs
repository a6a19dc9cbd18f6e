//! User preferences replicated through the sync store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::keys;

/// Corner the widgets anchor to before the user drags them anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetAnchor {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl WidgetAnchor {
    fn from_value(value: Option<&Value>) -> Self {
        value
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// The single logical settings instance.
///
/// Persisted as one store key per field (the wire schema predates this
/// struct), written only by the panel, read by every context. Last writer
/// wins per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub widget_enabled: bool,
    pub time_enabled: bool,
    pub is_celsius: bool,
    pub anchor: WidgetAnchor,
    pub transparency: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            widget_enabled: true,
            time_enabled: true,
            is_celsius: false,
            anchor: WidgetAnchor::TopRight,
            transparency: 0.75,
        }
    }
}

impl Settings {
    /// Rebuild settings from raw store values, falling back to the
    /// per-field default for any key that is absent or mistyped. A store
    /// that was only ever partially written still resolves.
    pub fn from_values(values: &HashMap<String, Value>) -> Self {
        let defaults = Settings::default();
        Self {
            widget_enabled: values
                .get(keys::WIDGET_ENABLED)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.widget_enabled),
            time_enabled: values
                .get(keys::TIME_ENABLED)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.time_enabled),
            is_celsius: values
                .get(keys::IS_CELSIUS)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.is_celsius),
            anchor: WidgetAnchor::from_value(values.get(keys::WIDGET_ANCHOR)),
            transparency: values
                .get(keys::TRANSPARENCY)
                .and_then(Value::as_f64)
                .unwrap_or(defaults.transparency)
                .clamp(0.0, 1.0),
        }
    }

    /// The per-key representation written to the store. Transparency is
    /// clamped on the way out as well, so no context can persist an
    /// out-of-range value.
    pub fn to_entries(&self) -> Vec<(String, Value)> {
        vec![
            (keys::WIDGET_ENABLED.into(), Value::from(self.widget_enabled)),
            (keys::TIME_ENABLED.into(), Value::from(self.time_enabled)),
            (keys::IS_CELSIUS.into(), Value::from(self.is_celsius)),
            (
                keys::WIDGET_ANCHOR.into(),
                serde_json::to_value(self.anchor).unwrap_or(Value::Null),
            ),
            (
                keys::TRANSPARENCY.into(),
                Value::from(self.transparency.clamp(0.0, 1.0)),
            ),
        ]
    }

    /// Keys this struct is replicated across, in wire order.
    pub fn store_keys() -> [&'static str; 5] {
        [
            keys::WIDGET_ENABLED,
            keys::TIME_ENABLED,
            keys::IS_CELSIUS,
            keys::WIDGET_ANCHOR,
            keys::TRANSPARENCY,
        ]
    }
}

/// A persisted widget offset, written only at the end of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetPosition {
    pub left: i32,
    pub top: i32,
}
