//! The host-page boundary.
//!
//! Everything the overlay does to the page goes through
//! [`OverlaySurface`]; the lifecycle logic never touches a real DOM.
//! Calls against a kind that is not currently mounted are no-ops by
//! contract — a refresh task finishing after its widget was removed must
//! not be an error.

use std::time::Duration;

use parking_lot::Mutex;
use skylight_core::store::keys;
use skylight_weather::{format_temperature, CurrentConditions, PLACEHOLDER_GLYPH};
use tokio::sync::Notify;

use crate::viewport::{PixelPoint, WidgetFrame};

/// The two overlay widget kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Weather,
    Time,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 2] = [WidgetKind::Weather, WidgetKind::Time];

    /// Store key this kind's dragged position persists under.
    pub fn position_key(self) -> &'static str {
        match self {
            WidgetKind::Weather => keys::WEATHER_POSITION,
            WidgetKind::Time => keys::TIME_POSITION,
        }
    }
}

/// What a widget currently displays.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetContent {
    Weather { glyph: String, temperature: String },
    /// Degraded placeholder after a failed fetch — never stale data
    /// presented as fresh.
    WeatherUnavailable,
    Clock { time: String },
}

impl WidgetContent {
    pub fn from_conditions(conditions: CurrentConditions, is_celsius: bool) -> Self {
        WidgetContent::Weather {
            glyph: conditions.condition().glyph().to_string(),
            temperature: format_temperature(conditions.temperature_c, is_celsius),
        }
    }

    pub fn unavailable() -> Self {
        WidgetContent::WeatherUnavailable
    }

    /// Glyph shown for this content, if any.
    pub fn glyph(&self) -> Option<&str> {
        match self {
            WidgetContent::Weather { glyph, .. } => Some(glyph),
            WidgetContent::WeatherUnavailable => Some(PLACEHOLDER_GLYPH),
            WidgetContent::Clock { .. } => None,
        }
    }
}

/// Host-page operations the overlay needs.
pub trait OverlaySurface: Send + Sync {
    fn mount(&self, kind: WidgetKind, frame: WidgetFrame);
    fn unmount(&self, kind: WidgetKind);
    fn set_content(&self, kind: WidgetKind, content: WidgetContent);
    fn set_position(&self, kind: WidgetKind, position: PixelPoint);
    fn set_opacity(&self, kind: WidgetKind, opacity: f64);
}

/// A surface that renders to the log. Used by the demo host, where there
/// is no page to draw on.
#[derive(Debug, Default)]
pub struct TracingSurface;

impl OverlaySurface for TracingSurface {
    fn mount(&self, kind: WidgetKind, frame: WidgetFrame) {
        tracing::info!(?kind, x = frame.position.x, y = frame.position.y, "widget mounted");
    }

    fn unmount(&self, kind: WidgetKind) {
        tracing::info!(?kind, "widget removed");
    }

    fn set_content(&self, kind: WidgetKind, content: WidgetContent) {
        match content {
            WidgetContent::Weather { glyph, temperature } => {
                tracing::info!(?kind, "{} {}", glyph, temperature);
            }
            WidgetContent::WeatherUnavailable => {
                tracing::info!(?kind, "{}", PLACEHOLDER_GLYPH);
            }
            WidgetContent::Clock { time } => tracing::debug!(?kind, "{}", time),
        }
    }

    fn set_position(&self, kind: WidgetKind, position: PixelPoint) {
        tracing::debug!(?kind, x = position.x, y = position.y, "widget moved");
    }

    fn set_opacity(&self, kind: WidgetKind, opacity: f64) {
        tracing::debug!(?kind, opacity, "widget opacity");
    }
}

/// One recorded surface operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Mount(WidgetKind, WidgetFrame),
    Unmount(WidgetKind),
    Content(WidgetKind, WidgetContent),
    Position(WidgetKind, PixelPoint),
    Opacity(WidgetKind, f64),
}

/// A surface that records every call, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    notify: Notify,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().push(call);
        self.notify.notify_waiters();
    }

    /// Whether `kind` is currently mounted (mounts minus unmounts).
    pub fn is_mounted(&self, kind: WidgetKind) -> bool {
        let mut mounted = false;
        for call in self.calls.lock().iter() {
            match call {
                SurfaceCall::Mount(k, _) if *k == kind => mounted = true,
                SurfaceCall::Unmount(k) if *k == kind => mounted = false,
                _ => {}
            }
        }
        mounted
    }

    /// Most recent content rendered into `kind`.
    pub fn last_content(&self, kind: WidgetKind) -> Option<WidgetContent> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::Content(k, content) if *k == kind => Some(content.clone()),
                _ => None,
            })
    }

    /// Wait until the recorded calls satisfy `pred`. Returns false if two
    /// seconds pass without the predicate holding.
    pub async fn wait_for<F>(&self, pred: F) -> bool
    where
        F: Fn(&[SurfaceCall]) -> bool,
    {
        let deadline = Duration::from_secs(2);
        let check = async {
            loop {
                // Register the waiter before checking, so a call landing
                // in between still wakes us.
                let notified = self.notify.notified();
                if pred(&self.calls.lock()) {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(deadline, check).await.is_ok()
    }
}

impl OverlaySurface for RecordingSurface {
    fn mount(&self, kind: WidgetKind, frame: WidgetFrame) {
        self.record(SurfaceCall::Mount(kind, frame));
    }

    fn unmount(&self, kind: WidgetKind) {
        self.record(SurfaceCall::Unmount(kind));
    }

    fn set_content(&self, kind: WidgetKind, content: WidgetContent) {
        self.record(SurfaceCall::Content(kind, content));
    }

    fn set_position(&self, kind: WidgetKind, position: PixelPoint) {
        self.record(SurfaceCall::Position(kind, position));
    }

    fn set_opacity(&self, kind: WidgetKind, opacity: f64) {
        self.record(SurfaceCall::Opacity(kind, opacity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_from_conditions_formats_unit() {
        let conditions = CurrentConditions {
            temperature_c: 20.0,
            weather_code: 0,
        };
        let content = WidgetContent::from_conditions(conditions, false);
        assert_eq!(
            content,
            WidgetContent::Weather {
                glyph: "☀️".to_string(),
                temperature: "68°F".to_string(),
            }
        );
    }

    #[test]
    fn unavailable_content_uses_placeholder_glyph() {
        assert_eq!(WidgetContent::unavailable().glyph(), Some(PLACEHOLDER_GLYPH));
    }

    #[test]
    fn recording_surface_tracks_mount_state() {
        let surface = RecordingSurface::new();
        assert!(!surface.is_mounted(WidgetKind::Weather));
        surface.mount(
            WidgetKind::Weather,
            WidgetFrame {
                position: PixelPoint { x: 1.0, y: 2.0 },
                opacity: 0.75,
            },
        );
        assert!(surface.is_mounted(WidgetKind::Weather));
        surface.unmount(WidgetKind::Weather);
        assert!(!surface.is_mounted(WidgetKind::Weather));
    }
}
