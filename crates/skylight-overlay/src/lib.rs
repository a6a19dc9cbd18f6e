//! Page-overlay runtime for Skylight: widget lifecycle, drag handling,
//! and the per-page event loop.
//!
//! The host page sits behind [`surface::OverlaySurface`]; everything
//! else — which widgets exist, where they are, what they show — is
//! driven from the sync store and the context bus.

pub mod drag;
pub mod lifecycle;
pub mod runtime;
pub mod surface;
pub mod viewport;

pub use drag::DragController;
pub use lifecycle::{WidgetLifecycle, CLOCK_TICK, WEATHER_REFRESH_INTERVAL};
pub use runtime::ContentRuntime;
pub use surface::{
    OverlaySurface, RecordingSurface, SurfaceCall, TracingSurface, WidgetContent, WidgetKind,
};
pub use viewport::{
    default_position, widget_size, PixelPoint, PixelSize, Viewport, WidgetFrame,
};
