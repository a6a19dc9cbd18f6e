//! Pixel geometry: viewport clamping and default widget placement.

use skylight_core::{WidgetAnchor, WidgetPosition};

use crate::surface::WidgetKind;

/// Inset from the anchored corner for freshly created widgets.
const ANCHOR_INSET: f64 = 20.0;
/// Vertical distance between the weather and time widgets when stacked
/// at their default offsets.
const STACK_OFFSET: f64 = 70.0;

/// A point in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl From<WidgetPosition> for PixelPoint {
    fn from(pos: WidgetPosition) -> Self {
        Self {
            x: f64::from(pos.left),
            y: f64::from(pos.top),
        }
    }
}

impl From<PixelPoint> for WidgetPosition {
    fn from(point: PixelPoint) -> Self {
        Self {
            left: point.x.round() as i32,
            top: point.y.round() as i32,
        }
    }
}

/// A widget's rendered box size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

/// Placement handed to the surface at mount time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetFrame {
    pub position: PixelPoint,
    pub opacity: f64,
}

/// The visible page area widgets must stay inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Clamp `point` so a box of `size` at that origin stays fully inside
    /// the viewport on both axes.
    pub fn clamp(&self, point: PixelPoint, size: PixelSize) -> PixelPoint {
        let max_x = (self.width - size.width).max(0.0);
        let max_y = (self.height - size.height).max(0.0);
        PixelPoint {
            x: point.x.clamp(0.0, max_x),
            y: point.y.clamp(0.0, max_y),
        }
    }
}

/// Rendered box size per widget kind.
pub fn widget_size(kind: WidgetKind) -> PixelSize {
    match kind {
        WidgetKind::Weather => PixelSize {
            width: 160.0,
            height: 50.0,
        },
        WidgetKind::Time => PixelSize {
            width: 150.0,
            height: 40.0,
        },
    }
}

/// Default offset for a widget that has never been dragged: anchored
/// corner with a fixed inset, time widget stacked past the weather
/// widget.
pub fn default_position(kind: WidgetKind, anchor: WidgetAnchor, viewport: Viewport) -> PixelPoint {
    let size = widget_size(kind);
    let x = match anchor {
        WidgetAnchor::TopLeft | WidgetAnchor::BottomLeft => ANCHOR_INSET,
        WidgetAnchor::TopRight | WidgetAnchor::BottomRight => {
            viewport.width - size.width - ANCHOR_INSET
        }
    };
    let stack = match kind {
        WidgetKind::Weather => 0.0,
        WidgetKind::Time => STACK_OFFSET,
    };
    let y = match anchor {
        WidgetAnchor::TopLeft | WidgetAnchor::TopRight => ANCHOR_INSET + stack,
        WidgetAnchor::BottomLeft | WidgetAnchor::BottomRight => {
            viewport.height - size.height - ANCHOR_INSET - stack
        }
    };
    viewport.clamp(PixelPoint { x, y }, size)
}
