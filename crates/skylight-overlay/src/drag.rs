//! Per-widget drag gesture state machine.
//!
//! IDLE → DRAGGING on pointer-down; while dragging, moves reposition the
//! widget clamped to the viewport; pointer-up ends the gesture and yields
//! the final position — the only value that is ever persisted. A window
//! resize re-clamps immediately, without a gesture.

use skylight_core::WidgetPosition;

use crate::viewport::{PixelPoint, PixelSize, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// Offset from the widget origin to the grab point, fixed for the
    /// whole gesture.
    Dragging { grab_dx: f64, grab_dy: f64 },
}

/// Gesture state plus the widget's current position.
#[derive(Debug, Clone, Copy)]
pub struct DragController {
    phase: Phase,
    position: PixelPoint,
    size: PixelSize,
}

impl DragController {
    pub fn new(position: PixelPoint, size: PixelSize) -> Self {
        Self {
            phase: Phase::Idle,
            position,
            size,
        }
    }

    pub fn position(&self) -> PixelPoint {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    /// Start a gesture. A second pointer-down mid-gesture is ignored.
    pub fn pointer_down(&mut self, pointer: PixelPoint) {
        if self.is_dragging() {
            return;
        }
        self.phase = Phase::Dragging {
            grab_dx: pointer.x - self.position.x,
            grab_dy: pointer.y - self.position.y,
        };
    }

    /// Reposition by pointer delta, clamped into the viewport. Returns
    /// the new position while a gesture is active, `None` otherwise.
    pub fn pointer_move(&mut self, pointer: PixelPoint, viewport: Viewport) -> Option<PixelPoint> {
        let Phase::Dragging { grab_dx, grab_dy } = self.phase else {
            return None;
        };
        let raw = PixelPoint {
            x: pointer.x - grab_dx,
            y: pointer.y - grab_dy,
        };
        self.position = viewport.clamp(raw, self.size);
        Some(self.position)
    }

    /// End the gesture. Returns the position to persist, or `None` when
    /// no gesture was active.
    pub fn pointer_up(&mut self) -> Option<WidgetPosition> {
        if !self.is_dragging() {
            return None;
        }
        self.phase = Phase::Idle;
        Some(WidgetPosition::from(self.position))
    }

    /// Re-clamp into a resized viewport. Returns the corrected position
    /// when the widget had to move.
    pub fn viewport_resized(&mut self, viewport: Viewport) -> Option<PixelPoint> {
        let clamped = viewport.clamp(self.position, self.size);
        if clamped == self.position {
            return None;
        }
        self.position = clamped;
        Some(clamped)
    }
}
