// Zoom factor and where the scaled frame sits inside the window.

use crate::types::Point;

pub const MIN_ZOOM: f32 = 0.39;
pub const MAX_ZOOM: f32 = 10.0;
/// Multiplier per wheel notch
pub const ZOOM_STEP: f32 = 1.02;
/// Wheel delta units in one notch
pub const WHEEL_NOTCH: f32 = 120.0;

/// Display zoom, always within [`MIN_ZOOM`, `MAX_ZOOM`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f32);

impl Default for Zoom {
    fn default() -> Self {
        Zoom(MIN_ZOOM)
    }
}

impl Zoom {
    pub fn new(factor: f32) -> Self {
        Zoom(factor.clamp(MIN_ZOOM, MAX_ZOOM))
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    /// Apply one wheel event. Positive deltas zoom in.
    pub fn apply_wheel(&mut self, delta: f32) {
        let notches = delta / WHEEL_NOTCH;
        self.0 = (self.0 * ZOOM_STEP.powf(notches)).clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

/// Placement of the scaled frame inside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Top-left of the scaled frame; negative when it overflows the window
    pub origin: Point,
    pub width: usize,
    pub height: usize,
}

/// Scale a `frame_w`×`frame_h` frame by `zoom` and center it in the window.
pub fn layout(frame_w: u32, frame_h: u32, zoom: Zoom, window_w: usize, window_h: usize) -> Layout {
    let width = ((frame_w as f32 * zoom.factor()) as usize).max(1);
    let height = ((frame_h as f32 * zoom.factor()) as usize).max(1);
    let origin = Point::new(
        ((window_w as i64 - width as i64) / 2) as f32,
        ((window_h as i64 - height as i64) / 2) as f32,
    );
    Layout {
        origin,
        width,
        height,
    }
}
