//! Calibration overlay state: three circles, one cross, the focus center and an offset.
//!
//! All geometry is in frame pixels. The renderer scales it by the zoom factor
//! and anchors it at the displayed frame's origin.

use crate::types::{Point, Rgb};

pub const CIRCLE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleOverlay {
    pub radius: f32,
    pub thickness: f32,
    pub visible: bool,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossOverlay {
    pub visible: bool,
    /// Half-length of each arm
    pub length: f32,
    pub thickness: f32,
    /// Degrees from the positive x axis
    pub angle: f32,
    pub color: Rgb,
}

impl Default for CrossOverlay {
    fn default() -> Self {
        Self {
            visible: false,
            length: 100.0,
            thickness: 2.0,
            angle: 0.0,
            color: Rgb::PURPLE,
        }
    }
}

/// One field of a circle, with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleProperty {
    Radius(f32),
    Thickness(f32),
    Visible(bool),
    Color(Rgb),
}

/// One field of the cross, with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossProperty {
    Visible(bool),
    Length(f32),
    Thickness(f32),
    Angle(f32),
    Color(Rgb),
}

/// Pixel displacement of the overlay, applied only while enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
    pub enabled: bool,
}

impl Offset {
    /// (0, 0) while disabled, whatever is stored.
    pub fn effective(&self) -> (f32, f32) {
        if self.enabled {
            (self.x, self.y)
        } else {
            (0.0, 0.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    circles: [CircleOverlay; CIRCLE_COUNT],
    cross: CrossOverlay,
    focus_center: (f32, f32),
    offset: Offset,
    dirty: bool,
}

impl Default for OverlayState {
    fn default() -> Self {
        let circle = |radius, color| CircleOverlay {
            radius,
            thickness: 2.0,
            visible: false,
            color,
        };
        Self::new(
            [
                circle(500.0, Rgb::RED),
                circle(250.0, Rgb::GREEN),
                circle(100.0, Rgb::BLUE),
            ],
            CrossOverlay::default(),
        )
    }
}

impl OverlayState {
    pub fn new(circles: [CircleOverlay; CIRCLE_COUNT], cross: CrossOverlay) -> Self {
        Self {
            circles,
            cross,
            focus_center: (0.0, 0.0),
            offset: Offset::default(),
            dirty: true,
        }
    }

    pub fn circles(&self) -> &[CircleOverlay; CIRCLE_COUNT] {
        &self.circles
    }

    pub fn circle(&self, index: usize) -> Option<&CircleOverlay> {
        self.circles.get(index)
    }

    pub fn cross(&self) -> &CrossOverlay {
        &self.cross
    }

    pub fn focus_center(&self) -> (f32, f32) {
        self.focus_center
    }

    pub fn offset(&self) -> &Offset {
        &self.offset
    }

    /// Update one field of circle `index`. Indices past the last circle are ignored.
    pub fn set_circle_property(&mut self, index: usize, property: CircleProperty) {
        let Some(circle) = self.circles.get_mut(index) else {
            return;
        };
        match property {
            CircleProperty::Radius(v) => circle.radius = v,
            CircleProperty::Thickness(v) => circle.thickness = v,
            CircleProperty::Visible(v) => circle.visible = v,
            CircleProperty::Color(v) => circle.color = v,
        }
        self.dirty = true;
    }

    pub fn set_cross_property(&mut self, property: CrossProperty) {
        let cross = &mut self.cross;
        match property {
            CrossProperty::Visible(v) => cross.visible = v,
            CrossProperty::Length(v) => cross.length = v,
            CrossProperty::Thickness(v) => cross.thickness = v,
            CrossProperty::Angle(v) => cross.angle = v,
            CrossProperty::Color(v) => cross.color = v,
        }
        self.dirty = true;
    }

    pub fn set_focus_center(&mut self, x: f32, y: f32) {
        self.focus_center = (x, y);
        self.dirty = true;
    }

    pub fn set_offset(&mut self, x: f32, y: f32) {
        self.offset.x = x;
        self.offset.y = y;
        self.dirty = true;
    }

    pub fn set_offset_enabled(&mut self, enabled: bool) {
        self.offset.enabled = enabled;
        self.dirty = true;
    }

    /// True once after any setter ran; the renderer clears it by calling this.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// Where the overlay is anchored on screen.
///
/// `origin` is the top-left of the displayed (scaled) frame. The offset's y
/// axis points up, so it is subtracted.
pub fn overlay_center(origin: Point, state: &OverlayState, zoom: f32) -> Point {
    let (fx, fy) = state.focus_center;
    let (ox, oy) = state.offset.effective();
    Point::new(
        origin.x + fx * zoom + ox * zoom,
        origin.y + fy * zoom - oy * zoom,
    )
}

/// The two arms of a cross of half-length `length` centered at `center`,
/// rotated by `angle_deg` from the positive x axis.
pub fn cross_segments(center: Point, length: f32, angle_deg: f32) -> [(Point, Point); 2] {
    let a = angle_deg.to_radians();
    let b = a + std::f32::consts::FRAC_PI_2;
    let arm = |theta: f32| {
        let (dx, dy) = (length * theta.cos(), length * theta.sin());
        (
            Point::new(center.x - dx, center.y - dy),
            Point::new(center.x + dx, center.y + dy),
        )
    };
    [arm(a), arm(b)]
}
