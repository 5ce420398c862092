//! Composites the latest camera frame and the calibration overlay into the window buffer.

use image::RgbImage;
use log::warn;

use crate::camera::Frame;
use crate::draw::{GLYPH_H, draw_circle, draw_text_5x7, draw_thick_line, fill_rect_blend, text_width};
use crate::overlay::{OverlayState, cross_segments, overlay_center};
use crate::types::{FrameBuffer, Rgb};
use crate::view::{Layout, Zoom, layout};

const LABEL_MARGIN: i32 = 10;
const LABEL_PADDING: i32 = 4;
const LABEL_SCALE: i32 = 2;
/// Black at 160/255, like a dimmed backdrop
const LABEL_ALPHA: u8 = 160;

/// Window-sized canvas plus the zoom and the last frame it showed.
pub struct RenderSurface {
    screen: FrameBuffer,
    frame: Option<RgbImage>,
    zoom: Zoom,
    status: Vec<String>,
    needs_redraw: bool,
}

impl RenderSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            screen: FrameBuffer::new(width, height),
            frame: None,
            zoom: Zoom::default(),
            status: Vec::new(),
            needs_redraw: true,
        }
    }

    pub fn screen(&self) -> &FrameBuffer {
        &self.screen
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Take ownership of a new frame; the previous one is discarded.
    pub fn set_frame(&mut self, frame: Frame) {
        let frame = frame.into_rgb();
        let (w, h) = (frame.width, frame.height);
        // Scaling indexes the last source row and column.
        if w == 0 || h == 0 {
            warn!("Dropping empty {w}x{h} frame");
            return;
        }
        match RgbImage::from_raw(w, h, frame.data) {
            Some(img) => {
                self.frame = Some(img);
                self.needs_redraw = true;
            }
            None => warn!("Dropping malformed {w}x{h} frame"),
        }
    }

    /// Forget the current frame (camera closed).
    pub fn clear_frame(&mut self) {
        self.frame = None;
        self.needs_redraw = true;
    }

    /// Apply a wheel event of `delta` units (120 per notch).
    pub fn on_wheel(&mut self, delta: f32) {
        self.zoom.apply_wheel(delta);
        self.needs_redraw = true;
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.screen.width, self.screen.height) {
            self.screen.resize(width, height);
            self.needs_redraw = true;
        }
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Lines shown in the bottom-left corner. Redraws only when they change.
    pub fn set_status(&mut self, lines: Vec<String>) {
        if lines != self.status {
            self.status = lines;
            self.needs_redraw = true;
        }
    }

    /// Redraw if anything changed since the last call. Returns whether it drew.
    pub fn render(&mut self, overlay: &mut OverlayState) -> bool {
        let dirty = overlay.take_dirty();
        if !(dirty || std::mem::take(&mut self.needs_redraw)) {
            return false;
        }
        self.needs_redraw = false;
        self.compose(overlay);
        true
    }

    fn compose(&mut self, overlay: &OverlayState) {
        self.screen.fill(0);
        if self.frame.is_some() {
            self.compose_frame(overlay);
        }
        draw_status(&mut self.screen, &self.status);
    }

    fn compose_frame(&mut self, overlay: &OverlayState) {
        let Some(img) = self.frame.as_ref() else {
            return;
        };

        let zoom = self.zoom;
        let placed = layout(img.width(), img.height(), zoom, self.screen.width, self.screen.height);
        blit_scaled(&mut self.screen, img, &placed);

        let z = zoom.factor();
        let center = overlay_center(placed.origin, overlay, z);

        for circle in overlay.circles().iter().filter(|c| c.visible) {
            draw_circle(
                &mut self.screen,
                center,
                circle.radius * z,
                circle.thickness * z,
                circle.color,
            );
        }

        let cross = overlay.cross();
        if cross.visible {
            for (a, b) in cross_segments(center, cross.length * z, cross.angle) {
                draw_thick_line(&mut self.screen, a, b, cross.thickness * z, cross.color);
            }
        }

        draw_zoom_label(&mut self.screen, zoom);
    }
}

/// Nearest-neighbour scale of `img` into the window at `placed`, clipped to the window.
fn blit_scaled(screen: &mut FrameBuffer, img: &RgbImage, placed: &Layout) {
    let (src_w, src_h) = img.dimensions();
    let ox = placed.origin.x as i64;
    let oy = placed.origin.y as i64;
    let x_start = ox.max(0) as usize;
    let y_start = oy.max(0) as usize;
    let x_end = ((ox + placed.width as i64).max(0) as usize).min(screen.width);
    let y_end = ((oy + placed.height as i64).max(0) as usize).min(screen.height);

    let sx = src_w as f32 / placed.width as f32;
    let sy = src_h as f32 / placed.height as f32;
    let raw = img.as_raw();
    let stride = src_w as usize * 3;

    for y in y_start..y_end {
        let src_y = (((y as i64 - oy) as f32 * sy) as usize).min(src_h as usize - 1);
        let row = &raw[src_y * stride..(src_y + 1) * stride];
        let out = &mut screen.pixels[y * screen.width..(y + 1) * screen.width];
        for (x, px) in out.iter_mut().enumerate().take(x_end).skip(x_start) {
            let src_x = (((x as i64 - ox) as f32 * sx) as usize).min(src_w as usize - 1);
            let p = &row[src_x * 3..src_x * 3 + 3];
            *px = Rgb::new(p[0], p[1], p[2]).to_u32();
        }
    }
}

fn draw_zoom_label(screen: &mut FrameBuffer, zoom: Zoom) {
    let text = format!("Zoom: {:.2}x", zoom.factor());
    let w = text_width(&text, LABEL_SCALE) + 2 * LABEL_PADDING;
    let h = GLYPH_H * LABEL_SCALE + 2 * LABEL_PADDING;
    fill_rect_blend(
        screen,
        LABEL_MARGIN,
        LABEL_MARGIN,
        w as usize,
        h as usize,
        0x0000_0000,
        LABEL_ALPHA,
    );
    draw_text_5x7(
        screen,
        LABEL_MARGIN + LABEL_PADDING,
        LABEL_MARGIN + LABEL_PADDING,
        &text,
        Rgb::WHITE.to_u32(),
        LABEL_SCALE,
    );
}

fn draw_status(screen: &mut FrameBuffer, lines: &[String]) {
    let line_h = GLYPH_H + 3;
    let Some(widest) = lines.iter().map(|l| text_width(l, 1)).max() else {
        return;
    };
    let top = screen.height as i32 - LABEL_MARGIN - line_h * lines.len() as i32;
    fill_rect_blend(
        screen,
        LABEL_MARGIN - LABEL_PADDING,
        top - LABEL_PADDING,
        (widest + 2 * LABEL_PADDING) as usize,
        (line_h * lines.len() as i32 + 2 * LABEL_PADDING) as usize,
        0x0000_0000,
        LABEL_ALPHA,
    );
    for (i, line) in lines.iter().enumerate() {
        draw_text_5x7(
            screen,
            LABEL_MARGIN,
            top + i as i32 * line_h,
            line,
            Rgb::WHITE.to_u32(),
            1,
        );
    }
}
