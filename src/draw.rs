// Window + software drawing utilities.
// Provided here:
// 1) The window that shows the live camera image, with its keyboard and wheel input.
// 2) Stroked circles and thick lines for the calibration overlay.
// 3) A tiny 5x7 bitmap font and a translucent box for the HUD.

use crate::error::Error;
use crate::types::{FrameBuffer, Point, Rgb};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Create a resizable window of the given size.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let options = WindowOptions {
            resize: true,
            ..WindowOptions::default()
        };
        let mut window =
            Window::new(title, width, height, options).map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen and pump window events.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Current client area in pixels.
    pub fn size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    /// Vertical wheel movement since the last update, in notches (up is positive).
    pub fn scroll_notches(&self) -> Option<f32> {
        self.window
            .get_scroll_wheel()
            .map(|(_, dy)| dy)
            .filter(|dy| *dy != 0.0)
    }

    /// Keys that went down since the last update, with auto-repeat.
    pub fn keys_pressed(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::Yes)
    }

    pub fn shift_down(&self) -> bool {
        self.window.is_key_down(Key::LeftShift) || self.window.is_key_down(Key::RightShift)
    }
}

/* ---------- Software drawing: pixels, lines, circles ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Mix `color` over the pixel at (x,y); `alpha` is 0..=255.
#[inline]
fn blend_pixel(fb: &mut FrameBuffer, x: usize, y: usize, color: u32, alpha: u32) {
    let idx = y * fb.width + x;
    let old = fb.pixels[idx];
    let mix = |shift: u32| {
        let o = (old >> shift) & 0xFF;
        let n = (color >> shift) & 0xFF;
        ((n * alpha + o * (255 - alpha)) / 255) << shift
    };
    fb.pixels[idx] = mix(16) | mix(8) | mix(0);
}

/// Clip a float bounding box to the framebuffer; None when fully outside.
fn clip_box(fb: &FrameBuffer, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(usize, usize, usize, usize)> {
    if fb.width == 0 || fb.height == 0 {
        return None;
    }
    let max_x = (fb.width - 1) as f32;
    let max_y = (fb.height - 1) as f32;
    if x1 < 0.0 || y1 < 0.0 || x0 > max_x || y0 > max_y {
        return None;
    }
    Some((
        x0.max(0.0).floor() as usize,
        y0.max(0.0).floor() as usize,
        x1.min(max_x).ceil() as usize,
        y1.min(max_y).ceil() as usize,
    ))
}

/// Stroke a line segment `thickness` pixels wide (at least one pixel).
pub fn draw_thick_line(fb: &mut FrameBuffer, a: Point, b: Point, thickness: f32, color: Rgb) {
    let half = (thickness.max(1.0)) / 2.0;
    let Some((x0, y0, x1, y1)) = clip_box(
        fb,
        a.x.min(b.x) - half,
        a.y.min(b.y) - half,
        a.x.max(b.x) + half,
        a.y.max(b.y) + half,
    ) else {
        return;
    };

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let color = color.to_u32();
    for y in y0..=y1 {
        for x in x0..=x1 {
            // Distance from the pixel center to the segment
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let t = if len2 > 0.0 {
                (((px - a.x) * dx + (py - a.y) * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (qx, qy) = (a.x + t * dx - px, a.y + t * dy - py);
            if qx * qx + qy * qy <= half * half {
                fb.pixels[y * fb.width + x] = color;
            }
        }
    }
}

/// Stroke a circle outline `thickness` pixels wide (at least one pixel).
pub fn draw_circle(fb: &mut FrameBuffer, center: Point, radius: f32, thickness: f32, color: Rgb) {
    if radius < 0.0 {
        return;
    }
    let half = (thickness.max(1.0)) / 2.0;
    let outer = radius + half;
    let inner = (radius - half).max(0.0);
    let Some((x0, y0, x1, y1)) = clip_box(
        fb,
        center.x - outer,
        center.y - outer,
        center.x + outer,
        center.y + outer,
    ) else {
        return;
    };

    let (outer2, inner2) = (outer * outer, inner * inner);
    let color = color.to_u32();
    for y in y0..=y1 {
        let dy = y as f32 + 0.5 - center.y;
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.x;
            let d2 = dx * dx + dy * dy;
            if d2 <= outer2 && d2 >= inner2 {
                fb.pixels[y * fb.width + x] = color;
            }
        }
    }
}

/// Darken/tint a rectangle with `color` at `alpha` (0..=255).
pub fn fill_rect_blend(fb: &mut FrameBuffer, x: i32, y: i32, w: usize, h: usize, color: u32, alpha: u8) {
    let Some((x0, y0, x1, y1)) = clip_box(
        fb,
        x as f32,
        y as f32,
        (x + w as i32 - 1) as f32,
        (y + h as i32 - 1) as f32,
    ) else {
        return;
    };
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            blend_pixel(fb, xx, yy, color, alpha as u32);
        }
    }
}

/* ---------- 5x7 bitmap font ---------- */

pub const GLYPH_W: i32 = 5;
pub const GLYPH_H: i32 = 7;

/// Return a 5x7 glyph bitmap. Lowercase letters render as uppercase.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),
        '/' => g!(0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000),
        '>' => g!(0b10000,0b01000,0b00100,0b00010,0b00100,0b01000,0b10000),
        '@' => g!(0b01110,0b10001,0b10111,0b10101,0b10111,0b10000,0b01110),
        '\'' => g!(0b00100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00100,0b00100,0b01000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),

        _ => None,
    }
}

/// Draw a single glyph at (x,y), each font pixel a `scale`×`scale` block,
/// with a 1-block black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (shadow, c) in [(scale, 0x0000_0000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..GLYPH_W {
                if (rowbits & (1 << (4 - rx))) == 0 {
                    continue;
                }
                let (bx, by) = (x + rx * scale + shadow, y + ry as i32 * scale + shadow);
                for sy in 0..scale {
                    for sx in 0..scale {
                        put_pixel(fb, bx + sx, by + sy, c);
                    }
                }
            }
        }
    }
}

/// Width in pixels of `text` at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * (GLYPH_W + 1) * scale
}

/// Draw a text string using 5x7 glyphs.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    let scale = scale.max(1);
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += (GLYPH_W + 1) * scale;
    }
}
