//! Camera types and data structures.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Instant;

/// Value written to [`CameraProperty::AutoExposure`] to enable automatic exposure.
pub const AUTO_EXPOSURE_ON: f64 = 0.75;
/// Value written to [`CameraProperty::AutoExposure`] to select manual exposure.
pub const AUTO_EXPOSURE_OFF: f64 = 0.25;

/// Byte order of a frame's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R first
    Rgb8,
    /// 3 bytes per pixel, B first
    Bgr8,
}

/// A decoded camera frame.
///
/// Frames move from the capture thread to the renderer; a newer frame
/// replaces an unconsumed older one.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// When the worker finished decoding the frame
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
        }
    }

    /// Returns the frame with R and B in the positions an RGB consumer expects.
    pub fn into_rgb(mut self) -> Frame {
        if self.format == PixelFormat::Bgr8 {
            for px in self.data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            self.format = PixelFormat::Rgb8;
        }
        self
    }
}

/// A video device as reported by the OS backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    pub description: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// How the worker configures a freshly opened device.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Force manual exposure with this value right after open. The Windows
    /// backends start in auto mode with very long exposures.
    pub manual_exposure: Option<f64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 3264,
            height: 2448,
            fps: 30,
            manual_exposure: if cfg!(target_os = "windows") {
                Some(-6.0)
            } else {
                None
            },
        }
    }
}

/// Resolution and rate the device actually agreed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// A live camera control reachable through the device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraProperty {
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Gamma,
    Temperature,
    Sharpness,
    Focus,
    Exposure,
    AutoFocus,
    AutoExposure,
    AutoWhiteBalance,
}

impl CameraProperty {
    /// Slider-backed properties, in panel order.
    pub const ADJUSTABLE: [CameraProperty; 9] = [
        CameraProperty::Brightness,
        CameraProperty::Contrast,
        CameraProperty::Saturation,
        CameraProperty::Hue,
        CameraProperty::Gamma,
        CameraProperty::Temperature,
        CameraProperty::Sharpness,
        CameraProperty::Focus,
        CameraProperty::Exposure,
    ];

    pub const TOGGLES: [CameraProperty; 3] = [
        CameraProperty::AutoFocus,
        CameraProperty::AutoExposure,
        CameraProperty::AutoWhiteBalance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CameraProperty::Brightness => "brightness",
            CameraProperty::Contrast => "contrast",
            CameraProperty::Saturation => "saturation",
            CameraProperty::Hue => "hue",
            CameraProperty::Gamma => "gamma",
            CameraProperty::Temperature => "color temperature",
            CameraProperty::Sharpness => "sharpness",
            CameraProperty::Focus => "focus",
            CameraProperty::Exposure => "exposure",
            CameraProperty::AutoFocus => "auto focus",
            CameraProperty::AutoExposure => "auto exposure",
            CameraProperty::AutoWhiteBalance => "auto white balance",
        }
    }

    /// Range of the control in the settings panel. `None` for toggles.
    pub fn range(self) -> Option<RangeInclusive<i32>> {
        match self {
            CameraProperty::Brightness => Some(-64..=64),
            CameraProperty::Contrast => Some(0..=100),
            CameraProperty::Saturation => Some(0..=100),
            CameraProperty::Hue => Some(0..=180),
            CameraProperty::Gamma => Some(0..=500),
            CameraProperty::Temperature => Some(2800..=6500),
            CameraProperty::Sharpness => Some(0..=100),
            CameraProperty::Focus => Some(0..=1023),
            CameraProperty::Exposure => Some(50..=10000),
            CameraProperty::AutoFocus
            | CameraProperty::AutoExposure
            | CameraProperty::AutoWhiteBalance => None,
        }
    }

    pub fn is_toggle(self) -> bool {
        self.range().is_none()
    }
}

impl fmt::Display for CameraProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_frames_are_swapped_to_rgb() {
        let frame = Frame::new(2, 1, PixelFormat::Bgr8, vec![1, 2, 3, 4, 5, 6]).into_rgb();
        assert_eq!(frame.format, PixelFormat::Rgb8);
        assert_eq!(frame.data, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn rgb_frames_are_left_alone() {
        let frame = Frame::new(1, 1, PixelFormat::Rgb8, vec![1, 2, 3]).into_rgb();
        assert_eq!(frame.data, vec![1, 2, 3]);
    }

    #[test]
    fn toggles_have_no_range() {
        for p in CameraProperty::TOGGLES {
            assert!(p.is_toggle(), "{p} should be a toggle");
        }
        for p in CameraProperty::ADJUSTABLE {
            assert!(!p.is_toggle(), "{p} should have a range");
        }
        assert_eq!(CameraProperty::Focus.range(), Some(0..=1023));
    }

    #[test]
    fn device_info_display() {
        let info = DeviceInfo {
            index: 2,
            name: "ocal2: ocal2".into(),
            description: "uvcvideo".into(),
        };
        assert_eq!(info.to_string(), "[2] ocal2: ocal2 (uvcvideo)");
    }
}
