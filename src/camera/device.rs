//! The device capability the capture worker drives, and its nokhwa implementation.

use log::{debug, info, warn};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, ControlValueSetter, FrameFormat, KnownCameraControl,
        RequestedFormat, RequestedFormatType, Resolution,
    },
};

use super::types::{
    AUTO_EXPOSURE_OFF, AUTO_EXPOSURE_ON, CameraProperty, CaptureConfig, Frame, PixelFormat,
    StreamInfo,
};
use crate::error::{Error, Result};
use crate::locator::Platform;

/// An open video device. Owned by exactly one thread at a time.
pub trait VideoDevice {
    /// Block until the next frame is decoded.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Current value of a control, `None` when the device does not expose it.
    fn get(&self, property: CameraProperty) -> Option<f64>;

    /// Write a control. Returns false when the device rejects it.
    fn set(&mut self, property: CameraProperty, value: f64) -> bool;

    fn stream_info(&self) -> StreamInfo;
}

/// Opens devices. Called on the capture thread so the handle never crosses threads.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, index: u32, config: &CaptureConfig) -> Result<Box<dyn VideoDevice>>;
}

/// Opens cameras through nokhwa with the platform's native backend.
#[derive(Debug, Clone, Copy)]
pub struct NokhwaOpener {
    platform: Platform,
}

impl NokhwaOpener {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

impl DeviceOpener for NokhwaOpener {
    fn open(&self, index: u32, config: &CaptureConfig) -> Result<Box<dyn VideoDevice>> {
        let device = NokhwaDevice::open(self.platform, index, config)?;
        Ok(Box::new(device))
    }
}

// V4L2 control ids for the auto toggles nokhwa has no named control for.
const V4L2_CID_AUTO_WHITE_BALANCE: u128 = 0x0098_090c;
const V4L2_CID_EXPOSURE_AUTO: u128 = 0x009a_0901;
const V4L2_CID_FOCUS_AUTO: u128 = 0x009a_090c;
// V4L2 exposure menu entries
const V4L2_EXPOSURE_MANUAL: i64 = 1;
const V4L2_EXPOSURE_APERTURE_PRIORITY: i64 = 3;

/// A nokhwa camera with an open MJPEG stream.
pub struct NokhwaDevice {
    cam: Camera,
    platform: Platform,
    info: StreamInfo,
}

impl NokhwaDevice {
    pub fn open(platform: Platform, index: u32, config: &CaptureConfig) -> Result<Self> {
        let fmt = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::with_backend(CameraIndex::Index(index), req, platform.backend())
            .map_err(|e| Error::DeviceOpen(format!("Create camera {index}: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::DeviceOpen(format!("Open stream: {e}")))?;

        // The stream may settle on a different mode than requested.
        let actual = cam.resolution();
        let info = StreamInfo {
            width: actual.width(),
            height: actual.height(),
            fps: cam.frame_rate(),
        };
        info!(
            "Opened camera {index} via {:?}: {}x{} @ {} fps ({:?})",
            platform.backend(),
            info.width,
            info.height,
            info.fps,
            cam.camera_format().format()
        );

        let mut device = Self {
            cam,
            platform,
            info,
        };
        if let Some(exposure) = config.manual_exposure {
            device.set(CameraProperty::AutoExposure, AUTO_EXPOSURE_OFF);
            if !device.set(CameraProperty::Exposure, exposure) {
                warn!("Camera rejected default exposure {exposure}");
            }
        }
        Ok(device)
    }

    fn control_id(&self, property: CameraProperty) -> Option<KnownCameraControl> {
        let id = match property {
            CameraProperty::Brightness => KnownCameraControl::Brightness,
            CameraProperty::Contrast => KnownCameraControl::Contrast,
            CameraProperty::Saturation => KnownCameraControl::Saturation,
            CameraProperty::Hue => KnownCameraControl::Hue,
            CameraProperty::Gamma => KnownCameraControl::Gamma,
            CameraProperty::Temperature => KnownCameraControl::WhiteBalance,
            CameraProperty::Sharpness => KnownCameraControl::Sharpness,
            CameraProperty::Focus => KnownCameraControl::Focus,
            CameraProperty::Exposure => KnownCameraControl::Exposure,
            // Only V4L2 exposes the auto switches as plain control ids.
            CameraProperty::AutoFocus if self.platform == Platform::Linux => {
                KnownCameraControl::Other(V4L2_CID_FOCUS_AUTO)
            }
            CameraProperty::AutoExposure if self.platform == Platform::Linux => {
                KnownCameraControl::Other(V4L2_CID_EXPOSURE_AUTO)
            }
            CameraProperty::AutoWhiteBalance if self.platform == Platform::Linux => {
                KnownCameraControl::Other(V4L2_CID_AUTO_WHITE_BALANCE)
            }
            CameraProperty::AutoFocus
            | CameraProperty::AutoExposure
            | CameraProperty::AutoWhiteBalance => return None,
        };
        Some(id)
    }

    fn raw_value(&self, id: KnownCameraControl) -> Option<ControlValueSetter> {
        self.cam
            .camera_control(id)
            .map(|control| control.value())
            .ok()
    }
}

fn setter_to_f64(setter: &ControlValueSetter) -> Option<f64> {
    match setter {
        ControlValueSetter::Integer(v) => Some(*v as f64),
        ControlValueSetter::EnumValue(v) => Some(*v as f64),
        ControlValueSetter::Float(v) => Some(*v),
        ControlValueSetter::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Build a setter of the same kind the control currently reports.
fn setter_like(current: &ControlValueSetter, value: f64) -> ControlValueSetter {
    match current {
        ControlValueSetter::Boolean(_) => ControlValueSetter::Boolean(value != 0.0),
        ControlValueSetter::Float(_) => ControlValueSetter::Float(value),
        ControlValueSetter::EnumValue(_) => ControlValueSetter::EnumValue(value.round() as i64),
        _ => ControlValueSetter::Integer(value.round() as i64),
    }
}

impl VideoDevice for NokhwaDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        // Blocks until the driver hands over the next MJPEG buffer.
        let buffer = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgb_img = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        Ok(Frame::new(w, h, PixelFormat::Rgb8, rgb_img.into_raw()))
    }

    fn get(&self, property: CameraProperty) -> Option<f64> {
        let id = self.control_id(property)?;
        let raw = setter_to_f64(&self.raw_value(id)?)?;
        if property == CameraProperty::AutoExposure {
            let auto = raw as i64 != V4L2_EXPOSURE_MANUAL;
            return Some(if auto { AUTO_EXPOSURE_ON } else { AUTO_EXPOSURE_OFF });
        }
        Some(raw)
    }

    fn set(&mut self, property: CameraProperty, value: f64) -> bool {
        let Some(id) = self.control_id(property) else {
            debug!("No {property} control on {:?}", self.platform);
            return false;
        };
        let value = if property == CameraProperty::AutoExposure {
            if value > (AUTO_EXPOSURE_ON + AUTO_EXPOSURE_OFF) / 2.0 {
                V4L2_EXPOSURE_APERTURE_PRIORITY as f64
            } else {
                V4L2_EXPOSURE_MANUAL as f64
            }
        } else {
            value
        };
        let Some(current) = self.raw_value(id) else {
            debug!("Camera does not report {property}");
            return false;
        };
        match self.cam.set_camera_control(id, setter_like(&current, value)) {
            Ok(()) => true,
            Err(e) => {
                debug!("Camera rejected {property}={value}: {e}");
                false
            }
        }
    }

    fn stream_info(&self) -> StreamInfo {
        self.info
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("Stopping camera stream: {e}");
        }
    }
}
