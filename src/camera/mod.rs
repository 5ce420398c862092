//! Camera capture: device access, the capture thread and the session around it.
//!
//! - Device capability via [`VideoDevice`] / [`DeviceOpener`]
//! - Capture thread lifecycle via [`CaptureSession`]
//! - Frame hand-off via [`FrameSlot`]

mod device;
mod frame_slot;
mod session;
mod types;
mod worker;

pub use device::{DeviceOpener, NokhwaDevice, NokhwaOpener, VideoDevice};
pub use frame_slot::{FrameSink, FrameSlot};
pub use session::{CaptureSession, SessionState};
pub use types::{
    AUTO_EXPOSURE_OFF, AUTO_EXPOSURE_ON, CameraProperty, CaptureConfig, DeviceInfo, Frame,
    PixelFormat, StreamInfo,
};
