// In-memory camera for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::camera::{
    CameraProperty, CaptureConfig, DeviceOpener, Frame, PixelFormat, StreamInfo, VideoDevice,
};
use crate::error::{Error, Result};

/// Shared view of the fake device's controls, readable from the test thread.
#[derive(Default)]
pub struct FakeState {
    values: Mutex<HashMap<CameraProperty, f64>>,
    rejected: Mutex<HashSet<CameraProperty>>,
    frames_read: AtomicU64,
}

impl FakeState {
    pub fn value(&self, property: CameraProperty) -> Option<f64> {
        self.values.lock().ok()?.get(&property).copied()
    }

    pub fn put(&self, property: CameraProperty, value: f64) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(property, value);
        }
    }

    pub fn reject(&self, property: CameraProperty) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(property);
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::SeqCst)
    }
}

pub struct FakeOpener {
    state: Arc<FakeState>,
    fail: bool,
    open_time: Duration,
    read_time: Duration,
}

impl FakeOpener {
    pub fn new() -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            fail: false,
            open_time: Duration::ZERO,
            read_time: Duration::from_millis(2),
        }
    }

    /// A camera whose backend takes `open_time` to open.
    pub fn slow(open_time: Duration) -> Self {
        Self {
            open_time,
            ..Self::new()
        }
    }

    /// A camera whose every frame read blocks for `read_time`.
    pub fn with_read_time(read_time: Duration) -> Self {
        Self {
            read_time,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }
}

impl DeviceOpener for FakeOpener {
    fn open(&self, index: u32, _config: &CaptureConfig) -> Result<Box<dyn VideoDevice>> {
        thread::sleep(self.open_time);
        if self.fail {
            return Err(Error::DeviceOpen(format!("fake camera {index} is unplugged")));
        }
        Ok(Box::new(FakeDevice {
            state: Arc::clone(&self.state),
            read_time: self.read_time,
        }))
    }
}

struct FakeDevice {
    state: Arc<FakeState>,
    read_time: Duration,
}

impl VideoDevice for FakeDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        thread::sleep(self.read_time);
        let n = self.state.frames_read.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::new(2, 1, PixelFormat::Rgb8, vec![n as u8; 6]))
    }

    fn get(&self, property: CameraProperty) -> Option<f64> {
        Some(self.state.value(property).unwrap_or(0.0))
    }

    fn set(&mut self, property: CameraProperty, value: f64) -> bool {
        let rejected = self
            .state
            .rejected
            .lock()
            .map(|r| r.contains(&property))
            .unwrap_or(true);
        if rejected {
            return false;
        }
        self.state.put(property, value);
        true
    }

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            width: 2,
            height: 1,
            fps: 30,
        }
    }
}
