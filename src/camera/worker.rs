//! Background capture thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::device::{DeviceOpener, VideoDevice};
use super::frame_slot::FrameSink;
use super::types::{CameraProperty, CaptureConfig, StreamInfo};
use crate::error::Result;

/// Back-off after a failed read so a broken stream does not spin.
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Requests the UI thread sends to the device owner.
pub enum DeviceRequest {
    Get {
        property: CameraProperty,
        reply: Sender<Option<f64>>,
    },
    Set {
        property: CameraProperty,
        value: f64,
        reply: Sender<bool>,
    },
}

/// Everything the worker needs; moved onto the capture thread.
pub struct Worker {
    pub opener: Arc<dyn DeviceOpener>,
    pub index: u32,
    pub config: CaptureConfig,
    pub sink: Arc<dyn FrameSink>,
    pub running: Arc<AtomicBool>,
    pub requests: Receiver<DeviceRequest>,
    pub ready: Sender<Result<StreamInfo>>,
}

impl Worker {
    /// Open the device, report the outcome once, then stream until `running` is cleared.
    ///
    /// The device handle is dropped only after the loop has observed the flag.
    pub fn run(self) {
        /* --- Open ---
           May block for a long time in the backend; the UI polls for the result. */
        let mut device = match self.opener.open(self.index, &self.config) {
            Ok(device) => device,
            Err(e) => {
                let _ = self.ready.send(Err(e));
                return;
            }
        };

        // A stop during the open drops the receiver, so this fails and the
        // device is released without streaming.
        if self.ready.send(Ok(device.stream_info())).is_err() {
            info!("Camera {} opened after the session gave up on it", self.index);
            return;
        }

        /* --- Capture loop ---
           One pass: answer queued property requests, block on one frame,
           publish it. Requests therefore wait at most one read. */
        let mut frames: u64 = 0;
        while self.running.load(Ordering::Acquire) {
            // Sender gone means the session stopped.
            if !serve_requests(device.as_mut(), &self.requests) {
                break;
            }

            match device.read_frame() {
                Ok(frame) => {
                    // Re-check so a stop issued during a blocking read drops this frame.
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                    self.sink.deliver(frame);
                    frames += 1;
                }
                Err(e) => {
                    // Transient decode or driver hiccup: back off and retry.
                    debug!("{e}");
                    thread::sleep(READ_RETRY_DELAY);
                }
            }
        }

        /* --- Release ---
           Closing the stream happens here, on the thread that owned it. */
        drop(device);
        info!("Capture loop stopped after {frames} frames");
    }
}

/// Serve every pending request. Returns false once the request channel is gone.
fn serve_requests(device: &mut dyn VideoDevice, requests: &Receiver<DeviceRequest>) -> bool {
    loop {
        match requests.try_recv() {
            Ok(DeviceRequest::Get { property, reply }) => {
                let _ = reply.send(device.get(property));
            }
            Ok(DeviceRequest::Set {
                property,
                value,
                reply,
            }) => {
                let accepted = device.set(property, value);
                if !accepted {
                    debug!("Camera rejected {property} = {value}");
                }
                let _ = reply.send(accepted);
            }
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}
