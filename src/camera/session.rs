//! Capture session: the only path from the UI thread to the camera.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use super::device::DeviceOpener;
use super::frame_slot::{FrameSink, FrameSlot};
use super::types::{CameraProperty, CaptureConfig, Frame, StreamInfo};
use super::worker::{DeviceRequest, Worker};
use crate::error::{Error, Result};

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Streaming,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Opening => "opening",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Channels of a worker that has not reported its open result yet.
struct PendingOpen {
    index: u32,
    ready: Receiver<Result<StreamInfo>>,
    requests: Sender<DeviceRequest>,
}

/// Owns the capture thread and the channel to its device.
///
/// The camera handle itself lives on the capture thread; property reads and
/// writes are messages served between frame reads, so the two threads never
/// touch the device at the same time.
pub struct CaptureSession {
    opener: Arc<dyn DeviceOpener>,
    config: CaptureConfig,
    state: SessionState,
    frames: Arc<FrameSlot>,
    // Fresh per start: an abandoned open keeps its own, cleared flag.
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    pending: Option<PendingOpen>,
    requests: Option<Sender<DeviceRequest>>,
    stream: Option<StreamInfo>,
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    pub fn new(opener: Arc<dyn DeviceOpener>, config: CaptureConfig) -> Self {
        Self {
            opener,
            config,
            state: SessionState::Idle,
            frames: Arc::new(FrameSlot::new()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            pending: None,
            requests: None,
            stream: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Resolution and rate of the open stream.
    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.stream
    }

    /// The slot frames are published into.
    pub fn frames(&self) -> &Arc<FrameSlot> {
        &self.frames
    }

    /// Newest frame since the last call, if any.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.frames.take()
    }

    /// Spawn a capture thread that opens device `index`, and return at once.
    ///
    /// The session stays in `Opening` until [`poll_open`](Self::poll_open)
    /// sees the worker's result.
    ///
    /// # Errors
    /// * `Error::SessionBusy` - a session is already opening or streaming
    /// * `Error::DeviceOpen` - the capture thread could not be spawned
    pub fn start(&mut self, index: u32) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::SessionBusy);
        }
        self.state = SessionState::Opening;
        info!("Opening camera {index}");

        self.running = Arc::new(AtomicBool::new(true));
        let (request_tx, request_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let sink: Arc<dyn FrameSink> = self.frames.clone();
        let worker = Worker {
            opener: Arc::clone(&self.opener),
            index,
            config: self.config.clone(),
            sink,
            running: Arc::clone(&self.running),
            requests: request_rx,
            ready: ready_tx,
        };
        let spawned = thread::Builder::new()
            .name("capture".into())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.pending = Some(PendingOpen {
                    index,
                    ready: ready_rx,
                    requests: request_tx,
                });
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.state = SessionState::Idle;
                Err(Error::DeviceOpen(format!("Spawn capture thread: {e}")))
            }
        }
    }

    /// Check whether a pending open has finished. Never blocks.
    ///
    /// Returns `None` while the worker is still opening (or nothing is
    /// pending), otherwise the open result; on error the session is idle again.
    pub fn poll_open(&mut self) -> Option<Result<StreamInfo>> {
        let pending = self.pending.as_ref()?;
        let outcome = match pending.ready.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        };
        Some(self.finish_open(outcome))
    }

    /// Start and wait for the open result, however long the backend takes.
    ///
    /// For one-shot tools; the window uses [`start`](Self::start) and
    /// [`poll_open`](Self::poll_open) so a hung backend cannot freeze it.
    pub fn open_blocking(&mut self, index: u32) -> Result<StreamInfo> {
        self.start(index)?;
        let outcome = match self.pending.as_ref() {
            Some(pending) => pending.ready.recv().unwrap_or(Err(Error::Disconnected)),
            None => Err(Error::Disconnected),
        };
        self.finish_open(outcome)
    }

    fn finish_open(&mut self, outcome: Result<StreamInfo>) -> Result<StreamInfo> {
        let Some(pending) = self.pending.take() else {
            return Err(Error::Disconnected);
        };
        match outcome {
            Ok(stream) => {
                self.requests = Some(pending.requests);
                self.stream = Some(stream);
                self.state = SessionState::Streaming;
                info!(
                    "Streaming {}x{} @ {} fps",
                    stream.width, stream.height, stream.fps
                );
                Ok(stream)
            }
            Err(e) => {
                // The worker has already returned; joining does not block.
                self.running.store(false, Ordering::Release);
                self.join_worker();
                self.state = SessionState::Idle;
                warn!("Camera {} failed to open: {e}", pending.index);
                Err(e)
            }
        }
    }

    /// Clear the running flag, wait for the worker to exit, then drop any pending frame.
    ///
    /// Blocks for as long as the current read takes. An open that has not
    /// finished yet is abandoned instead of joined: its thread exits on its
    /// own once the backend returns, without delivering a frame. A no-op when idle.
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            self.state = SessionState::Idle;
            return;
        }
        self.running.store(false, Ordering::Release);

        if let Some(pending) = self.pending.take() {
            // Dropping the ready receiver tells the worker nobody waits for it.
            info!("Abandoning open of camera {}", pending.index);
            self.worker = None;
            self.frames.clear();
            self.state = SessionState::Idle;
            return;
        }

        self.state = SessionState::Stopping;
        info!("Stopping capture");
        // Dropping the sender also wakes the worker out of request handling.
        self.requests = None;
        self.join_worker();

        self.frames.clear();
        self.stream = None;
        self.state = SessionState::Idle;
        info!(
            "Capture stopped ({} frames delivered, {} superseded)",
            self.frames.delivered(),
            self.frames.dropped()
        );
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
    }

    /// Read a camera property. Returns 0.0 when no device is streaming or the
    /// device does not expose the property.
    ///
    /// Waits until the worker finishes its current frame read.
    pub fn get_property(&self, property: CameraProperty) -> f64 {
        let Some(requests) = self.requests.as_ref() else {
            return 0.0;
        };
        let (reply, rx) = mpsc::channel();
        if requests
            .send(DeviceRequest::Get { property, reply })
            .is_err()
        {
            debug!("Capture thread gone, {property} reads 0");
            return 0.0;
        }
        rx.recv().ok().flatten().unwrap_or(0.0)
    }

    /// Write a camera property. Returns false when there is no streaming
    /// device or the device rejects the value.
    ///
    /// Waits until the worker finishes its current frame read.
    pub fn set_property(&self, property: CameraProperty, value: f64) -> bool {
        let Some(requests) = self.requests.as_ref() else {
            return false;
        };
        let (reply, rx) = mpsc::channel();
        if requests
            .send(DeviceRequest::Set {
                property,
                value,
                reply,
            })
            .is_err()
        {
            debug!("Capture thread gone, {property} not written");
            return false;
        }
        rx.recv().unwrap_or(false)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
