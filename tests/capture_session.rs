//! Capture session and controller behaviour against a scripted camera.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use collimator::camera::{
    CameraProperty, CaptureConfig, CaptureSession, DeviceOpener, Frame, PixelFormat,
    SessionState, StreamInfo, VideoDevice,
};
use collimator::config::Config;
use collimator::error::{Error, Result};
use collimator::shell::{Command, Shell};
use collimator::view::{MIN_ZOOM, ZOOM_STEP};

/// Counters shared between the test and the scripted camera.
#[derive(Default)]
struct Counters {
    reading: AtomicBool,
    overlapping: AtomicU32,
    reads: AtomicU32,
    exposure: AtomicU32,
}

struct SlowCamera {
    counters: Arc<Counters>,
    read_time: Duration,
}

impl VideoDevice for SlowCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        self.counters.reading.store(true, Ordering::SeqCst);
        thread::sleep(self.read_time);
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.counters.reading.store(false, Ordering::SeqCst);
        Ok(Frame::new(4, 3, PixelFormat::Bgr8, vec![7; 36]))
    }

    fn get(&self, property: CameraProperty) -> Option<f64> {
        if self.counters.reading.load(Ordering::SeqCst) {
            self.counters.overlapping.fetch_add(1, Ordering::SeqCst);
        }
        match property {
            CameraProperty::Exposure => Some(self.counters.exposure.load(Ordering::SeqCst) as f64),
            _ => None,
        }
    }

    fn set(&mut self, property: CameraProperty, value: f64) -> bool {
        if self.counters.reading.load(Ordering::SeqCst) {
            self.counters.overlapping.fetch_add(1, Ordering::SeqCst);
        }
        match property {
            CameraProperty::Exposure => {
                self.counters.exposure.store(value as u32, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            width: 4,
            height: 3,
            fps: 30,
        }
    }
}

struct SlowOpener {
    counters: Arc<Counters>,
    read_time: Duration,
}

impl SlowOpener {
    fn new(read_time: Duration) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let opener = Self {
            counters: Arc::clone(&counters),
            read_time,
        };
        (opener, counters)
    }
}

impl DeviceOpener for SlowOpener {
    fn open(&self, index: u32, _config: &CaptureConfig) -> Result<Box<dyn VideoDevice>> {
        if index > 8 {
            return Err(Error::DeviceOpen(format!("no device {index}")));
        }
        Ok(Box::new(SlowCamera {
            counters: Arc::clone(&self.counters),
            read_time: self.read_time,
        }))
    }
}

fn wait_for_frame(session: &CaptureSession) -> Option<Frame> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(frame) = session.latest_frame() {
            return Some(frame);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn stop_with_a_read_in_flight_delivers_nothing_afterwards() {
    let (opener, counters) = SlowOpener::new(Duration::from_millis(30));
    let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
    session.open_blocking(0).expect("start");
    assert!(wait_for_frame(&session).is_some());

    // The worker is now inside another 30 ms read.
    thread::sleep(Duration::from_millis(5));
    session.stop();
    let delivered = session.frames().delivered();
    let reads = counters.reads.load(Ordering::SeqCst);

    thread::sleep(Duration::from_millis(80));
    assert!(session.latest_frame().is_none());
    assert_eq!(session.frames().delivered(), delivered);
    assert_eq!(counters.reads.load(Ordering::SeqCst), reads);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn property_access_never_overlaps_a_frame_read() {
    let (opener, counters) = SlowOpener::new(Duration::from_millis(3));
    let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
    session.open_blocking(0).expect("start");

    for value in (100..2000).step_by(100) {
        assert!(session.set_property(CameraProperty::Exposure, value as f64));
        assert_eq!(session.get_property(CameraProperty::Exposure), value as f64);
    }
    assert!(!session.set_property(CameraProperty::Hue, 10.0));
    assert_eq!(session.get_property(CameraProperty::Hue), 0.0);
    assert_eq!(counters.overlapping.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_device_leaves_the_session_idle() {
    let (opener, _) = SlowOpener::new(Duration::from_millis(1));
    let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
    assert!(matches!(session.open_blocking(9), Err(Error::DeviceOpen(_))));
    assert_eq!(session.state(), SessionState::Idle);
    session.open_blocking(1).expect("a valid index still opens");
}

fn controller() -> Shell {
    let (opener, _) = SlowOpener::new(Duration::from_millis(2));
    let mut config = Config::default();
    config.window.width = 80;
    config.window.height = 60;
    config.paths.focus_file = PathBuf::from("does-not-exist/focus.txt");
    Shell::with_locator(&config, "ocal2".into(), Arc::new(opener), Box::new(|_| Ok(0)))
}

#[test]
fn controller_opens_renders_and_closes() {
    let mut shell = controller();
    shell.run_command(Command::OpenCamera);
    let deadline = Instant::now() + Duration::from_secs(2);
    while shell.session().state() == SessionState::Opening && Instant::now() < deadline {
        shell.tick();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(shell.session().is_streaming());
    // Missing focus file falls back to the origin.
    assert_eq!(shell.overlay().focus_center(), (0.0, 0.0));

    let deadline = Instant::now() + Duration::from_secs(2);
    while !shell.surface().has_frame() && Instant::now() < deadline {
        shell.tick();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(shell.surface().has_frame());

    shell.run_command(Command::CloseCamera);
    assert!(!shell.surface().has_frame());
    assert_eq!(shell.session().state(), SessionState::Idle);
}

#[test]
fn wheel_zooms_within_bounds() {
    let mut shell = controller();
    assert_eq!(shell.surface().zoom().factor(), MIN_ZOOM);

    shell.on_wheel(1.0);
    let zoom = shell.surface().zoom().factor();
    assert!((zoom - MIN_ZOOM * ZOOM_STEP).abs() < 1e-5);

    shell.on_wheel(-50.0);
    assert_eq!(shell.surface().zoom().factor(), MIN_ZOOM);
}

#[test]
fn property_writes_survive_reads_longer_than_a_second() {
    let (opener, counters) = SlowOpener::new(Duration::from_millis(1100));
    let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
    session.open_blocking(0).expect("start");
    thread::sleep(Duration::from_millis(20));

    assert!(session.set_property(CameraProperty::Exposure, 9000.0));
    assert_eq!(session.get_property(CameraProperty::Exposure), 9000.0);
    assert_eq!(counters.exposure.load(Ordering::SeqCst), 9000);
}
