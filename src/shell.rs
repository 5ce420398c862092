//! The controller: owns every piece of state and turns input into actions.

use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use minifb::Key;

use crate::camera::{CaptureSession, DeviceOpener, SessionState};
use crate::config::Config;
use crate::controls::{ControlEvent, ControlId, ControlTarget, ControlValue, DispatchTable};
use crate::error::{Error, Result};
use crate::focus::read_focus_center;
use crate::locator::{self, Platform};
use crate::overlay::{CIRCLE_COUNT, OverlayState};
use crate::render::RenderSurface;
use crate::settings::{SettingsPanel, auto_toggle_for};
use crate::types::Rgb;
use crate::view::WHEEL_NOTCH;

/// Colors the color key cycles through.
const PALETTE: [Rgb; 8] = [
    Rgb::RED,
    Rgb::GREEN,
    Rgb::BLUE,
    Rgb::PURPLE,
    Rgb::WHITE,
    Rgb::new(255, 255, 0),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 0, 255),
];

/// Button-style actions outside the overlay controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenCamera,
    CloseCamera,
    ToggleSettings,
    Exit,
}

/// Which overlay element the arrow keys adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Circle(usize),
    Cross,
    Offset,
}

impl Target {
    fn next(self) -> Target {
        match self {
            Target::Circle(i) if i + 1 < CIRCLE_COUNT => Target::Circle(i + 1),
            Target::Circle(_) => Target::Cross,
            Target::Cross => Target::Offset,
            Target::Offset => Target::Circle(0),
        }
    }

    fn label(self) -> String {
        match self {
            Target::Circle(i) => format!("circle {}", i + 1),
            Target::Cross => "cross".to_string(),
            Target::Offset => "offset".to_string(),
        }
    }
}

/// One decoded key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Command(Command),
    Control(ControlEvent),
    Select(Target),
    SettingsSelect(i32),
    SettingsStep(i32),
}

/// Finds the camera index for a device-name substring.
pub type Locate = Box<dyn Fn(&str) -> Result<u32>>;

pub struct Shell {
    device_name: String,
    focus_file: PathBuf,
    locate: Locate,
    session: CaptureSession,
    overlay: OverlayState,
    settings: SettingsPanel,
    settings_open: bool,
    table: DispatchTable,
    surface: RenderSurface,
    target: Target,
    message: Option<String>,
    quit: bool,
}

impl Shell {
    /// Controller for the real camera stack on `platform`.
    pub fn new(config: &Config, platform: Platform, opener: Arc<dyn DeviceOpener>) -> Self {
        let locate: Locate = Box::new(move |needle| locator::locate(platform, needle));
        let device_name = config
            .camera
            .device_name
            .clone()
            .unwrap_or_else(|| platform.default_device_name().to_string());
        Self::with_locator(config, device_name, opener, locate)
    }

    /// Controller with an explicit device lookup.
    pub fn with_locator(
        config: &Config,
        device_name: String,
        opener: Arc<dyn DeviceOpener>,
        locate: Locate,
    ) -> Self {
        let session = CaptureSession::new(opener, config.camera.capture_config());
        Self {
            device_name,
            focus_file: config.paths.focus_file.clone(),
            locate,
            session,
            overlay: config.overlay.to_state(),
            settings: SettingsPanel::default(),
            settings_open: false,
            table: DispatchTable::new(),
            surface: RenderSurface::new(config.window.width, config.window.height),
            target: Target::Circle(0),
            message: None,
            quit: false,
        }
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn settings(&self) -> &SettingsPanel {
        &self.settings
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn notify(&mut self, message: String) {
        self.message = Some(message);
        self.surface.request_redraw();
    }

    /// Locate the camera and start opening it on the capture thread.
    ///
    /// Returns without waiting for the backend; [`tick`](Self::tick) picks up
    /// the result. A missing camera leaves the session idle and shows a message.
    pub fn open_camera(&mut self) {
        if self.session.state() != SessionState::Idle {
            return;
        }
        let index = match (self.locate)(&self.device_name) {
            Ok(index) => index,
            Err(e @ Error::DeviceNotFound(_)) => {
                warn!("{e}");
                self.notify(format!("no camera {} found", self.device_name));
                return;
            }
            Err(e) => {
                error!("{e}");
                self.notify(format!("camera lookup failed: {e}"));
                return;
            }
        };

        if let Err(e) = self.session.start(index) {
            error!("{e}");
            self.notify(format!("cannot open camera {index}"));
            return;
        }
        self.notify(format!("opening camera {index}..."));
    }

    /// Finish a pending open: load the focus center on success, or show the error.
    fn poll_camera(&mut self) {
        match self.session.poll_open() {
            None => {}
            Some(Ok(_)) => {
                let (x, y) = read_focus_center(&self.focus_file);
                self.overlay.set_focus_center(x, y);
                if self.settings_open {
                    self.settings.refresh(&self.session);
                }
                self.message = None;
                self.surface.request_redraw();
                info!("Camera open, focus center ({x}, {y})");
            }
            Some(Err(e)) => {
                error!("{e}");
                self.notify(format!("cannot open camera: {e}"));
            }
        }
    }

    /// Stop streaming (or abandon a pending open) and blank the view.
    pub fn close_camera(&mut self) {
        self.session.stop();
        self.message = None;
        self.surface.clear_frame();
        self.settings.refresh(&self.session);
    }

    pub fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
        if self.settings_open {
            self.settings.refresh(&self.session);
        }
        self.surface.request_redraw();
    }

    /// Stop the capture thread; called before the process exits.
    pub fn shutdown(&mut self) {
        self.quit = true;
        self.session.stop();
    }

    pub fn run_command(&mut self, command: Command) {
        match command {
            Command::OpenCamera => self.open_camera(),
            Command::CloseCamera => self.close_camera(),
            Command::ToggleSettings => self.toggle_settings(),
            Command::Exit => self.shutdown(),
        }
    }

    /// Route a control event through the dispatch table.
    pub fn dispatch(&mut self, event: ControlEvent) -> bool {
        let mut target = ControlTarget {
            overlay: &mut self.overlay,
            settings: &mut self.settings,
            session: &self.session,
        };
        let handled = self.table.dispatch(&mut target, event);
        self.surface.request_redraw();
        handled
    }

    /// Mouse wheel, in notches.
    pub fn on_wheel(&mut self, notches: f32) {
        self.surface.on_wheel(notches * WHEEL_NOTCH);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.surface.resize(width, height);
    }

    pub fn apply(&mut self, input: Input) {
        match input {
            Input::Command(c) => self.run_command(c),
            Input::Control(event) => {
                self.dispatch(event);
            }
            Input::Select(target) => {
                self.target = target;
                self.surface.request_redraw();
            }
            Input::SettingsSelect(delta) => {
                if delta > 0 {
                    self.settings.select_next();
                } else {
                    self.settings.select_prev();
                }
                self.surface.request_redraw();
            }
            Input::SettingsStep(steps) => {
                self.settings.step_selected(&self.session, steps);
                self.surface.request_redraw();
            }
        }
    }

    pub fn on_key(&mut self, key: Key, shift: bool) {
        if let Some(input) = self.key_input(key, shift) {
            self.apply(input);
        }
    }

    /// Translate a key press into an input, given the current state.
    ///
    /// Shift multiplies slider steps by ten.
    pub fn key_input(&self, key: Key, shift: bool) -> Option<Input> {
        let step = if shift { 10 } else { 1 };
        let int = |control, v: f32| Some(Input::Control(ControlEvent::new(control, ControlValue::Int(v.round() as i32))));
        let flag = |control, v: bool| Some(Input::Control(ControlEvent::new(control, ControlValue::Bool(!v))));

        /* --- Global keys ---
           Commands and show/hide toggles work whatever is selected. */
        match key {
            Key::O => return Some(Input::Command(Command::OpenCamera)),
            Key::C => return Some(Input::Command(Command::CloseCamera)),
            Key::S => return Some(Input::Command(Command::ToggleSettings)),
            Key::Escape | Key::Q => return Some(Input::Command(Command::Exit)),
            Key::Tab => return Some(Input::Select(self.target.next())),
            Key::Key1 | Key::Key2 | Key::Key3 => {
                let i = match key {
                    Key::Key1 => 0,
                    Key::Key2 => 1,
                    _ => 2,
                };
                let visible = self.overlay.circle(i).is_some_and(|c| c.visible);
                return flag(ControlId::CircleVisible(i), visible);
            }
            Key::Key4 | Key::X => return flag(ControlId::CrossVisible, self.overlay.cross().visible),
            Key::Key5 | Key::F => return flag(ControlId::OffsetEnabled, self.overlay.offset().enabled),
            _ => {}
        }

        /* --- Settings panel ---
           While it is open the arrows pick and nudge camera properties
           instead of the overlay. */
        if self.settings_open {
            let selected = self.settings.selected();
            return match key {
                Key::Left => Some(Input::SettingsSelect(-1)),
                Key::Right => Some(Input::SettingsSelect(1)),
                Key::Up => Some(Input::SettingsStep(step)),
                Key::Down => Some(Input::SettingsStep(-step)),
                Key::A => {
                    let toggle = auto_toggle_for(selected)?;
                    Some(Input::Control(ControlEvent::new(
                        ControlId::Camera(toggle),
                        ControlValue::Bool(!self.settings.is_auto(toggle)),
                    )))
                }
                _ => None,
            };
        }

        /* --- Overlay target ---
           Up/Down: size (radius, length, offset y).
           Left/Right: stroke width or offset x.
           PageUp/PageDown: cross angle. K: next palette color.
           Each key sends the new absolute value; the dispatch table clamps it. */
        let step = step as f32;
        let cross = self.overlay.cross();
        let offset = self.overlay.offset();
        match (self.target, key) {
            (Target::Circle(i), Key::Up | Key::Down) => {
                let r = self.overlay.circle(i)?.radius;
                let d = if key == Key::Up { step } else { -step };
                int(ControlId::CircleRadius(i), r + d)
            }
            (Target::Circle(i), Key::Right | Key::Left) => {
                let t = self.overlay.circle(i)?.thickness;
                let d = if key == Key::Right { step } else { -step };
                int(ControlId::CircleThickness(i), t + d)
            }
            (Target::Circle(i), Key::K) => {
                let c = self.overlay.circle(i)?.color;
                Some(Input::Control(ControlEvent::new(
                    ControlId::CircleColor(i),
                    ControlValue::Color(next_color(c)),
                )))
            }
            (Target::Cross, Key::Up | Key::Down) => {
                let d = if key == Key::Up { step } else { -step };
                int(ControlId::CrossLength, cross.length + d)
            }
            (Target::Cross, Key::Right | Key::Left) => {
                let d = if key == Key::Right { step } else { -step };
                int(ControlId::CrossThickness, cross.thickness + d)
            }
            (Target::Cross, Key::PageUp | Key::PageDown) => {
                let d = if key == Key::PageUp { step } else { -step };
                int(ControlId::CrossAngle, cross.angle + d)
            }
            (Target::Cross, Key::K) => Some(Input::Control(ControlEvent::new(
                ControlId::CrossColor,
                ControlValue::Color(next_color(cross.color)),
            ))),
            (Target::Offset, Key::Up | Key::Down) => {
                let d = if key == Key::Up { step } else { -step };
                int(ControlId::OffsetY, offset.y + d)
            }
            (Target::Offset, Key::Right | Key::Left) => {
                let d = if key == Key::Right { step } else { -step };
                int(ControlId::OffsetX, offset.x + d)
            }
            _ => None,
        }
    }

    /// Finish a pending open, pull the newest frame, refresh the HUD and
    /// redraw if needed. Returns whether the screen changed.
    pub fn tick(&mut self) -> bool {
        self.poll_camera();
        if let Some(frame) = self.session.latest_frame() {
            self.surface.set_frame(frame);
        }
        let status = self.status_lines();
        self.surface.set_status(status);
        self.surface.render(&mut self.overlay)
    }

    fn status_lines(&self) -> Vec<String> {
        let camera = match (self.session.state(), self.session.stream_info()) {
            (SessionState::Streaming, Some(s)) => format!("camera: {}x{} @ {}", s.width, s.height, s.fps),
            (state, _) => format!("camera: {state}"),
        };
        let offset = self.overlay.offset();
        let mut lines = vec![format!(
            "{camera} | adjust: {} | offset: {} {} {}",
            self.target.label(),
            offset.x,
            offset.y,
            if offset.enabled { "on" } else { "off" }
        )];
        if let Some(message) = &self.message {
            lines.push(message.clone());
        }
        if self.settings_open {
            lines.extend(self.settings.lines());
            lines.push("left/right: select  up/down: adjust  a: auto".to_string());
        } else {
            lines.push(
                "o: open  c: close  s: settings  tab: select  1-5: show/hide  k: color  q: quit"
                    .to_string(),
            );
        }
        lines
    }
}

fn next_color(current: Rgb) -> Rgb {
    let i = PALETTE.iter().position(|&c| c == current).map_or(0, |i| i + 1);
    PALETTE[i % PALETTE.len()]
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.session.stop();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOpener;
    use std::io::Write;
    use std::thread;
    use std::time::{Duration, Instant};

    fn shell_with(locate: Locate, focus_file: PathBuf) -> Shell {
        shell_on(FakeOpener::new(), locate, focus_file)
    }

    fn shell_on(opener: FakeOpener, locate: Locate, focus_file: PathBuf) -> Shell {
        let mut config = Config::default();
        config.window.width = 64;
        config.window.height = 48;
        config.paths.focus_file = focus_file;
        Shell::with_locator(&config, "ocal2".to_string(), Arc::new(opener), locate)
    }

    fn shell() -> Shell {
        shell_with(Box::new(|_| Ok(0)), PathBuf::from("no-such-focus.txt"))
    }

    /// Open the camera and tick until the session leaves `Opening`.
    fn open(s: &mut Shell) {
        s.run_command(Command::OpenCamera);
        let deadline = Instant::now() + Duration::from_secs(2);
        while s.session().state() == SessionState::Opening && Instant::now() < deadline {
            s.tick();
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn missing_camera_stays_idle_with_a_message() {
        let mut s = shell_with(
            Box::new(|needle| Err(Error::DeviceNotFound(needle.to_string()))),
            PathBuf::from("no-such-focus.txt"),
        );
        s.run_command(Command::OpenCamera);
        assert_eq!(s.session().state(), SessionState::Idle);
        assert_eq!(s.message(), Some("no camera ocal2 found"));
    }

    #[test]
    fn open_camera_streams_and_loads_focus_center() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "ocal 1 1632.0 1224.0").expect("write");
        let mut s = shell_with(Box::new(|_| Ok(1)), file.path().to_path_buf());

        open(&mut s);
        assert!(s.session().is_streaming());
        assert_eq!(s.overlay().focus_center(), (1632.0, 1224.0));

        s.run_command(Command::CloseCamera);
        assert_eq!(s.session().state(), SessionState::Idle);
        assert!(!s.surface().has_frame());
    }

    #[test]
    fn number_keys_toggle_visibility() {
        let mut s = shell();
        s.on_key(Key::Key2, false);
        s.on_key(Key::Key4, false);
        assert!(s.overlay().circle(1).is_some_and(|c| c.visible));
        assert!(s.overlay().cross().visible);

        s.on_key(Key::Key2, false);
        assert!(!s.overlay().circle(1).is_some_and(|c| c.visible));
    }

    #[test]
    fn tab_cycles_through_every_target() {
        let mut s = shell();
        let mut seen = vec![s.target()];
        for _ in 0..4 {
            s.on_key(Key::Tab, false);
            seen.push(s.target());
        }
        assert_eq!(
            seen,
            vec![
                Target::Circle(0),
                Target::Circle(1),
                Target::Circle(2),
                Target::Cross,
                Target::Offset
            ]
        );
        s.on_key(Key::Tab, false);
        assert_eq!(s.target(), Target::Circle(0));
    }

    #[test]
    fn arrows_adjust_the_selected_target() {
        let mut s = shell();
        s.on_key(Key::Up, false);
        s.on_key(Key::Up, true);
        assert_eq!(s.overlay().circle(0).map(|c| c.radius), Some(511.0));

        s.apply(Input::Select(Target::Offset));
        s.on_key(Key::Right, true);
        s.on_key(Key::Right, true);
        s.on_key(Key::Down, false);
        let offset = *s.overlay().offset();
        assert_eq!((offset.x, offset.y), (20.0, -1.0));
    }

    #[test]
    fn cross_angle_and_color() {
        let mut s = shell();
        s.apply(Input::Select(Target::Cross));
        s.on_key(Key::PageDown, false);
        assert_eq!(s.overlay().cross().angle, 359.0);

        s.on_key(Key::K, false);
        assert_eq!(s.overlay().cross().color, Rgb::WHITE);
    }

    #[test]
    fn settings_panel_takes_the_arrow_keys() {
        let mut s = shell();
        open(&mut s);
        s.on_key(Key::S, false);
        assert!(s.settings_open());

        let selected = s.settings().selected();
        s.on_key(Key::Up, true);
        assert_eq!(s.settings().value(selected), 10.0);
        assert_eq!(s.overlay().circle(0).map(|c| c.radius), Some(500.0));

        s.on_key(Key::Right, false);
        assert_ne!(s.settings().selected(), selected);
    }

    #[test]
    fn tick_shows_camera_frames() {
        let mut s = shell();
        open(&mut s);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !s.surface().has_frame() && Instant::now() < deadline {
            s.tick();
            thread::sleep(Duration::from_millis(1));
        }
        assert!(s.surface().has_frame());
    }

    #[test]
    fn quit_keys_stop_the_session() {
        let mut s = shell();
        open(&mut s);
        s.on_key(Key::Q, false);
        assert!(s.should_quit());
        assert_eq!(s.session().state(), SessionState::Idle);
    }

    #[test]
    fn slow_open_does_not_block_the_window() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "ocal 1 40.0 30.0").expect("write");
        let mut s = shell_on(
            FakeOpener::slow(Duration::from_millis(300)),
            Box::new(|_| Ok(0)),
            file.path().to_path_buf(),
        );

        let began = Instant::now();
        s.run_command(Command::OpenCamera);
        assert!(began.elapsed() < Duration::from_millis(200));
        assert_eq!(s.session().state(), SessionState::Opening);
        assert_eq!(s.message(), Some("opening camera 0..."));
        // Focus center is loaded only once the device is actually open.
        s.tick();
        assert_eq!(s.overlay().focus_center(), (0.0, 0.0));

        let deadline = Instant::now() + Duration::from_secs(2);
        while s.session().state() == SessionState::Opening && Instant::now() < deadline {
            s.tick();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(s.session().is_streaming());
        assert_eq!(s.overlay().focus_center(), (40.0, 30.0));
        assert_eq!(s.message(), None);
    }

    #[test]
    fn failed_open_shows_the_error() {
        let mut s = shell_on(
            FakeOpener::failing(),
            Box::new(|_| Ok(3)),
            PathBuf::from("no-such-focus.txt"),
        );
        open(&mut s);
        assert_eq!(s.session().state(), SessionState::Idle);
        assert!(s.message().is_some_and(|m| m.starts_with("cannot open camera")));
    }

    #[test]
    fn quitting_during_a_slow_open_returns_promptly() {
        let mut s = shell_on(
            FakeOpener::slow(Duration::from_millis(500)),
            Box::new(|_| Ok(0)),
            PathBuf::from("no-such-focus.txt"),
        );
        s.run_command(Command::OpenCamera);
        let began = Instant::now();
        s.on_key(Key::Escape, false);
        assert!(began.elapsed() < Duration::from_millis(100));
        assert!(s.should_quit());
        assert_eq!(s.session().state(), SessionState::Idle);
    }
}
