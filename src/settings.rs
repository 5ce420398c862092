//! Live camera settings, read and written through the capture session.

use std::collections::HashMap;

use log::debug;

use crate::camera::{AUTO_EXPOSURE_OFF, AUTO_EXPOSURE_ON, CameraProperty, CaptureSession};

/// The manual control an auto toggle takes over, if any.
fn governed_by(toggle: CameraProperty) -> Option<CameraProperty> {
    match toggle {
        CameraProperty::AutoFocus => Some(CameraProperty::Focus),
        CameraProperty::AutoExposure => Some(CameraProperty::Exposure),
        // No white balance slider: the temperature control stays usable.
        _ => None,
    }
}

/// The auto toggle paired with a manual control.
pub fn auto_toggle_for(property: CameraProperty) -> Option<CameraProperty> {
    match property {
        CameraProperty::Focus => Some(CameraProperty::AutoFocus),
        CameraProperty::Exposure => Some(CameraProperty::AutoExposure),
        CameraProperty::Temperature => Some(CameraProperty::AutoWhiteBalance),
        _ => None,
    }
}

/// Value written to a toggle for on/off.
fn toggle_value(toggle: CameraProperty, on: bool) -> f64 {
    match (toggle, on) {
        (CameraProperty::AutoExposure, true) => AUTO_EXPOSURE_ON,
        (CameraProperty::AutoExposure, false) => AUTO_EXPOSURE_OFF,
        (_, true) => 1.0,
        (_, false) => 0.0,
    }
}

fn toggle_is_on(toggle: CameraProperty, raw: f64) -> bool {
    match toggle {
        CameraProperty::AutoExposure => raw > (AUTO_EXPOSURE_ON + AUTO_EXPOSURE_OFF) / 2.0,
        _ => raw != 0.0,
    }
}

/// Panel state: last values read back from the device and which slider is selected.
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    values: HashMap<CameraProperty, f64>,
    selected: usize,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            selected: 0,
        }
    }
}

impl SettingsPanel {
    /// Build the panel from the device's current values (all zero when no camera is open).
    pub fn open(session: &CaptureSession) -> Self {
        let mut panel = Self::default();
        panel.refresh(session);
        panel
    }

    /// Re-read every property from the device.
    pub fn refresh(&mut self, session: &CaptureSession) {
        for property in CameraProperty::ADJUSTABLE
            .into_iter()
            .chain(CameraProperty::TOGGLES)
        {
            self.values.insert(property, session.get_property(property));
        }
    }

    /// Last read-back value.
    pub fn value(&self, property: CameraProperty) -> f64 {
        self.values.get(&property).copied().unwrap_or(0.0)
    }

    pub fn is_auto(&self, toggle: CameraProperty) -> bool {
        toggle_is_on(toggle, self.value(toggle))
    }

    /// A manual control is disabled while its auto toggle is on.
    pub fn is_enabled(&self, property: CameraProperty) -> bool {
        !CameraProperty::TOGGLES
            .into_iter()
            .any(|t| governed_by(t) == Some(property) && self.is_auto(t))
    }

    /// Clamp to the control's range, write, read back and remember the readback.
    ///
    /// Returns the value the device reports afterwards. A rejected write shows
    /// up as an unchanged value.
    pub fn set(&mut self, session: &CaptureSession, property: CameraProperty, value: f64) -> f64 {
        if !self.is_enabled(property) {
            debug!("{property} is under automatic control");
            return self.value(property);
        }
        let value = match property.range() {
            Some(range) => value.clamp(*range.start() as f64, *range.end() as f64),
            None => value,
        };
        session.set_property(property, value);
        let actual = session.get_property(property);
        debug!("Updated {property} to {actual}");
        self.values.insert(property, actual);
        actual
    }

    /// Switch an auto toggle. Auto exposure writes the backend sentinel, not a boolean.
    pub fn set_auto(&mut self, session: &CaptureSession, toggle: CameraProperty, on: bool) {
        session.set_property(toggle, toggle_value(toggle, on));
        let actual = session.get_property(toggle);
        debug!("Updated {toggle} to {actual}");
        self.values.insert(toggle, actual);
        if let Some(manual) = governed_by(toggle) {
            self.values.insert(manual, session.get_property(manual));
        }
    }

    pub fn selected(&self) -> CameraProperty {
        CameraProperty::ADJUSTABLE[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % CameraProperty::ADJUSTABLE.len();
    }

    pub fn select_prev(&mut self) {
        let n = CameraProperty::ADJUSTABLE.len();
        self.selected = (self.selected + n - 1) % n;
    }

    /// Nudge the selected control by `steps` hundredths of its range (at least 1 per step).
    pub fn step_selected(&mut self, session: &CaptureSession, steps: i32) -> f64 {
        let property = self.selected();
        let step = property
            .range()
            .map(|r| ((r.end() - r.start()) / 100).max(1))
            .unwrap_or(1);
        let target = self.value(property) + (step * steps) as f64;
        self.set(session, property, target)
    }

    /// One line per control for the HUD, the selected one marked.
    pub fn lines(&self) -> Vec<String> {
        CameraProperty::ADJUSTABLE
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let marker = if i == self.selected { '>' } else { ' ' };
                let auto = auto_toggle_for(p)
                    .filter(|&t| self.is_auto(t))
                    .map(|_| " AUTO")
                    .unwrap_or("");
                format!("{marker} {}: {}{auto}", p.label(), self.value(p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CaptureConfig;
    use crate::testing::{FakeOpener, FakeState};
    use std::sync::Arc;

    fn streaming() -> (CaptureSession, Arc<FakeState>) {
        let opener = FakeOpener::new();
        let state = opener.state();
        let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
        session.open_blocking(0).expect("fake camera opens");
        (session, state)
    }

    #[test]
    fn no_device_reads_zero() {
        let session = CaptureSession::new(Arc::new(FakeOpener::new()), CaptureConfig::default());
        let panel = SettingsPanel::open(&session);
        for p in CameraProperty::ADJUSTABLE {
            assert_eq!(panel.value(p), 0.0);
        }
    }

    #[test]
    fn writes_are_clamped_and_read_back() {
        let (session, state) = streaming();
        let mut panel = SettingsPanel::open(&session);
        assert_eq!(panel.set(&session, CameraProperty::Brightness, 500.0), 64.0);
        assert_eq!(state.value(CameraProperty::Brightness), Some(64.0));
    }

    #[test]
    fn rejected_write_leaves_value_unchanged() {
        let (session, state) = streaming();
        state.reject(CameraProperty::Hue);
        state.put(CameraProperty::Hue, 90.0);
        let mut panel = SettingsPanel::open(&session);
        assert_eq!(panel.set(&session, CameraProperty::Hue, 10.0), 90.0);
    }

    #[test]
    fn auto_exposure_uses_sentinels_and_locks_exposure() {
        let (session, state) = streaming();
        let mut panel = SettingsPanel::open(&session);

        panel.set_auto(&session, CameraProperty::AutoExposure, true);
        assert_eq!(state.value(CameraProperty::AutoExposure), Some(AUTO_EXPOSURE_ON));
        assert!(!panel.is_enabled(CameraProperty::Exposure));
        assert!(panel.is_enabled(CameraProperty::Focus));

        panel.set_auto(&session, CameraProperty::AutoExposure, false);
        assert_eq!(state.value(CameraProperty::AutoExposure), Some(AUTO_EXPOSURE_OFF));
        assert!(panel.is_enabled(CameraProperty::Exposure));
    }

    #[test]
    fn auto_focus_blocks_manual_focus_writes() {
        let (session, state) = streaming();
        state.put(CameraProperty::Focus, 300.0);
        let mut panel = SettingsPanel::open(&session);
        panel.set_auto(&session, CameraProperty::AutoFocus, true);
        assert_eq!(panel.set(&session, CameraProperty::Focus, 10.0), 300.0);
        assert_eq!(state.value(CameraProperty::Focus), Some(300.0));
    }

    #[test]
    fn selection_wraps() {
        let mut panel = SettingsPanel::default();
        panel.select_prev();
        assert_eq!(panel.selected(), CameraProperty::Exposure);
        panel.select_next();
        assert_eq!(panel.selected(), CameraProperty::Brightness);
    }

    #[test]
    fn open_lists_every_property_from_the_device() {
        let (session, state) = streaming();
        state.put(CameraProperty::Gamma, 120.0);
        let lines = SettingsPanel::open(&session).lines();
        assert_eq!(lines.len(), CameraProperty::ADJUSTABLE.len());
        assert_eq!(lines[0], "> brightness: 0");
        assert!(lines.contains(&"  gamma: 120".to_string()));
    }

    #[test]
    fn step_during_long_reads_continues_from_the_device_value() {
        let opener = FakeOpener::with_read_time(std::time::Duration::from_millis(600));
        let state = opener.state();
        state.put(CameraProperty::Exposure, 9000.0);
        let mut session = CaptureSession::new(Arc::new(opener), CaptureConfig::default());
        session.open_blocking(0).expect("fake camera opens");

        let mut panel = SettingsPanel::open(&session);
        panel.select_prev();
        assert_eq!(panel.value(CameraProperty::Exposure), 9000.0);
        assert_eq!(panel.step_selected(&session, 1), 9099.0);
        assert_eq!(state.value(CameraProperty::Exposure), Some(9099.0));
    }
}
