//! Control dispatch: maps control identifiers to state mutations.
//!
//! Whatever produces input (keyboard bindings today) only emits
//! [`ControlEvent`]s; the [`DispatchTable`] owns what each control does.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use log::{debug, warn};

use crate::camera::{CameraProperty, CaptureSession};
use crate::overlay::{CIRCLE_COUNT, CircleProperty, CrossProperty, OverlayState};
use crate::settings::SettingsPanel;
use crate::types::Rgb;

pub const RADIUS_RANGE: RangeInclusive<i32> = 0..=2000;
pub const THICKNESS_RANGE: RangeInclusive<i32> = 1..=50;
pub const LENGTH_RANGE: RangeInclusive<i32> = 0..=2000;
pub const ANGLE_RANGE: RangeInclusive<i32> = 0..=359;
pub const OFFSET_RANGE: RangeInclusive<i32> = -20..=20;

/// Every user-adjustable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    CircleRadius(usize),
    CircleThickness(usize),
    CircleVisible(usize),
    CircleColor(usize),
    CrossVisible,
    CrossLength,
    CrossThickness,
    CrossAngle,
    CrossColor,
    OffsetX,
    OffsetY,
    OffsetEnabled,
    Camera(CameraProperty),
}

/// What a control reports: a slider position, a checkbox state or a picked color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Int(i32),
    Bool(bool),
    Color(Rgb),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEvent {
    pub control: ControlId,
    pub value: ControlValue,
}

impl ControlEvent {
    pub fn new(control: ControlId, value: ControlValue) -> Self {
        Self { control, value }
    }
}

/// The state a control may touch. Borrowed for the duration of one dispatch.
pub struct ControlTarget<'a> {
    pub overlay: &'a mut OverlayState,
    pub settings: &'a mut SettingsPanel,
    pub session: &'a CaptureSession,
}

type Handler = Box<dyn Fn(&mut ControlTarget<'_>, ControlValue) -> bool>;

pub struct DispatchTable {
    handlers: HashMap<ControlId, Handler>,
}

fn clamp(v: i32, range: &RangeInclusive<i32>) -> f32 {
    v.clamp(*range.start(), *range.end()) as f32
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    /// Table wired to the overlay, offset and camera settings controls.
    pub fn new() -> Self {
        let mut table = Self {
            handlers: HashMap::new(),
        };

        for i in 0..CIRCLE_COUNT {
            table.on(ControlId::CircleRadius(i), move |t, v| match v {
                ControlValue::Int(r) => {
                    t.overlay.set_circle_property(i, CircleProperty::Radius(clamp(r, &RADIUS_RANGE)));
                    true
                }
                _ => false,
            });
            table.on(ControlId::CircleThickness(i), move |t, v| match v {
                ControlValue::Int(w) => {
                    t.overlay
                        .set_circle_property(i, CircleProperty::Thickness(clamp(w, &THICKNESS_RANGE)));
                    true
                }
                _ => false,
            });
            table.on(ControlId::CircleVisible(i), move |t, v| match v {
                ControlValue::Bool(on) => {
                    t.overlay.set_circle_property(i, CircleProperty::Visible(on));
                    true
                }
                _ => false,
            });
            table.on(ControlId::CircleColor(i), move |t, v| match v {
                ControlValue::Color(c) => {
                    t.overlay.set_circle_property(i, CircleProperty::Color(c));
                    true
                }
                _ => false,
            });
        }

        table.on(ControlId::CrossVisible, |t, v| match v {
            ControlValue::Bool(on) => {
                t.overlay.set_cross_property(CrossProperty::Visible(on));
                true
            }
            _ => false,
        });
        table.on(ControlId::CrossLength, |t, v| match v {
            ControlValue::Int(l) => {
                t.overlay
                    .set_cross_property(CrossProperty::Length(clamp(l, &LENGTH_RANGE)));
                true
            }
            _ => false,
        });
        table.on(ControlId::CrossThickness, |t, v| match v {
            ControlValue::Int(w) => {
                t.overlay
                    .set_cross_property(CrossProperty::Thickness(clamp(w, &THICKNESS_RANGE)));
                true
            }
            _ => false,
        });
        table.on(ControlId::CrossAngle, |t, v| match v {
            ControlValue::Int(a) => {
                let a = a.rem_euclid(ANGLE_RANGE.end() + 1);
                t.overlay.set_cross_property(CrossProperty::Angle(a as f32));
                true
            }
            _ => false,
        });
        table.on(ControlId::CrossColor, |t, v| match v {
            ControlValue::Color(c) => {
                t.overlay.set_cross_property(CrossProperty::Color(c));
                true
            }
            _ => false,
        });

        table.on(ControlId::OffsetX, |t, v| match v {
            ControlValue::Int(x) => {
                let y = t.overlay.offset().y;
                t.overlay.set_offset(clamp(x, &OFFSET_RANGE), y);
                true
            }
            _ => false,
        });
        table.on(ControlId::OffsetY, |t, v| match v {
            ControlValue::Int(y) => {
                let x = t.overlay.offset().x;
                t.overlay.set_offset(x, clamp(y, &OFFSET_RANGE));
                true
            }
            _ => false,
        });
        table.on(ControlId::OffsetEnabled, |t, v| match v {
            ControlValue::Bool(on) => {
                t.overlay.set_offset_enabled(on);
                true
            }
            _ => false,
        });

        for property in CameraProperty::ADJUSTABLE {
            table.on(ControlId::Camera(property), move |t, v| match v {
                ControlValue::Int(x) => {
                    t.settings.set(t.session, property, x as f64);
                    true
                }
                _ => false,
            });
        }
        for toggle in CameraProperty::TOGGLES {
            table.on(ControlId::Camera(toggle), move |t, v| match v {
                ControlValue::Bool(on) => {
                    t.settings.set_auto(t.session, toggle, on);
                    true
                }
                _ => false,
            });
        }

        table
    }

    /// Register (or replace) the handler for `control`.
    pub fn on<F>(&mut self, control: ControlId, handler: F)
    where
        F: Fn(&mut ControlTarget<'_>, ControlValue) -> bool + 'static,
    {
        self.handlers.insert(control, Box::new(handler));
    }

    /// Run the handler for `event`. Returns false for unknown controls or a
    /// value of the wrong kind; neither changes any state.
    pub fn dispatch(&self, target: &mut ControlTarget<'_>, event: ControlEvent) -> bool {
        let Some(handler) = self.handlers.get(&event.control) else {
            warn!("No handler for {:?}", event.control);
            return false;
        };
        let handled = handler(target, event.value);
        if !handled {
            debug!("{:?} ignored value {:?}", event.control, event.value);
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CaptureConfig;
    use crate::testing::FakeOpener;
    use std::sync::Arc;

    struct Fixture {
        overlay: OverlayState,
        settings: SettingsPanel,
        session: CaptureSession,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                overlay: OverlayState::default(),
                settings: SettingsPanel::default(),
                session: CaptureSession::new(Arc::new(FakeOpener::new()), CaptureConfig::default()),
            }
        }

        fn send(&mut self, table: &DispatchTable, control: ControlId, value: ControlValue) -> bool {
            let mut target = ControlTarget {
                overlay: &mut self.overlay,
                settings: &mut self.settings,
                session: &self.session,
            };
            table.dispatch(&mut target, ControlEvent::new(control, value))
        }
    }

    #[test]
    fn every_control_has_a_handler() {
        let table = DispatchTable::new();
        // 4 per circle, 5 cross, 3 offset, 12 camera
        assert_eq!(table.handlers.len(), 4 * CIRCLE_COUNT + 5 + 3 + 12);
    }

    #[test]
    fn circle_controls_update_the_right_circle() {
        let table = DispatchTable::new();
        let mut f = Fixture::new();
        assert!(f.send(&table, ControlId::CircleRadius(1), ControlValue::Int(321)));
        assert!(f.send(&table, ControlId::CircleVisible(1), ControlValue::Bool(true)));
        assert!(f.send(&table, ControlId::CircleColor(1), ControlValue::Color(Rgb::WHITE)));

        let c = f.overlay.circle(1).copied().expect("circle 1");
        assert_eq!(c.radius, 321.0);
        assert!(c.visible);
        assert_eq!(c.color, Rgb::WHITE);
        assert_eq!(f.overlay.circle(0).map(|c| c.radius), Some(500.0));
    }

    #[test]
    fn sliders_are_clamped_to_their_range() {
        let table = DispatchTable::new();
        let mut f = Fixture::new();
        f.send(&table, ControlId::OffsetX, ControlValue::Int(99));
        f.send(&table, ControlId::OffsetY, ControlValue::Int(-99));
        assert_eq!((f.overlay.offset().x, f.overlay.offset().y), (20.0, -20.0));

        f.send(&table, ControlId::CrossThickness, ControlValue::Int(0));
        assert_eq!(f.overlay.cross().thickness, 1.0);

        f.send(&table, ControlId::CrossAngle, ControlValue::Int(-10));
        assert_eq!(f.overlay.cross().angle, 350.0);
    }

    #[test]
    fn wrong_value_kind_is_ignored() {
        let table = DispatchTable::new();
        let mut f = Fixture::new();
        let before = f.overlay.clone();
        assert!(!f.send(&table, ControlId::CircleRadius(0), ControlValue::Bool(true)));
        assert!(!f.send(&table, ControlId::CrossVisible, ControlValue::Int(1)));
        assert_eq!(f.overlay, before);
    }

    #[test]
    fn unknown_control_is_ignored() {
        let table = DispatchTable::new();
        let mut f = Fixture::new();
        assert!(!f.send(&table, ControlId::CircleRadius(7), ControlValue::Int(10)));
    }

    #[test]
    fn camera_controls_without_device_are_harmless() {
        let table = DispatchTable::new();
        let mut f = Fixture::new();
        assert!(f.send(&table, ControlId::Camera(CameraProperty::Focus), ControlValue::Int(200)));
        assert_eq!(f.settings.value(CameraProperty::Focus), 0.0);
    }

    #[test]
    fn custom_handlers_can_replace_defaults() {
        let mut table = DispatchTable::new();
        table.on(ControlId::CrossVisible, |_, _| false);
        let mut f = Fixture::new();
        assert!(!f.send(&table, ControlId::CrossVisible, ControlValue::Bool(true)));
        assert!(!f.overlay.cross().visible);
    }
}
