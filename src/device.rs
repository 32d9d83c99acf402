//! Device abstraction: normalizes keyboard, controller and wheel input into
//! per-axis floats and per-button edge/hold state.
//!
//! Real device polling and force-feedback output live outside the crate
//! behind [`InputSource`]; everything here is pure bookkeeping against the
//! previous tick's snapshot, shared across device kinds.

use std::collections::HashMap;

use crate::types::{Axis, ButtonState, ControlId, InputDevice, InputFrame};

/// Hold time below which a press-release counts as a tap.
pub const TAP_WINDOW_MS: u64 = 200;

/// Axis magnitude that marks a device as actively used.
const DEVICE_ACTIVITY_THRESHOLD: f32 = 0.15;

/// Boundary to the real input layer.
///
/// `axis` returns `None` when the axis is unavailable on that device (device
/// unplugged, unbound); the overlay treats that as "feature inactive", never
/// as an error. `button` returns `None` for unbound controls.
pub trait InputSource {
    fn axis(&self, axis: Axis, device: InputDevice) -> Option<f32>;
    fn button(&self, id: ControlId) -> Option<bool>;
    /// A wheel device is connected and initialized.
    fn wheel_available(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
struct HoldRecord {
    down: bool,
    pressed_at_ms: u64,
}

/// Edge/hold/tap detection against the previous tick's snapshot, generic
/// over the device kind carried in each [`ControlId`].
#[derive(Debug, Default)]
pub struct ButtonTracker {
    records: HashMap<ControlId, HoldRecord>,
}

impl ButtonTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample every trackable control and produce this tick's button states.
    pub fn sample(
        &mut self,
        source: &impl InputSource,
        now_ms: u64,
    ) -> HashMap<ControlId, ButtonState> {
        let mut states = HashMap::new();
        for id in ControlId::all() {
            let (bound, down) = match source.button(id) {
                Some(down) => (true, down),
                None => (false, false),
            };
            let record = self.records.entry(id).or_default();
            let just_pressed = down && !record.down;
            let just_released = !down && record.down;
            let held_ms = if down {
                if just_pressed {
                    record.pressed_at_ms = now_ms;
                }
                now_ms.saturating_sub(record.pressed_at_ms)
            } else {
                0
            };
            let tapped =
                just_released && now_ms.saturating_sub(record.pressed_at_ms) < TAP_WINDOW_MS;
            record.down = down;
            states.insert(
                id,
                ButtonState { bound, down, just_pressed, just_released, held_ms, tapped },
            );
        }
        states
    }

    /// Forget all press history (device re-init).
    pub fn reset(&mut self) {
        self.records.clear();
    }
}

/// Per-tick input poller: device detection, pedal axes, button edges.
#[derive(Debug, Default)]
pub struct InputPoller {
    tracker: ButtonTracker,
    last_device: Option<InputDevice>,
}

impl InputPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that most recently produced meaningful input.
    pub fn last_device(&self) -> Option<InputDevice> {
        self.last_device
    }

    /// Poll the source once and build this tick's [`InputFrame`].
    ///
    /// Device detection is sticky: the active device only changes when a
    /// different device shows axis movement or a pressed button. When
    /// `wheel_enabled` is false the wheel never becomes the active device.
    pub fn poll(
        &mut self,
        source: &impl InputSource,
        now_ms: u64,
        wheel_enabled: bool,
    ) -> InputFrame {
        let buttons = self.tracker.sample(source, now_ms);

        let mut candidates = vec![InputDevice::Keyboard, InputDevice::Controller];
        if wheel_enabled && source.wheel_available() {
            candidates.push(InputDevice::Wheel);
        }

        for device in &candidates {
            if self.device_active(source, &buttons, *device) {
                if self.last_device != Some(*device) {
                    tracing::debug!("Input device changed: {:?}", device);
                }
                self.last_device = Some(*device);
                break;
            }
        }

        let device = self.last_device.filter(|d| candidates.contains(d));
        let axis_for = |axis: Axis| -> f32 {
            device
                .and_then(|d| source.axis(axis, d))
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        };

        InputFrame {
            throttle: axis_for(Axis::Throttle),
            brake: axis_for(Axis::Brake),
            clutch: axis_for(Axis::Clutch),
            device,
            buttons,
        }
    }

    fn device_active(
        &self,
        source: &impl InputSource,
        buttons: &HashMap<ControlId, ButtonState>,
        device: InputDevice,
    ) -> bool {
        let axis_moved = [Axis::Throttle, Axis::Brake, Axis::Clutch, Axis::Steer]
            .iter()
            .any(|&axis| {
                source
                    .axis(axis, device)
                    .map(|v| v.abs() > DEVICE_ACTIVITY_THRESHOLD)
                    .unwrap_or(false)
            });
        let button_down = buttons
            .iter()
            .any(|(id, state)| id.device() == device && state.down);
        axis_moved || button_down
    }

    /// Reset edge-detection history (window focus regained, wheel re-init).
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
