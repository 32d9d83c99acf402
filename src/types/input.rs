//! Normalized per-tick input state.
//!
//! Each input device kind carries its own control enumeration; [`ControlId`]
//! tags them into one identifier space so edge detection and the shifting
//! algorithms stay generic over the active device. An [`InputFrame`] is the
//! immutable result of one device poll: pedal axes plus edge-detected button
//! states.

use std::collections::HashMap;

/// Which physical device produced the most recent input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputDevice {
    Keyboard,
    Controller,
    Wheel,
}

/// Logical pedal/steering axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Throttle,
    Brake,
    Clutch,
    Steer,
    Handbrake,
}

/// Keyboard-bound controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardControl {
    Toggle,
    ToggleH,
    ShiftUp,
    ShiftDown,
    Engine,
    /// Direct H-pattern gear selection; 0 is reverse.
    HGear(u8),
    HNeutral,
}

/// Controller-bound controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerControl {
    Toggle,
    ToggleH,
    ShiftUp,
    ShiftDown,
    Engine,
}

/// Wheel-bound controls, including the H-shifter lever positions and the
/// automatic-mode selector gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelControl {
    Toggle,
    ToggleH,
    ShiftUp,
    ShiftDown,
    Engine,
    /// H-shifter lever position; 0 is reverse.
    HGear(u8),
    /// Automatic selector: park.
    Park,
    /// Automatic selector: reverse.
    Reverse,
    /// Automatic selector: neutral (may be unbound; see
    /// [`InputFrame::is_bound`]).
    Neutral,
    /// Automatic selector: drive.
    Drive,
}

/// Tagged control identifier across device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Keyboard(KeyboardControl),
    Controller(ControllerControl),
    Wheel(WheelControl),
}

impl ControlId {
    /// Device kind this control belongs to.
    pub fn device(&self) -> InputDevice {
        match self {
            ControlId::Keyboard(_) => InputDevice::Keyboard,
            ControlId::Controller(_) => InputDevice::Controller,
            ControlId::Wheel(_) => InputDevice::Wheel,
        }
    }

    /// Enumerate every trackable control. Drives edge detection; lever
    /// positions are enumerated up to [`MAX_H_GEAR`].
    pub fn all() -> Vec<ControlId> {
        let mut ids = vec![
            ControlId::Keyboard(KeyboardControl::Toggle),
            ControlId::Keyboard(KeyboardControl::ToggleH),
            ControlId::Keyboard(KeyboardControl::ShiftUp),
            ControlId::Keyboard(KeyboardControl::ShiftDown),
            ControlId::Keyboard(KeyboardControl::Engine),
            ControlId::Keyboard(KeyboardControl::HNeutral),
            ControlId::Controller(ControllerControl::Toggle),
            ControlId::Controller(ControllerControl::ToggleH),
            ControlId::Controller(ControllerControl::ShiftUp),
            ControlId::Controller(ControllerControl::ShiftDown),
            ControlId::Controller(ControllerControl::Engine),
            ControlId::Wheel(WheelControl::Toggle),
            ControlId::Wheel(WheelControl::ToggleH),
            ControlId::Wheel(WheelControl::ShiftUp),
            ControlId::Wheel(WheelControl::ShiftDown),
            ControlId::Wheel(WheelControl::Engine),
            ControlId::Wheel(WheelControl::Park),
            ControlId::Wheel(WheelControl::Reverse),
            ControlId::Wheel(WheelControl::Neutral),
            ControlId::Wheel(WheelControl::Drive),
        ];
        for gear in 0..=MAX_H_GEAR {
            ids.push(ControlId::Keyboard(KeyboardControl::HGear(gear)));
            ids.push(ControlId::Wheel(WheelControl::HGear(gear)));
        }
        ids
    }
}

/// Highest H-shifter lever position tracked (gear 10).
pub const MAX_H_GEAR: u8 = 10;

/// Edge-detected state of one button for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonState {
    /// The control has a binding on its device.
    pub bound: bool,
    pub down: bool,
    pub just_pressed: bool,
    pub just_released: bool,
    /// Milliseconds the button has been held, 0 when up.
    pub held_ms: u64,
    /// Released this tick after a hold shorter than the tap window.
    pub tapped: bool,
}

/// One tick's worth of normalized input.
///
/// Replaced wholesale each tick by the device abstraction; pedal axes are in
/// `[0, 1]` with unavailable axes reading 0.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    /// Last device that produced meaningful input.
    pub device: Option<InputDevice>,
    pub(crate) buttons: HashMap<ControlId, ButtonState>,
}

impl InputFrame {
    fn state(&self, id: ControlId) -> ButtonState {
        self.buttons.get(&id).copied().unwrap_or_default()
    }

    pub fn is_bound(&self, id: ControlId) -> bool {
        self.state(id).bound
    }

    pub fn is_down(&self, id: ControlId) -> bool {
        self.state(id).down
    }

    pub fn just_pressed(&self, id: ControlId) -> bool {
        self.state(id).just_pressed
    }

    pub fn just_released(&self, id: ControlId) -> bool {
        self.state(id).just_released
    }

    /// Held continuously for at least `ms` milliseconds.
    pub fn held_for(&self, id: ControlId, ms: u64) -> bool {
        let state = self.state(id);
        state.down && state.held_ms >= ms
    }

    /// Pressed and released within the tap window.
    pub fn tapped(&self, id: ControlId) -> bool {
        self.state(id).tapped
    }

    /// True when the active device is `device`.
    pub fn device_is(&self, device: InputDevice) -> bool {
        self.device == Some(device)
    }
}
