//! Gearbox state machine.
//!
//! Owns gear selection and the shift-clutch blend. A shift with auto-clutch
//! runs a declutch/commit/reclutch cycle over several ticks:
//!
//! 1. shift initiated, next gear set
//! 2. clutch blend ramps up (disengaging)
//! 3. gear commits at full disengagement
//! 4. clutch blend ramps back down (re-engaging)
//! 5. shift done
//!
//! Without auto-clutch (H-pattern, reverse/neutral hops) the gear commits
//! immediately. Three mutually exclusive per-tick algorithms drive the
//! machine: [`sequential`], [`hpattern`] and [`automatic`].

pub mod automatic;
pub mod hpattern;
pub mod sequential;

use crate::config::Profile;
use crate::types::{
    ControlId, ControllerControl, GearboxState, InputDevice, InputFrame, KeyboardControl,
    ShiftDirection, WheelControl,
};

/// Clutch blend beyond which the shift state is considered stuck.
const CLUTCH_BLEND_ABORT: f32 = 1.5;

/// Pedal clutch counts as pressed past the configured threshold.
pub fn is_clutch_pressed(input: &InputFrame, profile: &Profile) -> bool {
    input.clutch > 1.0 - profile.mt_params.clutch_threshold
}

/// Request a shift to `gear`.
///
/// With `auto_clutch` the request starts a blended shift; requests arriving
/// while one is already in flight are dropped, not queued. Without
/// `auto_clutch` the gear is committed immediately with no transition.
pub fn shift_to(state: &mut GearboxState, gear: u8, auto_clutch: bool) {
    if auto_clutch {
        if state.shifting {
            return;
        }
        state.next_gear = gear;
        state.shifting = true;
        state.clutch_val = 0.0;
        state.shift_direction =
            if gear > state.lock_gear { ShiftDirection::Up } else { ShiftDirection::Down };
    } else {
        state.lock_gear = gear;
        state.next_gear = gear;
    }
}

/// Advance an in-flight shift by one tick.
///
/// `rate_up`/`rate_down` are the vehicle's handling clutch change rates;
/// together with the configured multiplier they set how much blend is covered
/// per second. The whole cycle takes roughly `1 / rate` seconds, so the
/// per-tick step is scaled by 4.
pub fn update_shifting(
    state: &mut GearboxState,
    rate_up: f32,
    rate_down: f32,
    clutch_rate_mult: f32,
    dt: f32,
) {
    if !state.shifting {
        return;
    }

    let rate = match state.shift_direction {
        ShiftDirection::Up => rate_up,
        ShiftDirection::Down => rate_down,
    };
    let step = rate * clutch_rate_mult * dt * 4.0;

    // Stuck shift: snap to the target gear and recover.
    if state.clutch_val > CLUTCH_BLEND_ABORT {
        tracing::warn!(
            clutch_val = state.clutch_val,
            "Shift blend out of bounds, force-completing shift to gear {}",
            state.next_gear
        );
        state.clutch_val = 0.0;
        state.shifting = false;
        state.lock_gear = state.next_gear;
        return;
    }

    if state.next_gear != state.lock_gear {
        state.clutch_val += step;
    }
    if state.clutch_val >= 1.0 && state.lock_gear != state.next_gear {
        state.lock_gear = state.next_gear;
        return;
    }
    if state.next_gear == state.lock_gear {
        state.clutch_val -= step;
    }
    if state.clutch_val < 0.0 && state.next_gear == state.lock_gear {
        state.clutch_val = 0.0;
        state.shifting = false;
    }
}

/// Shift-up request edge for the active device.
pub fn shift_up_requested(input: &InputFrame) -> bool {
    let keyboard_allowed = matches!(
        input.device,
        Some(InputDevice::Keyboard) | Some(InputDevice::Controller)
    );
    (input.device_is(InputDevice::Controller)
        && input.tapped(ControlId::Controller(ControllerControl::ShiftUp)))
        || (keyboard_allowed
            && input.just_pressed(ControlId::Keyboard(KeyboardControl::ShiftUp)))
        || (input.device_is(InputDevice::Wheel)
            && input.just_pressed(ControlId::Wheel(WheelControl::ShiftUp)))
}

/// Shift-down request edge for the active device.
pub fn shift_down_requested(input: &InputFrame) -> bool {
    let keyboard_allowed = matches!(
        input.device,
        Some(InputDevice::Keyboard) | Some(InputDevice::Controller)
    );
    (input.device_is(InputDevice::Controller)
        && input.tapped(ControlId::Controller(ControllerControl::ShiftDown)))
        || (keyboard_allowed
            && input.just_pressed(ControlId::Keyboard(KeyboardControl::ShiftDown)))
        || (input.device_is(InputDevice::Wheel)
            && input.just_pressed(ControlId::Wheel(WheelControl::ShiftDown)))
}
