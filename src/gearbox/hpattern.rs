//! H-pattern shifting.
//!
//! Direct gear selection from lever positions (wheel) or number keys
//! (keyboard). A shift into any slot is validated against the drivetrain:
//! either the engine is rev-matched for the target gear or the clutch pedal
//! is in. A failed validation grinds into fake neutral instead and can
//! damage the engine.

use crate::config::{Profile, WheelOptions};
use crate::host::HostVehicle;
use crate::math::near;
use crate::types::{
    ControlId, GearboxState, InputDevice, InputFrame, KeyboardControl, VehicleTelemetry,
    WheelControl, MAX_H_GEAR,
};

use super::{is_clutch_pressed, shift_to};

/// Attempt a direct shift into `gear`.
///
/// Validation only applies when clutch shifting is enforced and the vehicle
/// has a clutch; everything else commits immediately. On a misshift the box
/// drops into fake neutral and, when engine damage is on, bleeds engine
/// health.
pub fn h_shift_to(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
    gear: u8,
) {
    let validate = profile.mt_options.clutch_shift_h && telemetry.flags.has_clutch;
    let rev_matched = near(
        telemetry.rpm,
        telemetry.rev_matched_rpm(gear),
        profile.shift_options.rpm_tolerance,
    );
    if !validate || rev_matched || is_clutch_pressed(input, profile) {
        shift_to(state, gear, false);
        state.fake_neutral = false;
        return;
    }

    tracing::debug!(gear, rpm = telemetry.rpm, "Misshift, dropping to neutral");
    state.fake_neutral = true;
    if profile.mt_options.eng_damage {
        host.set_engine_health(telemetry.engine_health - profile.mt_params.misshift_damage);
    }
}

/// Run the H-pattern algorithm for one tick.
pub fn update(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    wheel_options: &WheelOptions,
    host: &mut impl HostVehicle,
) {
    if input.device_is(InputDevice::Wheel) {
        update_wheel(state, input, telemetry, profile, host);
    }
    if input.device_is(InputDevice::Keyboard)
        || (input.device_is(InputDevice::Wheel) && wheel_options.h_pattern_keyboard)
    {
        update_keyboard(state, input, telemetry, profile, host);
    }
}

fn gear_clamp(telemetry: &VehicleTelemetry) -> u8 {
    telemetry.gear_top.min(MAX_H_GEAR)
}

fn update_keyboard(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
) {
    for gear in 0..=gear_clamp(telemetry) {
        if input.just_pressed(ControlId::Keyboard(KeyboardControl::HGear(gear))) {
            h_shift_to(state, input, telemetry, profile, host, gear);
        }
    }
    if input.just_pressed(ControlId::Keyboard(KeyboardControl::HNeutral))
        && telemetry.flags.has_clutch
    {
        state.fake_neutral = !state.fake_neutral;
    }
}

fn update_wheel(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
) {
    for gear in 0..=gear_clamp(telemetry) {
        if input.just_pressed(ControlId::Wheel(WheelControl::HGear(gear))) {
            h_shift_to(state, input, telemetry, profile, host, gear);
        }
    }

    // Lever pulled out of a slot: the box is in neutral until the next slot.
    for gear in 0..=gear_clamp(telemetry) {
        if input.just_released(ControlId::Wheel(WheelControl::HGear(gear))) {
            if gear == 0 {
                // Out of reverse the lock gear has to leave 0 too.
                shift_to(state, 1, false);
            }
            state.fake_neutral = telemetry.flags.has_clutch;
        }
    }
}
