//! Automatic shifting.
//!
//! Gear selection (reverse / neutral / drive) comes either from the
//! sequential shift buttons or, on a wheel with the option enabled, from the
//! H-shifter gate used as a P-R-N-D selector. While in drive, up/downshift
//! decisions run off a derived engine-load metric: a decaying peak-hold of
//! throttle minus the normalized RPM excess.

use crate::config::{Profile, WheelOptions};
use crate::host::{HandlingField, HostControl, HostVehicle};
use crate::math::map_range;
use crate::types::{
    ControlId, GearboxState, InputDevice, InputFrame, VehicleTelemetry, WheelControl,
};

use super::{shift_down_requested, shift_to, shift_up_requested};

/// Driven-wheel skid magnitude above which shifts are deferred.
const SKID_THRESHOLD: f32 = 3.5;

/// Run the automatic algorithm for one tick.
///
/// `now` is game-time seconds, used for the post-upshift downshift cooldown.
pub fn update(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    wheel_options: &WheelOptions,
    host: &mut impl HostVehicle,
    now: f64,
    dt: f32,
) {
    let handled = if input.device_is(InputDevice::Wheel) && wheel_options.use_shifter_for_auto {
        select_gate(state, input, telemetry, host)
    } else {
        select_sequential(state, input, telemetry)
    };
    if handled {
        return;
    }

    // Reverse is driver-selected only, and decisions wait out a blend.
    if telemetry.gear_curr == 0 || state.shifting {
        return;
    }

    // Peak-hold throttle with eco decay, so momentary lifts don't upshift.
    if input.throttle >= state.throttle_hang {
        state.throttle_hang = input.throttle;
    } else if state.throttle_hang > 0.0 {
        state.throttle_hang -= dt * profile.auto_params.eco_rate;
    }
    state.throttle_hang = state.throttle_hang.max(0.0);

    let curr_gear = telemetry.gear_curr;
    let curr_speed = telemetry.wheel_average_driven_tyre_speed;
    let next_gear_min_speed = if curr_gear < telemetry.gear_top {
        profile.auto_params.next_gear_min_rpm * telemetry.max_speed_in_gear(curr_gear + 1)
    } else {
        0.0
    };
    let curr_gear_min_speed =
        profile.auto_params.curr_gear_min_rpm * telemetry.max_speed_in_gear(curr_gear);

    let engine_load = state.throttle_hang - map_range(telemetry.rpm, 0.2, 1.0, 0.0, 1.0);
    state.engine_load = engine_load;

    let skidding = telemetry
        .wheel_skids
        .iter()
        .zip(&telemetry.wheels_driven)
        .any(|(skid, driven)| *driven && skid.abs() > SKID_THRESHOLD);

    if curr_gear < telemetry.gear_top
        && engine_load < profile.auto_params.upshift_load
        && curr_speed > next_gear_min_speed
        && !skidding
    {
        shift_to(state, curr_gear + 1, true);
        state.fake_neutral = false;
        state.last_upshift_time = now;
        return;
    }

    // A closer gear spacing tolerates less load before kicking down.
    let gear_ratio_ratio = if curr_gear < telemetry.gear_top {
        telemetry.gear_ratio(curr_gear) / telemetry.gear_ratio(curr_gear + 1)
    } else {
        1.0
    };

    let rate_up = host.handling(HandlingField::ClutchChangeRateUp);
    let upshift_duration = 1.0 / (rate_up * profile.shift_options.clutch_rate_mult);
    let cooldown_over = now
        > state.last_upshift_time
            + (upshift_duration * profile.auto_params.downshift_timeout_mult) as f64;

    if curr_gear > 1
        && ((cooldown_over && engine_load > profile.auto_params.downshift_load * gear_ratio_ratio)
            || curr_speed < curr_gear_min_speed)
    {
        shift_to(state, curr_gear - 1, true);
        state.fake_neutral = false;
    }
}

/// Reverse/neutral/drive stepping on the sequential shift buttons.
///
/// Returns true when a selection edge was consumed this tick; an edge with
/// no matching step falls through to the load-based logic.
fn select_sequential(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
) -> bool {
    if shift_up_requested(input) {
        // Reverse to neutral.
        if telemetry.gear_curr == 0 && !state.fake_neutral {
            shift_to(state, 1, false);
            state.fake_neutral = true;
            return true;
        }
        // Neutral to drive.
        if telemetry.gear_curr == 1 && state.fake_neutral {
            state.fake_neutral = false;
            return true;
        }
        // Neutral flagged while the box still reads reverse.
        if telemetry.gear_curr == 0 && state.fake_neutral {
            shift_to(state, 1, false);
            state.fake_neutral = false;
            return true;
        }
    }
    if shift_down_requested(input) {
        // First to neutral.
        if telemetry.gear_curr == 1 && !state.fake_neutral {
            state.fake_neutral = true;
            return true;
        }
        // Neutral to reverse.
        if telemetry.gear_curr == 1 && state.fake_neutral {
            shift_to(state, 0, false);
            state.fake_neutral = false;
            return true;
        }
        // Neutral flagged while the box still reads reverse.
        if telemetry.gear_curr == 0 && state.fake_neutral {
            shift_to(state, 0, false);
            state.fake_neutral = false;
            return true;
        }
    }
    false
}

/// H-shifter gate repurposed as a P-R-N-D selector.
///
/// Returns true while a selection holds the box (park) or a selection edge
/// was consumed. With no neutral binding, pulling the lever out of any slot
/// lands in neutral.
fn select_gate(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    host: &mut impl HostVehicle,
) -> bool {
    let park = ControlId::Wheel(WheelControl::Park);
    let reverse = ControlId::Wheel(WheelControl::Reverse);
    let neutral = ControlId::Wheel(WheelControl::Neutral);
    let drive = ControlId::Wheel(WheelControl::Drive);

    if input.is_down(park) {
        if state.lock_gear != 1 {
            shift_to(state, 1, false);
        }
        state.fake_neutral = true;
        host.set_control(HostControl::Handbrake, 1.0);
        return true;
    }

    if input.just_pressed(reverse) {
        if telemetry.velocity.y < 5.0 {
            shift_to(state, 0, false);
            state.fake_neutral = false;
        }
        return true;
    }

    if input.just_pressed(drive) {
        shift_to(state, 1, false);
        state.fake_neutral = false;
        return true;
    }

    let to_neutral = if input.is_bound(neutral) {
        input.just_pressed(neutral)
    } else {
        input.just_released(park) || input.just_released(reverse) || input.just_released(drive)
    };
    if to_neutral {
        if state.lock_gear != 1 {
            shift_to(state, 1, false);
        }
        state.fake_neutral = true;
        return true;
    }

    false
}
