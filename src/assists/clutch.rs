//! Clutch-plate simulation: catch-point creep, stalling and push starts.

use crate::config::Profile;
use crate::host::{HostControl, HostVehicle};
use crate::math::map_range;
use crate::types::{GearboxState, InputFrame, VehicleTelemetry};

/// Synthesized throttle at the catch point, roughly idle RPM.
const IDLE_THROTTLE: f32 = 0.24;

/// Stall accumulator gain per second of full engagement.
const STALL_RATE: f32 = 3.33;

/// Below this speed-deficit ratio the engine is close enough to idle speed
/// that stall buildup is ignored.
const STALL_DEADZONE: f32 = 0.45;

/// Creep forward (or back, in reverse) when the clutch grabs at low speed.
///
/// A small throttle is synthesized while the vehicle is below walking pace
/// with the clutch engaged, fading out as the wheels approach the speed the
/// slipping clutch would carry them to. Real pedal input above the idle
/// level takes priority.
pub fn clutch_catch(
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
) {
    let clutch_ratio = map_range(
        input.clutch,
        1.0 - profile.mt_params.clutch_threshold,
        0.0,
        0.0,
        1.0,
    )
    .clamp(0.0, 1.0);

    let clutch_engaged = input.clutch <= 1.0 - profile.mt_params.clutch_threshold;
    let gear_max = telemetry.max_speed_in_gear(telemetry.gear_curr);
    let min_speed = 0.2 * gear_max;
    let expected_speed = telemetry.rpm * gear_max * clutch_ratio;
    let actual_speed = telemetry.wheel_average_driven_tyre_speed;

    if actual_speed.abs() >= min_speed.abs() || !clutch_engaged {
        return;
    }

    let throttle = map_range(actual_speed.abs(), 0.0, expected_speed.abs(), IDLE_THROTTLE, 0.0)
        .clamp(0.0, IDLE_THROTTLE);
    let user_input = input.throttle.abs() > IDLE_THROTTLE || input.brake.abs() > IDLE_THROTTLE;
    if !user_input {
        if telemetry.gear_curr > 0 {
            host.set_control(HostControl::Accelerate, throttle);
        } else {
            host.set_control(HostControl::Brake, throttle);
        }
    }
}

/// Accumulate stall progress and kill or push-start the engine.
///
/// Progress builds while the clutch is engaged with the engine near idle and
/// the wheels well below the gear's idle speed, scaled by how far below; it
/// drains at the full rate otherwise. Crossing 1.0 switches the engine off.
/// The inverse also holds: a dead engine spun up past idle speed by the
/// wheels catches and restarts.
pub fn engine_stall(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
    dt: f32,
) {
    let stall_rate = dt * STALL_RATE;
    let min_speed =
        profile.mt_params.stalling_rpm * telemetry.max_speed_in_gear(telemetry.gear_curr).abs();
    let actual_speed = telemetry.wheel_average_driven_tyre_speed;

    let mut speed_diff_ratio =
        map_range(min_speed.abs() - actual_speed.abs(), 0.0, min_speed.abs(), 0.0, 1.0)
            .clamp(0.0, 1.0);
    if speed_diff_ratio < STALL_DEADZONE {
        speed_diff_ratio = 0.0;
    }

    let stall_engaged = input.clutch < 1.0 - profile.mt_params.stalling_threshold;
    let inv_clutch = 1.0 - input.clutch;

    if stall_engaged
        && telemetry.rpm < 0.25
        && actual_speed.abs() < min_speed.abs()
        && telemetry.engine_running
    {
        state.stall_progress += inv_clutch * speed_diff_ratio * stall_rate;
    } else if state.stall_progress > 0.0 {
        state.stall_progress -= stall_rate;
    }

    if state.stall_progress > 1.0 {
        if telemetry.engine_running {
            tracing::debug!("Engine stalled");
            host.set_engine_on(false);
        }
        state.stall_progress = 0.0;
    }

    // Push start: rolling fast enough in gear spins the engine back up.
    if actual_speed > min_speed && !telemetry.engine_running && stall_engaged {
        host.set_engine_on(true);
    }
}
