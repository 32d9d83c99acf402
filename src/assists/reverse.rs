//! Reverse handling.
//!
//! The host's stock scheme is automatic: brake input reverses once stopped.
//! [`real_reverse`] replaces that with separate pedals: in forward gears the
//! brake only brakes, throttle against rearward travel lights up a burnout,
//! and in reverse the throttle backs up while the brake stops. Vehicles left
//! on the stock scheme (simple bike mode) get [`auto_reverse`] instead.

use crate::config::Profile;
use crate::gearbox::{is_clutch_pressed, shift_to};
use crate::host::{HandlingField, HostControl, HostVehicle};
use crate::rev::fake_rev;
use crate::types::{GearboxState, InputFrame, VehicleTelemetry, WheelPatchState};

/// Burnout wheel power as a multiple of the handling drive force.
const BURNOUT_POWER_MULT: f32 = 2.0;

/// Separate-pedal reverse behavior, run every tick while a wheel input
/// scheme other than the stock one is active.
pub fn real_reverse(
    state: &GearboxState,
    patch_state: &mut WheelPatchState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
    dt: f32,
) {
    let fwd = telemetry.velocity.y;

    if telemetry.gear_curr > 0 {
        // Brake pedal while stopped: hold still instead of reversing.
        if input.brake > 0.01 && input.throttle < input.brake && (-0.5..0.5).contains(&fwd) {
            host.disable_control(HostControl::Brake);
            host.set_throttle_p(0.1);
            host.set_brake_p(1.0);
            host.set_brake_lights(true);
        }
        // Brake pedal while rolling back: brake via the host's reverse.
        if input.brake > 0.01 && input.throttle < input.brake && fwd < -0.5 {
            host.set_brake_lights(true);
            host.disable_control(HostControl::Brake);
            host.set_control(HostControl::Accelerate, input.brake);
            host.set_throttle(0.0);
            host.set_throttle_p(0.1);
            host.set_brake_p(1.0);
        }
        // Throttle while rolling back: spin up the driven wheels.
        if !state.fake_neutral
            && input.throttle > 0.5
            && !is_clutch_pressed(input, profile)
            && fwd < -1.0
        {
            if input.brake < 0.1 {
                host.set_brake_lights(false);
            }
            let pedal_force = host.handling(HandlingField::BrakeForce) * input.brake;
            let drive_force = host.handling(HandlingField::DriveForce);
            for wheel in 0..telemetry.wheel_count {
                if telemetry.wheels_driven.get(wheel).copied().unwrap_or(false) {
                    host.set_wheel_brake_pressure(wheel, 0.0);
                    host.set_wheel_power(wheel, BURNOUT_POWER_MULT * drive_force);
                } else {
                    host.set_wheel_power(wheel, 0.0);
                    host.set_wheel_brake_pressure(wheel, pedal_force);
                }
            }
            fake_rev(host, telemetry, input.throttle, dt);
            host.set_throttle(input.throttle);
            host.set_throttle_p(input.throttle);
            patch_state.induce_burnout = true;
        } else {
            patch_state.induce_burnout = false;
        }
    }

    if telemetry.gear_curr == 0 {
        // Reverse lamps.
        host.set_throttle_p(-0.1);

        let mut throttle_and_brake = 0;
        // Throttle backs up, through the host's reverse control.
        if input.throttle > 0.01 && input.throttle > input.brake {
            throttle_and_brake += 1;
            host.disable_control(HostControl::Accelerate);
            host.set_control(HostControl::Brake, input.throttle);
        }
        // Brake while reversing stops the car.
        if input.brake > 0.01 && fwd <= -0.5 {
            throttle_and_brake += 1;
            host.disable_control(HostControl::Brake);
            host.set_control(HostControl::Accelerate, input.brake);
        }
        // Both pedals: stay put and rev.
        if throttle_and_brake >= 2 {
            host.set_control(HostControl::Accelerate, input.brake);
            fake_rev(host, telemetry, input.throttle, dt);
        }

        // Brake while still rolling forward.
        if input.brake > 0.01 && input.throttle <= input.brake && fwd > 0.1 {
            host.set_brake_lights(true);
            host.set_control(HostControl::Brake, input.brake);
            host.set_brake_p(1.0);
        }
        // Brake while stopped: hold.
        if input.brake > 0.01 && input.throttle <= input.brake && fwd > -0.5 && fwd <= 0.1 {
            host.set_brake_lights(true);
            host.disable_control(HostControl::Brake);
            host.set_brake_p(1.0);
        }
    }
}

/// Stock-scheme reverse: gear follows the pressed pedal near standstill.
pub fn auto_reverse(
    state: &mut GearboxState,
    telemetry: &VehicleTelemetry,
    host: &impl HostVehicle,
) {
    let accel = host.control_pressed(HostControl::Accelerate);
    let brake = host.control_pressed(HostControl::Brake);

    if accel && !brake && telemetry.velocity.y > -1.0 && telemetry.gear_curr == 0 {
        shift_to(state, 1, false);
    }
    if brake && !accel && telemetry.velocity.y < 1.0 && telemetry.gear_curr > 0 {
        state.fake_neutral = false;
        shift_to(state, 0, false);
    }
}
