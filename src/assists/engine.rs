//! Engine-side force shaping: engine braking, drivetrain lock and over-rev
//! damage.

use crate::config::Profile;
use crate::gearbox::is_clutch_pressed;
use crate::host::{HandlingField, HostVehicle};
use crate::math::sgn;
use crate::rev::fake_rev;
use crate::types::{GearboxState, InputFrame, ShiftMode, VehicleTelemetry, WheelPatchState};

/// Wheel-speed margin before the drivetrain lock engages, on top of the
/// gear's theoretical ceiling.
const LOCK_SPEED_MARGIN: f32 = 3.334;
const LOCK_SPEED_FACTOR: f32 = 1.15;
const LOCK_FORCE: f32 = 60.0;

/// Brake the driven wheels when coasting at high RPM.
///
/// Active above the RPM threshold while moving forward and off both throttle
/// and clutch; the added pressure scales with how far past the threshold the
/// engine revs. Non-driven wheels still get the pedal's own pressure so the
/// write is consistent across the axle.
pub fn engine_brake(
    patch_state: &mut WheelPatchState,
    state: &GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
) {
    let threshold = profile.mt_params.eng_brake_threshold;
    if telemetry.rpm < threshold || telemetry.velocity.y <= 5.0 || state.fake_neutral {
        patch_state.eng_brake_active = false;
        return;
    }

    let input_mult = (1.0 - input.throttle) * (1.0 - input.clutch);
    if input_mult <= 0.05 {
        patch_state.eng_brake_active = false;
        return;
    }

    patch_state.eng_brake_active = true;
    let pedal_force = host.handling(HandlingField::BrakeForce) * input.brake;
    let rpm_mult = (telemetry.rpm - threshold) / (1.0 - threshold);
    let eng_force = profile.mt_params.eng_brake_power * input_mult * rpm_mult;
    for wheel in 0..telemetry.wheel_count {
        let driven = telemetry.wheels_driven.get(wheel).copied().unwrap_or(false);
        let pressure = if driven { pedal_force + eng_force } else { pedal_force };
        host.set_wheel_brake_pressure(wheel, pressure);
    }
}

/// Lock the driven wheels when the drivetrain is forced past what the gear
/// can take: overspeed from a bad downshift, or rolling against the gear's
/// direction with the clutch engaged.
pub fn engine_lock(
    patch_state: &mut WheelPatchState,
    state: &GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
    dt: f32,
) {
    if profile.mt_options.shift_mode == ShiftMode::Automatic
        || telemetry.flags.is_electric
        || telemetry.gear_top == 1
        || telemetry.gear_curr == telemetry.gear_top
        || state.fake_neutral
    {
        patch_state.eng_lock_active = false;
        return;
    }

    const REVERSE_THRESHOLD: f32 = 2.0;
    let speed = telemetry.velocity.y.abs();
    let max_speed = telemetry.max_speed_in_gear(telemetry.gear_curr);
    let wheel_speed = telemetry.wheel_average_driven_tyre_speed;

    let wrong_direction = telemetry.engine_running
        && if telemetry.gear_curr == 0 {
            telemetry.velocity.y > REVERSE_THRESHOLD && wheel_speed > REVERSE_THRESHOLD
        } else {
            telemetry.velocity.y < -REVERSE_THRESHOLD && wheel_speed < -REVERSE_THRESHOLD
        };

    let overspeed = speed > (max_speed * LOCK_SPEED_FACTOR).abs() + LOCK_SPEED_MARGIN;
    if (!overspeed && !wrong_direction) || is_clutch_pressed(input, profile) {
        patch_state.eng_lock_active = false;
        return;
    }

    patch_state.eng_lock_active = true;
    let input_mult = 1.0 - input.clutch;
    let locking_force = LOCK_FORCE * input_mult;
    for wheel in 0..telemetry.wheel_count {
        if telemetry.wheels_driven.get(wheel).copied().unwrap_or(true) {
            host.set_wheel_power(wheel, -locking_force * sgn(telemetry.velocity.y));
            host.set_wheel_skid(wheel, locking_force);
        }
    }
    fake_rev(host, telemetry, 1.0, dt);

    if profile.mt_options.eng_damage {
        let damage = profile.mt_params.misshift_damage * input_mult;
        if telemetry.engine_health >= damage {
            host.set_engine_health(telemetry.engine_health - damage);
        } else {
            host.set_engine_on(false);
        }
    }
}

/// Bleed engine health while bouncing off the limiter at full throttle.
///
/// Top gear is exempt: there is nothing left to money-shift into.
pub fn over_rev_damage(
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    host: &mut impl HostVehicle,
) {
    if profile.mt_options.shift_mode == ShiftMode::Automatic
        || telemetry.flags.is_electric
        || telemetry.gear_top == 1
    {
        return;
    }
    if telemetry.gear_curr != telemetry.gear_top && telemetry.rpm > 0.98 && input.throttle > 0.98 {
        host.set_engine_health(telemetry.engine_health - profile.mt_params.rpm_damage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockVehicle, TelemetryBuilder};

    const DT: f32 = 1.0 / 60.0;

    fn coasting_telemetry() -> VehicleTelemetry {
        let mut telemetry = TelemetryBuilder::car()
            .gear(3)
            .rpm(0.9)
            .driven(vec![false, false, true, true])
            .build();
        telemetry.velocity.y = 30.0;
        telemetry
    }

    #[test]
    fn coasting_at_high_rpm_brakes_driven_wheels() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState::default();
        let telemetry = coasting_telemetry();

        engine_brake(
            &mut patch_state,
            &GearboxState::default(),
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            &mut host,
        );
        assert!(patch_state.eng_brake_active);
        // Rear (driven) wheels get pressure, fronts stay at pedal level (0).
        assert!(host.wheel_brake_pressures[2] > 0.0);
        assert!(host.wheel_brake_pressures[3] > 0.0);
        assert_eq!(host.wheel_brake_pressures[0], 0.0);
    }

    #[test]
    fn throttle_or_clutch_disarms_engine_brake() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState { eng_brake_active: true, ..Default::default() };
        let telemetry = coasting_telemetry();
        let mut input = InputFrame::default();
        input.throttle = 1.0;

        engine_brake(
            &mut patch_state,
            &GearboxState::default(),
            &input,
            &telemetry,
            &Profile::default(),
            &mut host,
        );
        assert!(!patch_state.eng_brake_active);
    }

    #[test]
    fn low_rpm_disarms_engine_brake() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState { eng_brake_active: true, ..Default::default() };
        let mut telemetry = coasting_telemetry();
        telemetry.rpm = 0.4;

        engine_brake(
            &mut patch_state,
            &GearboxState::default(),
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            &mut host,
        );
        assert!(!patch_state.eng_brake_active);
    }

    fn overspeed_telemetry() -> VehicleTelemetry {
        // First gear tops out at 50/3.3 = 15.2; roll it at 40.
        let mut telemetry = TelemetryBuilder::car()
            .gear(1)
            .top_gear(6)
            .gear_ratios(vec![-3.3, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8])
            .max_flat_vel(50.0)
            .wheel_speeds(vec![40.0; 4])
            .driven(vec![true; 4])
            .build();
        telemetry.velocity.y = 40.0;
        telemetry
    }

    #[test]
    fn overspeed_locks_driven_wheels_against_travel() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState::default();
        let telemetry = overspeed_telemetry();

        engine_lock(
            &mut patch_state,
            &GearboxState::default(),
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            &mut host,
            DT,
        );
        assert!(patch_state.eng_lock_active);
        // Forward travel, so the locking power is negative.
        assert!(host.wheel_powers[0] < 0.0);
        assert!(host.wheel_skids[0] > 0.0);
        assert!(host.rpm_written.is_some());
    }

    #[test]
    fn clutch_pedal_releases_engine_lock() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState { eng_lock_active: true, ..Default::default() };
        let telemetry = overspeed_telemetry();
        let mut input = InputFrame::default();
        input.clutch = 1.0;

        engine_lock(
            &mut patch_state,
            &GearboxState::default(),
            &input,
            &telemetry,
            &Profile::default(),
            &mut host,
            DT,
        );
        assert!(!patch_state.eng_lock_active);
        assert!(host.wheel_powers.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn engine_lock_damage_scales_with_engagement() {
        let mut host = MockVehicle::car();
        host.engine_health = 1000.0;
        let mut patch_state = WheelPatchState::default();
        let mut telemetry = overspeed_telemetry();
        telemetry.engine_health = 1000.0;
        let mut profile = Profile::default();
        profile.mt_options.eng_damage = true;

        let mut input = InputFrame::default();
        input.clutch = 0.5;
        engine_lock(
            &mut patch_state,
            &GearboxState::default(),
            &input,
            &telemetry,
            &profile,
            &mut host,
            DT,
        );
        assert!(patch_state.eng_lock_active);
        let expected = 1000.0 - profile.mt_params.misshift_damage * 0.5;
        assert!((host.engine_health - expected).abs() < 1e-3);
    }

    #[test]
    fn engine_lock_ignores_automatic_and_top_gear() {
        let mut host = MockVehicle::car();
        let mut patch_state = WheelPatchState { eng_lock_active: true, ..Default::default() };
        let mut telemetry = overspeed_telemetry();
        telemetry.gear_curr = telemetry.gear_top;

        engine_lock(
            &mut patch_state,
            &GearboxState::default(),
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            &mut host,
            DT,
        );
        assert!(!patch_state.eng_lock_active);
    }

    #[test]
    fn sustained_over_rev_bleeds_engine_health() {
        let mut host = MockVehicle::car();
        host.engine_health = 1000.0;
        let mut telemetry = TelemetryBuilder::car().gear(2).top_gear(6).rpm(0.99).build();
        telemetry.engine_health = 1000.0;
        let mut input = InputFrame::default();
        input.throttle = 1.0;

        over_rev_damage(&input, &telemetry, &Profile::default(), &mut host);
        assert!(host.engine_health < 1000.0);
    }

    #[test]
    fn top_gear_over_rev_is_free() {
        let mut host = MockVehicle::car();
        host.engine_health = 1000.0;
        let mut telemetry = TelemetryBuilder::car().gear(6).top_gear(6).rpm(0.99).build();
        telemetry.engine_health = 1000.0;
        let mut input = InputFrame::default();
        input.throttle = 1.0;

        over_rev_damage(&input, &telemetry, &Profile::default(), &mut host);
        assert_eq!(host.engine_health, 1000.0);
    }
}
