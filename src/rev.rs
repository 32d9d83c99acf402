//! RPM synthesis and the final clutch writeback.
//!
//! The host computes RPM from its own clutch model, which goes dead as soon
//! as the clutch disengages. [`fake_rev`] keeps the tach alive by writing a
//! synthesized RPM on top, and [`handle_rpm`] runs once at the end of every
//! transmission tick: limiter response, shift throttle cut/blip, and the
//! remapped clutch value the host actually receives.

use crate::config::Profile;
use crate::host::{HostControl, HostVehicle};
use crate::math::map_range;
use crate::types::{GearboxState, InputFrame, ShiftDirection, ShiftMode, VehicleTelemetry};

/// Per-second RPM gain at full throttle.
const REV_ACCEL_RATIO: f32 = 2.5;

/// Throttle set during a downshift blip.
const BLIP_THROTTLE: f32 = 0.66;

/// Write a synthesized RPM so the engine revs while the clutch is out.
///
/// Holds last tick's RPM when the host value is decaying and adds a
/// throttle-proportional rise on top. First gear revs at double rate to
/// compensate the host's slower response there.
pub fn fake_rev(host: &mut impl HostVehicle, telemetry: &VehicleTelemetry, throttle: f32, dt: f32) {
    let mut decay_hold = if telemetry.rpm_prev > telemetry.rpm {
        telemetry.rpm_prev - telemetry.rpm
    } else {
        0.0
    };
    if telemetry.gear_curr == 1 {
        decay_hold *= 2.0;
    }
    host.set_rpm(telemetry.rpm + decay_hold + throttle * REV_ACCEL_RATIO * dt);
}

/// Update the RPM and per-gear speed limiter flags.
pub fn limiter(state: &mut GearboxState, telemetry: &VehicleTelemetry, profile: &Profile) {
    state.hit_rpm_limiter = telemetry.rpm > 1.0;

    // Top gear and reverse run open unless the hard limiter is on.
    if !profile.mt_options.hard_limiter
        && (telemetry.gear_curr == telemetry.gear_top || telemetry.gear_curr == 0)
    {
        state.hit_speed_limiter = false;
        return;
    }

    let max_speed = telemetry.max_speed_in_gear(telemetry.gear_curr);
    state.hit_speed_limiter = telemetry.velocity.y > max_speed && telemetry.rpm >= 1.0;
}

/// Final per-tick RPM/clutch writeback.
///
/// The effective clutch is the max of pedal and shift blend. The value the
/// host receives is remapped: below second gear it is a plain inversion, from
/// second up it maps `[0, 1]` onto `[1.0, 0.6]` since the host cuts drive
/// entirely below 0.6. Fake neutral and a fully pressed pedal write the
/// disengage sentinels instead: -5.0 stopped, -0.5 moving.
pub fn handle_rpm(
    state: &GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    simple_bike: bool,
    host: &mut impl HostVehicle,
    dt: f32,
) {
    let mut clutch = input.clutch;

    if state.shifting {
        if state.clutch_val > clutch {
            clutch = state.clutch_val;
        }

        // Cut and blip only stand in when the pedal isn't being used.
        if input.clutch == 0.0 {
            match state.shift_direction {
                ShiftDirection::Up if profile.shift_options.upshift_cut => {
                    host.disable_control(HostControl::Accelerate);
                }
                ShiftDirection::Down if profile.shift_options.downshift_blip => {
                    if telemetry.gear_curr >= 1 {
                        let expected = telemetry.rev_matched_rpm(telemetry.gear_curr - 1);
                        if telemetry.rpm < expected * 0.75 {
                            host.set_control(HostControl::Accelerate, BLIP_THROTTLE);
                        }
                    }
                }
                _ => {}
            }
        }
    } else if profile.mt_options.shift_mode == ShiftMode::Automatic || simple_bike {
        clutch = 0.0;
    }

    // Speed limiter: hold revs, refuse further acceleration, drag the
    // vehicle back toward the gear's ceiling.
    if telemetry.gear_curr > 0 && state.hit_speed_limiter && telemetry.speed > 2.0 {
        host.set_throttle(1.0);
        fake_rev(host, telemetry, input.throttle, dt);
        host.disable_control(HostControl::Accelerate);
        let counter_force = 0.25
            * -(telemetry.gear_top as f32 - telemetry.gear_curr as f32)
            / telemetry.gear_top as f32;
        host.apply_forward_force(counter_force);
    }
    if state.hit_rpm_limiter {
        host.set_rpm(1.0);
    }

    let mut final_clutch = 1.0 - clutch;

    if telemetry.gear_curr > 1 {
        final_clutch = map_range(clutch, 0.0, 1.0, 1.0, 0.6);

        // Rolling back under brakes shouldn't rev even with throttle input.
        let rolling_back = telemetry.velocity.y < 0.0 && input.brake > 0.1 && input.throttle > 0.05;

        if clutch > 0.4
            && input.throttle > 0.05
            && !state.fake_neutral
            && !rolling_back
            && (!state.shifting || input.clutch > 0.4)
        {
            fake_rev(host, telemetry, input.throttle, dt);
            host.set_throttle(input.throttle);
        }
        if state.fake_neutral {
            fake_rev(host, telemetry, input.throttle, dt);
            host.set_throttle(input.throttle);
        }
    }

    if state.fake_neutral || clutch >= 1.0 {
        final_clutch = if telemetry.speed < 1.0 { -5.0 } else { -0.5 };
    }

    host.set_clutch(final_clutch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockVehicle, TelemetryBuilder};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn fake_rev_holds_decaying_rpm_and_adds_throttle() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(2).rpm(0.5).rpm_prev(0.55).build();
        fake_rev(&mut host, &telemetry, 1.0, DT);
        let expected = 0.5 + 0.05 + REV_ACCEL_RATIO * DT;
        assert!((host.rpm_written.unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn fake_rev_first_gear_doubles_hold() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(1).rpm(0.5).rpm_prev(0.55).build();
        fake_rev(&mut host, &telemetry, 0.0, DT);
        assert!((host.rpm_written.unwrap() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn limiter_flags_rpm_over_redline() {
        let mut state = GearboxState::default();
        let telemetry = TelemetryBuilder::car().gear(2).rpm(1.05).build();
        limiter(&mut state, &telemetry, &Profile::default());
        assert!(state.hit_rpm_limiter);
    }

    #[test]
    fn limiter_spares_top_gear_without_hard_limiter() {
        let mut state = GearboxState::default();
        let mut telemetry = TelemetryBuilder::car()
            .gear(6)
            .top_gear(6)
            .rpm(1.0)
            .gear_ratios(vec![-3.3, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8])
            .max_flat_vel(50.0)
            .build();
        telemetry.velocity.y = 100.0;
        limiter(&mut state, &telemetry, &Profile::default());
        assert!(!state.hit_speed_limiter);

        let mut profile = Profile::default();
        profile.mt_options.hard_limiter = true;
        limiter(&mut state, &telemetry, &profile);
        assert!(state.hit_speed_limiter);
    }

    #[test]
    fn limiter_catches_intermediate_gear_overspeed() {
        let mut state = GearboxState::default();
        let mut telemetry = TelemetryBuilder::car()
            .gear(2)
            .top_gear(6)
            .rpm(1.0)
            .gear_ratios(vec![-3.3, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8])
            .max_flat_vel(50.0)
            .build();
        // Second tops out at 50/2.2 = 22.7.
        telemetry.velocity.y = 25.0;
        limiter(&mut state, &telemetry, &Profile::default());
        assert!(state.hit_speed_limiter);
    }

    #[test]
    fn stopped_neutral_writes_deep_disengage_sentinel() {
        let mut host = MockVehicle::car();
        let mut telemetry = TelemetryBuilder::car().gear(1).build();
        telemetry.speed = 0.0;
        let state = GearboxState { fake_neutral: true, ..Default::default() };
        handle_rpm(
            &state,
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert_eq!(host.clutch_written, Some(-5.0));
    }

    #[test]
    fn moving_full_clutch_writes_shallow_sentinel() {
        let mut host = MockVehicle::car();
        let mut telemetry = TelemetryBuilder::car().gear(3).build();
        telemetry.speed = 20.0;
        let mut input = InputFrame::default();
        input.clutch = 1.0;
        handle_rpm(
            &GearboxState::default(),
            &input,
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert_eq!(host.clutch_written, Some(-0.5));
    }

    #[test]
    fn high_gear_clutch_maps_onto_upper_band() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(3).build();
        let mut input = InputFrame::default();
        input.clutch = 0.5;
        handle_rpm(
            &GearboxState::default(),
            &input,
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        // Half pedal lands mid-band, not below the host's 0.6 cutoff.
        assert!((host.clutch_written.unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn low_gear_clutch_is_plain_inversion() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(1).build();
        let mut input = InputFrame::default();
        input.clutch = 0.3;
        handle_rpm(
            &GearboxState::default(),
            &input,
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert!((host.clutch_written.unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn upshift_cuts_throttle_without_pedal_clutch() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(2).build();
        let state = GearboxState {
            shifting: true,
            clutch_val: 0.5,
            shift_direction: ShiftDirection::Up,
            lock_gear: 2,
            next_gear: 3,
            ..Default::default()
        };
        handle_rpm(
            &state,
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert!(host.disabled_controls.contains(&HostControl::Accelerate));
    }

    #[test]
    fn downshift_blips_when_revs_are_low() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car()
            .gear(3)
            .gear_ratios(vec![-3.3, 3.3, 2.2, 1.6])
            .max_flat_vel(50.0)
            .wheel_speeds(vec![20.0; 4])
            .driven(vec![true; 4])
            .rpm(0.2)
            .build();
        let state = GearboxState {
            shifting: true,
            clutch_val: 0.5,
            shift_direction: ShiftDirection::Down,
            lock_gear: 3,
            next_gear: 2,
            ..Default::default()
        };
        handle_rpm(
            &state,
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert_eq!(host.control_value(HostControl::Accelerate), BLIP_THROTTLE);
    }

    #[test]
    fn pedal_clutch_suppresses_cut_and_blip() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(2).build();
        let state = GearboxState {
            shifting: true,
            clutch_val: 0.5,
            shift_direction: ShiftDirection::Up,
            lock_gear: 2,
            next_gear: 3,
            ..Default::default()
        };
        let mut input = InputFrame::default();
        input.clutch = 0.6;
        handle_rpm(&state, &input, &telemetry, &Profile::default(), false, &mut host, DT);
        assert!(host.disabled_controls.is_empty());
    }

    #[test]
    fn speed_limiter_counterforce_opposes_travel() {
        let mut host = MockVehicle::car();
        let mut telemetry = TelemetryBuilder::car().gear(2).top_gear(6).build();
        telemetry.speed = 30.0;
        let state = GearboxState {
            lock_gear: 2,
            next_gear: 2,
            hit_speed_limiter: true,
            ..Default::default()
        };
        handle_rpm(
            &state,
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert!(host.disabled_controls.contains(&HostControl::Accelerate));
        let force = host.forward_force.unwrap();
        assert!(force < 0.0);
        assert!((force - 0.25 * -(4.0 / 6.0)).abs() < 1e-6);
    }

    #[test]
    fn rpm_limiter_pins_redline() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(3).rpm(1.02).build();
        let state = GearboxState { hit_rpm_limiter: true, ..Default::default() };
        handle_rpm(
            &state,
            &InputFrame::default(),
            &telemetry,
            &Profile::default(),
            false,
            &mut host,
            DT,
        );
        assert_eq!(host.rpm_written, Some(1.0));
    }

    #[test]
    fn automatic_mode_ignores_pedal_clutch() {
        let mut host = MockVehicle::car();
        let telemetry = TelemetryBuilder::car().gear(3).build();
        let mut profile = Profile::default();
        profile.mt_options.shift_mode = ShiftMode::Automatic;
        let mut input = InputFrame::default();
        input.clutch = 1.0;
        handle_rpm(
            &GearboxState::default(),
            &input,
            &telemetry,
            &profile,
            false,
            &mut host,
            DT,
        );
        // Full pedal would write a sentinel; automatic zeroes it first.
        assert_eq!(host.clutch_written, Some(1.0));
    }
}
