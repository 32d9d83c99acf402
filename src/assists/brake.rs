//! Brake-patch arbitration: ABS, TCS, ESP and the shaping features all want
//! to own the per-wheel brake line; exactly one wins per tick.
//!
//! Priority, highest first: burnout, drivetrain lock, ABS, ESP, TCS (brake
//! mode), engine brake. When nothing claims the line the patches are
//! restored, zeroing wheel pressure first if the pedal is fully released so
//! stale writes can't linger as phantom brakes.

use crate::config::{Profile, SteeringSettings, TcsMode};
use crate::host::{HandlingField, HostControl, HostVehicle, PatchGate, PatchKind, PatchSet};
use crate::math::{deg2rad, map_range, rad2deg, sgn, Vec3};
use crate::types::{InputDevice, InputFrame, VehicleTelemetry, WheelPatchState};

/// Who owns the brake line this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeOwner {
    Burnout,
    EngLock,
    Abs,
    Esp,
    TcsBrake,
    EngBrake,
    None,
}

#[derive(Debug, Default)]
struct StabilityInputs {
    use_abs: bool,
    use_tcs: bool,
    use_esp: bool,
    slipped: Vec<bool>,
    esp_oversteer: bool,
    esp_understeer: bool,
    opposite_lock: bool,
    oversteer_angle: f32,
    understeer_angle: f32,
    avg_angle: f32,
}

/// Run detection and arbitration; returns the winning owner.
pub fn handle_brake_patch<G: PatchGate>(
    patch_state: &WheelPatchState,
    patches: &mut PatchSet<G>,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    steering: &SteeringSettings,
    host: &mut impl HostVehicle,
) -> BrakeOwner {
    let stability = detect(input, telemetry, profile, steering);

    let brake_force = host.handling(HandlingField::BrakeForce);
    let bias_front = host.handling(HandlingField::BrakeBiasFront);
    let bias_rear = host.handling(HandlingField::BrakeBiasRear);
    let pedal_force = brake_force * input.brake;

    // Throttle-mode TCS acts on input, not on the brake line, so it stacks
    // with whatever wins below.
    if stability.use_tcs && profile.drive_assists.tcs.mode == TcsMode::Throttle {
        host.disable_control(HostControl::Accelerate);
    }

    if patch_state.induce_burnout {
        patches.ensure_applied(PatchKind::Brake);
        patches.ensure_applied(PatchKind::Throttle);
        return BrakeOwner::Burnout;
    }

    if patch_state.eng_lock_active {
        patches.ensure_applied(PatchKind::Throttle);
        return BrakeOwner::EngLock;
    }

    if stability.use_abs {
        patches.ensure_applied(PatchKind::Brake);
        for wheel in 0..telemetry.wheel_count {
            let locked = telemetry.wheels_locked_up.get(wheel).copied().unwrap_or(false);
            host.set_wheel_brake_pressure(wheel, if locked { 0.0 } else { pedal_force });
        }
        return BrakeOwner::Abs;
    }

    if stability.use_esp {
        patches.ensure_applied(PatchKind::Brake);
        apply_esp(&stability, telemetry, profile, brake_force, pedal_force, bias_front, bias_rear, host);
        return BrakeOwner::Esp;
    }

    if stability.use_tcs && profile.drive_assists.tcs.mode == TcsMode::Brake {
        patches.ensure_applied(PatchKind::Brake);
        for wheel in 0..telemetry.wheel_count {
            if stability.slipped.get(wheel).copied().unwrap_or(false) {
                let speed = telemetry.wheel_tyre_speeds.get(wheel).copied().unwrap_or(0.0);
                let pressure = map_range(
                    speed,
                    telemetry.velocity.y,
                    telemetry.velocity.y + 2.5,
                    0.0,
                    0.5,
                );
                host.set_wheel_brake_pressure(wheel, pressure);
            } else {
                host.set_wheel_brake_pressure(wheel, pedal_force);
            }
        }
        return BrakeOwner::TcsBrake;
    }

    if patch_state.eng_brake_active {
        patches.ensure_applied(PatchKind::Brake);
        return BrakeOwner::EngBrake;
    }

    // Nobody claimed the line: hand it back, clearing stale pressure only
    // when the pedal is fully released.
    if patches.patched(PatchKind::Brake) {
        if input.brake == 0.0 {
            for wheel in 0..telemetry.wheel_count {
                host.set_wheel_brake_pressure(wheel, 0.0);
            }
        }
        patches.ensure_restored(PatchKind::Brake);
    }
    patches.ensure_restored(PatchKind::Throttle);
    BrakeOwner::None
}

fn detect(
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    steering: &SteeringSettings,
) -> StabilityInputs {
    let mut out = StabilityInputs { slipped: vec![false; telemetry.wheel_count], ..Default::default() };
    let handbrake_or_burnout = telemetry.handbrake || telemetry.in_burnout;

    // ABS: a braked wheel locked while its suspension is loaded.
    {
        let mut locked_up = false;
        for wheel in 0..telemetry.wheel_count {
            if telemetry.wheels_locked_up.get(wheel).copied().unwrap_or(false)
                && telemetry.suspension_travel.get(wheel).copied().unwrap_or(0.0) > 0.0
                && telemetry.wheel_brake_pressures.get(wheel).copied().unwrap_or(0.0) > 0.0
            {
                locked_up = true;
            }
        }
        if handbrake_or_burnout {
            locked_up = false;
        }
        let native_abs = telemetry.flags.has_abs && profile.drive_assists.abs.filter;
        out.use_abs = profile.drive_assists.abs.enable && locked_up && !native_abs;
    }

    // TCS: a powered, loaded, driven wheel spinning past the body.
    if profile.drive_assists.tcs.mode != TcsMode::Off {
        let mut traction_loss = false;
        for wheel in 0..telemetry.wheel_count {
            if telemetry.wheel_tyre_speeds.get(wheel).copied().unwrap_or(0.0)
                > telemetry.velocity.y + profile.drive_assists.tcs.slip_max
                && telemetry.suspension_travel.get(wheel).copied().unwrap_or(0.0) > 0.0
                && telemetry.wheels_driven.get(wheel).copied().unwrap_or(false)
                && telemetry.wheel_powers.get(wheel).copied().unwrap_or(0.0) > 0.1
            {
                traction_loss = true;
                out.slipped[wheel] = true;
            }
        }
        out.use_tcs = traction_loss && !handbrake_or_burnout;
    }

    // ESP: compare actual travel against where the steered wheels point.
    let steer_mult = if input.device_is(InputDevice::Wheel) {
        steering.wheel_steer_mult
    } else {
        steering.custom_steer_mult
    };
    let raw_angle = telemetry.avg_wheel_angle;
    let avg_angle = raw_angle * steer_mult;
    out.avg_angle = avg_angle;
    {
        let speed = telemetry.speed;
        let vel = telemetry.velocity;
        let rot_z = telemetry.rotation_velocity.z;
        let rot_relative = Vec3::new(speed * -rot_z.sin(), speed * rot_z.cos(), 0.0);
        let predicted = Vec3::new(speed * -raw_angle.sin(), speed * raw_angle.cos(), 0.0);

        let next_rot = (vel + rot_relative) * 0.5;
        out.understeer_angle = next_rot.angle_between(predicted);
        let d_spd_str = vel.distance(predicted);
        let a_spd_str = vel.angle_between(predicted);
        let d_spd_rot = vel.distance(next_rot);
        let a_spd_rot = vel.angle_between(next_rot);
        if d_spd_str > d_spd_rot
            && sgn(a_spd_rot) == sgn(a_spd_str)
            && out.understeer_angle.abs() > deg2rad(profile.drive_assists.esp.under_min)
            && vel.y > 10.0
            && avg_angle.abs() > deg2rad(2.0)
        {
            out.esp_understeer = true;
        }

        let mut oversteer_angle = (vel.y / speed).acos();
        if oversteer_angle.is_nan() {
            oversteer_angle = 0.0;
        }
        out.oversteer_angle = oversteer_angle;
        if oversteer_angle > deg2rad(profile.drive_assists.esp.over_min) && vel.y > 10.0 {
            out.esp_oversteer = true;
            if sgn(vel.x) == sgn(avg_angle) {
                out.opposite_lock = true;
            }
        }
    }
    out.use_esp = profile.drive_assists.esp.enable
        && telemetry.wheel_count == 4
        && telemetry.any_wheel_on_ground()
        && (out.esp_oversteer || out.esp_understeer);

    out
}

/// Per-corner ESP compensation, wheel order FL FR RL RR.
#[allow(clippy::too_many_arguments)]
fn apply_esp(
    stability: &StabilityInputs,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
    brake_force: f32,
    pedal_force: f32,
    bias_front: f32,
    bias_rear: f32,
    host: &mut impl HostVehicle,
) {
    let esp = &profile.drive_assists.esp;
    let avg_angle = stability.avg_angle;
    // Countersteering flips which front corner the oversteer brake targets.
    let over_angle = if stability.opposite_lock { avg_angle } else { -avg_angle };

    let oversteer_comp = map_range(
        rad2deg(stability.oversteer_angle).abs(),
        esp.over_min,
        esp.over_max,
        esp.over_min_comp,
        esp.over_max_comp,
    );
    let oversteer_add = brake_force * oversteer_comp;

    let understeer_comp = map_range(
        rad2deg(stability.understeer_angle).abs(),
        esp.under_min,
        esp.under_max,
        esp.under_min_comp,
        esp.under_max_comp,
    );
    let understeer_add = brake_force * understeer_comp;

    // Understeer correction preempts the oversteer one.
    let oversteer = stability.esp_oversteer && !stability.esp_understeer;
    let understeer = stability.esp_understeer;

    let corrections = [
        (pedal_force * bias_front, oversteer && over_angle < 0.0, oversteer_add),
        (pedal_force * bias_front, oversteer && over_angle > 0.0, oversteer_add),
        (pedal_force * bias_rear, understeer && avg_angle > 0.0, understeer_add),
        (pedal_force * bias_rear, understeer && avg_angle < 0.0, understeer_add),
    ];
    for (wheel, (base, corrected, add)) in corrections.iter().enumerate() {
        host.set_wheel_brake_pressure(wheel, base + if *corrected { *add } else { 0.0 });
    }
    debug_assert!(telemetry.wheel_count == 4);
}
