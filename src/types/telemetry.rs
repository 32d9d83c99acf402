//! Per-tick vehicle telemetry snapshot.
//!
//! [`VehicleTelemetry`] is read wholesale from the host register file at the
//! start of every tick and treated as immutable for the rest of the pipeline.
//! It is only valid while a vehicle is occupied and is discarded on vehicle
//! change.

use serde::{Deserialize, Serialize};

use crate::host::HostVehicle;
use crate::math::Vec3;

/// Operating medium of the occupied vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleDomain {
    Road,
    Water,
    Air,
    Bicycle,
    Rail,
    Unknown,
}

/// Coarse vehicle classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleClass {
    Car,
    Bike,
    Heli,
    Plane,
    Boat,
    Quad,
    Train,
    Unknown,
}

/// Drivetrain-relevant vehicle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleFlags {
    pub is_electric: bool,
    pub has_abs: bool,
    pub has_clutch: bool,
}

/// Immutable-per-tick snapshot of the host's vehicle state.
///
/// Normalized units: `rpm` is in `[0, 1]`, speeds in host units per second,
/// gear 0 is reverse and `gear_top` is the highest forward gear.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTelemetry {
    pub rpm: f32,
    pub rpm_prev: f32,
    pub throttle: f32,
    pub gear_curr: u8,
    pub gear_top: u8,
    /// Gear ratio table indexed by gear (0 = reverse).
    pub gear_ratios: Vec<f32>,
    /// Theoretical flat-out velocity of the drivetrain.
    pub drive_max_flat_vel: f32,
    pub wheel_count: usize,
    pub wheels_driven: Vec<bool>,
    pub wheels_locked_up: Vec<bool>,
    pub wheels_on_ground: Vec<bool>,
    pub wheel_tyre_speeds: Vec<f32>,
    pub wheel_average_driven_tyre_speed: f32,
    pub suspension_travel: Vec<f32>,
    pub wheel_brake_pressures: Vec<f32>,
    pub wheel_powers: Vec<f32>,
    pub wheel_skids: Vec<f32>,
    pub avg_wheel_angle: f32,
    pub handbrake: bool,
    pub in_burnout: bool,
    /// Velocity in the vehicle's local frame; `y` is forward.
    pub velocity: Vec3,
    pub speed: f32,
    pub rotation_velocity: Vec3,
    pub domain: VehicleDomain,
    pub class: VehicleClass,
    pub flags: VehicleFlags,
    pub engine_running: bool,
    pub engine_health: f32,
}

impl VehicleTelemetry {
    /// Read a fresh snapshot from the host register file.
    ///
    /// `rpm_prev` carries last tick's RPM across snapshots so the rev
    /// synthesizer can keep RPM continuous; pass the previous snapshot's
    /// `rpm`, or the current RPM on the first tick against a vehicle.
    pub fn read(host: &impl HostVehicle, rpm_prev: f32) -> Self {
        let wheel_count = host.wheel_count();
        let wheels_driven = host.wheels_driven();
        let wheel_tyre_speeds = host.wheel_tyre_speeds();

        let mut driven_speed_sum = 0.0f32;
        let mut driven_count = 0usize;
        for i in 0..wheel_count {
            if wheels_driven.get(i).copied().unwrap_or(false) {
                driven_speed_sum += wheel_tyre_speeds.get(i).copied().unwrap_or(0.0);
                driven_count += 1;
            }
        }
        let wheel_average_driven_tyre_speed = if driven_count > 0 {
            driven_speed_sum / driven_count as f32
        } else {
            0.0
        };

        Self {
            rpm: host.rpm(),
            rpm_prev,
            throttle: host.throttle(),
            gear_curr: host.gear_curr(),
            gear_top: host.gear_top(),
            gear_ratios: host.gear_ratios(),
            drive_max_flat_vel: host.drive_max_flat_vel(),
            wheel_count,
            wheels_driven,
            wheels_locked_up: host.wheels_locked_up(),
            wheels_on_ground: host.wheels_on_ground(),
            wheel_tyre_speeds,
            wheel_average_driven_tyre_speed,
            suspension_travel: host.suspension_travel(),
            wheel_brake_pressures: host.wheel_brake_pressures(),
            wheel_powers: host.wheel_powers(),
            wheel_skids: host.wheel_skids(),
            avg_wheel_angle: host.avg_wheel_angle(),
            handbrake: host.handbrake(),
            in_burnout: host.in_burnout(),
            velocity: host.velocity(),
            speed: host.speed(),
            rotation_velocity: host.rotation_velocity(),
            domain: host.domain(),
            class: host.class(),
            flags: host.flags(),
            engine_running: host.engine_running(),
            engine_health: host.engine_health(),
        }
    }

    /// Ratio for `gear`, falling back to 1.0 for out-of-table gears.
    pub fn gear_ratio(&self, gear: u8) -> f32 {
        self.gear_ratios.get(gear as usize).copied().unwrap_or(1.0)
    }

    /// Drivetrain speed at full RPM in `gear`.
    pub fn max_speed_in_gear(&self, gear: u8) -> f32 {
        let ratio = self.gear_ratio(gear);
        if ratio.abs() < f32::EPSILON {
            return 0.0;
        }
        self.drive_max_flat_vel / ratio
    }

    /// RPM the engine would sit at for the current driven wheel speed in
    /// `gear`, assuming a fully engaged clutch.
    pub fn rev_matched_rpm(&self, gear: u8) -> f32 {
        let max_speed = self.max_speed_in_gear(gear);
        if max_speed.abs() < f32::EPSILON {
            return 0.0;
        }
        self.wheel_average_driven_tyre_speed / max_speed
    }

    /// True when any wheel touches the ground.
    pub fn any_wheel_on_ground(&self) -> bool {
        self.wheels_on_ground.iter().any(|&on| on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TelemetryBuilder;

    #[test]
    fn driven_average_ignores_free_rolling_wheels() {
        let telemetry = TelemetryBuilder::car()
            .wheel_speeds(vec![10.0, 10.0, 20.0, 20.0])
            .driven(vec![false, false, true, true])
            .build();
        assert_eq!(telemetry.wheel_average_driven_tyre_speed, 20.0);
    }

    #[test]
    fn rev_matched_rpm_scales_with_gear_ratio() {
        let telemetry = TelemetryBuilder::car()
            .gear_ratios(vec![-1.0, 3.0, 2.0, 1.5, 1.0])
            .max_flat_vel(60.0)
            .wheel_speeds(vec![10.0; 4])
            .driven(vec![true; 4])
            .build();
        // 60/3 = 20 max speed in first, 10 units/s => 0.5 normalized RPM.
        assert!((telemetry.rev_matched_rpm(1) - 0.5).abs() < 1e-6);
        // Higher gear, lower expected RPM at same wheel speed.
        assert!(telemetry.rev_matched_rpm(3) < telemetry.rev_matched_rpm(1));
    }

    #[test]
    fn zero_ratio_gear_does_not_divide_by_zero() {
        let telemetry = TelemetryBuilder::car().gear_ratios(vec![0.0, 0.0]).build();
        assert_eq!(telemetry.max_speed_in_gear(1), 0.0);
        assert_eq!(telemetry.rev_matched_rpm(1), 0.0);
    }

    #[test]
    fn out_of_table_gear_falls_back() {
        let telemetry = TelemetryBuilder::car().gear_ratios(vec![-1.0, 3.0]).build();
        assert_eq!(telemetry.gear_ratio(7), 1.0);
    }
}
