//! Test doubles shared across the crate: canned telemetry, a register-file
//! mock and a scriptable input source.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::{HashMap, HashSet};

use crate::host::{HandlingField, HostControl, HostVehicle};
use crate::math::Vec3;
use crate::types::{
    Axis, ButtonState, ControlId, InputDevice, InputFrame, VehicleClass, VehicleDomain,
    VehicleFlags, VehicleTelemetry,
};

/// Build an [`InputFrame`] with the given buttons freshly pressed this tick.
///
/// The frame's active device follows the first button. Presses are marked as
/// taps too, so controller edge checks see them.
pub fn frame_with_buttons(ids: &[ControlId]) -> InputFrame {
    let mut frame = InputFrame::default();
    frame.device = ids.first().map(|id| id.device());
    for id in ids {
        frame.buttons.insert(
            *id,
            ButtonState {
                bound: true,
                down: true,
                just_pressed: true,
                just_released: false,
                held_ms: 0,
                tapped: true,
            },
        );
    }
    frame
}

/// Fluent builder for [`VehicleTelemetry`] snapshots.
#[derive(Debug, Clone)]
pub struct TelemetryBuilder {
    telemetry: VehicleTelemetry,
}

impl TelemetryBuilder {
    /// A four-wheel road car in first gear, idling, all wheels driven.
    pub fn car() -> Self {
        Self {
            telemetry: VehicleTelemetry {
                rpm: 0.2,
                rpm_prev: 0.2,
                throttle: 0.0,
                gear_curr: 1,
                gear_top: 6,
                gear_ratios: vec![-3.2, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8],
                drive_max_flat_vel: 50.0,
                wheel_count: 4,
                wheels_driven: vec![true; 4],
                wheels_locked_up: vec![false; 4],
                wheels_on_ground: vec![true; 4],
                wheel_tyre_speeds: vec![0.0; 4],
                wheel_average_driven_tyre_speed: 0.0,
                suspension_travel: vec![0.15; 4],
                wheel_brake_pressures: vec![0.0; 4],
                wheel_powers: vec![0.0; 4],
                wheel_skids: vec![0.0; 4],
                avg_wheel_angle: 0.0,
                handbrake: false,
                in_burnout: false,
                velocity: Vec3::default(),
                speed: 0.0,
                rotation_velocity: Vec3::default(),
                domain: VehicleDomain::Road,
                class: VehicleClass::Car,
                flags: VehicleFlags { is_electric: false, has_abs: false, has_clutch: true },
                engine_running: true,
                engine_health: 1000.0,
            },
        }
    }

    pub fn gear(mut self, gear: u8) -> Self {
        self.telemetry.gear_curr = gear;
        self
    }

    pub fn top_gear(mut self, gear: u8) -> Self {
        self.telemetry.gear_top = gear;
        self
    }

    pub fn rpm(mut self, rpm: f32) -> Self {
        self.telemetry.rpm = rpm;
        self.telemetry.rpm_prev = rpm;
        self
    }

    pub fn rpm_prev(mut self, rpm: f32) -> Self {
        self.telemetry.rpm_prev = rpm;
        self
    }

    pub fn gear_ratios(mut self, ratios: Vec<f32>) -> Self {
        self.telemetry.gear_ratios = ratios;
        self
    }

    pub fn max_flat_vel(mut self, vel: f32) -> Self {
        self.telemetry.drive_max_flat_vel = vel;
        self
    }

    pub fn wheel_speeds(mut self, speeds: Vec<f32>) -> Self {
        self.telemetry.wheel_count = speeds.len();
        self.telemetry.wheel_tyre_speeds = speeds;
        self
    }

    pub fn driven(mut self, driven: Vec<bool>) -> Self {
        self.telemetry.wheels_driven = driven;
        self
    }

    pub fn engine_health(mut self, health: f32) -> Self {
        self.telemetry.engine_health = health;
        self
    }

    pub fn no_clutch(mut self) -> Self {
        self.telemetry.flags.has_clutch = false;
        self
    }

    pub fn build(mut self) -> VehicleTelemetry {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for (speed, driven) in
            self.telemetry.wheel_tyre_speeds.iter().zip(&self.telemetry.wheels_driven)
        {
            if *driven {
                sum += speed;
                count += 1;
            }
        }
        self.telemetry.wheel_average_driven_tyre_speed =
            if count > 0 { sum / count as f32 } else { 0.0 };
        self.telemetry
    }
}

/// In-memory register file capturing every write.
#[derive(Debug, Clone)]
pub struct MockVehicle {
    pub occupied: bool,
    pub vehicle_id: Option<u64>,
    pub model_name: String,
    pub plate: String,

    pub rpm: f32,
    pub throttle: f32,
    pub gear_curr: u8,
    pub gear_top: u8,
    pub gear_ratios: Vec<f32>,
    pub drive_max_flat_vel: f32,
    pub wheels_driven: Vec<bool>,
    pub wheels_locked_up: Vec<bool>,
    pub wheels_on_ground: Vec<bool>,
    pub wheel_tyre_speeds: Vec<f32>,
    pub suspension_travel: Vec<f32>,
    pub avg_wheel_angle: f32,
    pub handbrake: bool,
    pub in_burnout: bool,
    pub velocity: Vec3,
    pub speed: f32,
    pub rotation_velocity: Vec3,
    pub domain: VehicleDomain,
    pub class: VehicleClass,
    pub flags: VehicleFlags,
    pub engine_on: bool,
    pub engine_health: f32,
    pub handling: HashMap<HandlingField, f32>,

    // Captured writes.
    pub rpm_written: Option<f32>,
    pub clutch_written: Option<f32>,
    pub throttle_written: Option<f32>,
    pub throttle_p_written: Option<f32>,
    pub brake_p_written: Option<f32>,
    pub gear_written: Option<u8>,
    pub wheel_brake_pressures: Vec<f32>,
    pub wheel_powers: Vec<f32>,
    pub wheel_skids: Vec<f32>,
    pub brake_lights: bool,
    pub steering_mult_written: Option<f32>,
    pub forward_force: Option<f32>,
    pub disabled_controls: Vec<HostControl>,
    pub control_values: HashMap<HostControl, f32>,
    pub pressed_controls: HashSet<HostControl>,
}

impl MockVehicle {
    /// An occupied, running four-wheel car.
    pub fn car() -> Self {
        let handling = HashMap::from([
            (HandlingField::BrakeForce, 1.0),
            (HandlingField::BrakeBiasFront, 1.0),
            (HandlingField::BrakeBiasRear, 1.0),
            (HandlingField::ClutchChangeRateUp, 2.5),
            (HandlingField::ClutchChangeRateDown, 2.5),
            (HandlingField::DriveForce, 0.3),
        ]);
        Self {
            occupied: true,
            vehicle_id: Some(1),
            model_name: "Fusilade".into(),
            plate: "46EEK572".into(),
            rpm: 0.2,
            throttle: 0.0,
            gear_curr: 1,
            gear_top: 6,
            gear_ratios: vec![-3.2, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8],
            drive_max_flat_vel: 50.0,
            wheels_driven: vec![true; 4],
            wheels_locked_up: vec![false; 4],
            wheels_on_ground: vec![true; 4],
            wheel_tyre_speeds: vec![0.0; 4],
            suspension_travel: vec![0.15; 4],
            avg_wheel_angle: 0.0,
            handbrake: false,
            in_burnout: false,
            velocity: Vec3::default(),
            speed: 0.0,
            rotation_velocity: Vec3::default(),
            domain: VehicleDomain::Road,
            class: VehicleClass::Car,
            flags: VehicleFlags { is_electric: false, has_abs: false, has_clutch: true },
            engine_on: true,
            engine_health: 1000.0,
            handling,
            rpm_written: None,
            clutch_written: None,
            throttle_written: None,
            throttle_p_written: None,
            brake_p_written: None,
            gear_written: None,
            wheel_brake_pressures: vec![0.0; 4],
            wheel_powers: vec![0.0; 4],
            wheel_skids: vec![0.0; 4],
            brake_lights: false,
            steering_mult_written: None,
            forward_force: None,
            disabled_controls: Vec::new(),
            control_values: HashMap::new(),
            pressed_controls: HashSet::new(),
        }
    }

    /// Value last written to a synthesized control, 0 when untouched.
    pub fn control_value(&self, control: HostControl) -> f32 {
        self.control_values.get(&control).copied().unwrap_or(0.0)
    }

    /// Drop all captured writes and one-frame overrides, as a new host frame
    /// would.
    pub fn clear_frame(&mut self) {
        self.rpm_written = None;
        self.clutch_written = None;
        self.throttle_written = None;
        self.throttle_p_written = None;
        self.brake_p_written = None;
        self.gear_written = None;
        self.forward_force = None;
        self.disabled_controls.clear();
        self.control_values.clear();
    }
}

impl HostVehicle for MockVehicle {
    fn occupied(&self) -> bool {
        self.occupied
    }
    fn vehicle_id(&self) -> Option<u64> {
        self.vehicle_id
    }
    fn model_name(&self) -> String {
        self.model_name.clone()
    }
    fn plate(&self) -> String {
        self.plate.clone()
    }

    fn rpm(&self) -> f32 {
        self.rpm
    }
    fn throttle(&self) -> f32 {
        self.throttle
    }
    fn gear_curr(&self) -> u8 {
        self.gear_curr
    }
    fn gear_top(&self) -> u8 {
        self.gear_top
    }
    fn gear_ratios(&self) -> Vec<f32> {
        self.gear_ratios.clone()
    }
    fn drive_max_flat_vel(&self) -> f32 {
        self.drive_max_flat_vel
    }
    fn wheel_count(&self) -> usize {
        self.wheel_tyre_speeds.len()
    }
    fn wheels_driven(&self) -> Vec<bool> {
        self.wheels_driven.clone()
    }
    fn wheels_locked_up(&self) -> Vec<bool> {
        self.wheels_locked_up.clone()
    }
    fn wheels_on_ground(&self) -> Vec<bool> {
        self.wheels_on_ground.clone()
    }
    fn wheel_tyre_speeds(&self) -> Vec<f32> {
        self.wheel_tyre_speeds.clone()
    }
    fn suspension_travel(&self) -> Vec<f32> {
        self.suspension_travel.clone()
    }
    fn wheel_brake_pressures(&self) -> Vec<f32> {
        self.wheel_brake_pressures.clone()
    }
    fn wheel_powers(&self) -> Vec<f32> {
        self.wheel_powers.clone()
    }
    fn wheel_skids(&self) -> Vec<f32> {
        self.wheel_skids.clone()
    }
    fn avg_wheel_angle(&self) -> f32 {
        self.avg_wheel_angle
    }
    fn handbrake(&self) -> bool {
        self.handbrake
    }
    fn in_burnout(&self) -> bool {
        self.in_burnout
    }
    fn velocity(&self) -> Vec3 {
        self.velocity
    }
    fn speed(&self) -> f32 {
        self.speed
    }
    fn rotation_velocity(&self) -> Vec3 {
        self.rotation_velocity
    }
    fn domain(&self) -> VehicleDomain {
        self.domain
    }
    fn class(&self) -> VehicleClass {
        self.class
    }
    fn flags(&self) -> VehicleFlags {
        self.flags
    }
    fn engine_running(&self) -> bool {
        self.engine_on
    }
    fn engine_health(&self) -> f32 {
        self.engine_health
    }
    fn handling(&self, field: HandlingField) -> f32 {
        self.handling.get(&field).copied().unwrap_or(0.0)
    }

    fn set_rpm(&mut self, value: f32) {
        self.rpm_written = Some(value);
    }
    fn set_clutch(&mut self, value: f32) {
        self.clutch_written = Some(value);
    }
    fn set_throttle(&mut self, value: f32) {
        self.throttle_written = Some(value);
    }
    fn set_throttle_p(&mut self, value: f32) {
        self.throttle_p_written = Some(value);
    }
    fn set_brake_p(&mut self, value: f32) {
        self.brake_p_written = Some(value);
    }
    fn set_gear(&mut self, gear: u8) {
        self.gear_written = Some(gear);
    }
    fn set_wheel_brake_pressure(&mut self, wheel: usize, value: f32) {
        if wheel < self.wheel_brake_pressures.len() {
            self.wheel_brake_pressures[wheel] = value;
        }
    }
    fn set_wheel_power(&mut self, wheel: usize, value: f32) {
        if wheel < self.wheel_powers.len() {
            self.wheel_powers[wheel] = value;
        }
    }
    fn set_wheel_skid(&mut self, wheel: usize, value: f32) {
        if wheel < self.wheel_skids.len() {
            self.wheel_skids[wheel] = value;
        }
    }
    fn set_engine_health(&mut self, value: f32) {
        self.engine_health = value;
    }
    fn set_engine_on(&mut self, on: bool) {
        self.engine_on = on;
    }
    fn set_brake_lights(&mut self, on: bool) {
        self.brake_lights = on;
    }
    fn set_steering_multiplier(&mut self, mult: f32) {
        self.steering_mult_written = Some(mult);
    }
    fn apply_forward_force(&mut self, accel: f32) {
        self.forward_force = Some(accel);
    }

    fn disable_control(&mut self, control: HostControl) {
        self.disabled_controls.push(control);
    }
    fn set_control(&mut self, control: HostControl, value: f32) {
        self.control_values.insert(control, value);
    }
    fn control_pressed(&self, control: HostControl) -> bool {
        self.pressed_controls.contains(&control)
    }
}

/// Scriptable [`InputSource`](crate::device::InputSource): buttons and axes
/// are whatever the test last set them to. Controls never touched read as
/// unbound.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    buttons: HashMap<ControlId, bool>,
    axes: HashMap<(Axis, InputDevice), f32>,
    pub wheel_available: bool,
}

impl ScriptedInput {
    pub fn keyboard() -> Self {
        Self { wheel_available: true, ..Default::default() }
    }

    pub fn wheel() -> Self {
        Self { wheel_available: true, ..Default::default() }
    }

    pub fn press(&mut self, id: ControlId) {
        self.buttons.insert(id, true);
    }

    pub fn release(&mut self, id: ControlId) {
        self.buttons.insert(id, false);
    }

    pub fn set_axis(&mut self, axis: Axis, device: InputDevice, value: f32) {
        self.axes.insert((axis, device), value);
    }
}

impl crate::device::InputSource for ScriptedInput {
    fn axis(&self, axis: Axis, device: InputDevice) -> Option<f32> {
        self.axes.get(&(axis, device)).copied()
    }

    fn button(&self, id: ControlId) -> Option<bool> {
        self.buttons.get(&id).copied()
    }

    fn wheel_available(&self) -> bool {
        self.wheel_available
    }
}
