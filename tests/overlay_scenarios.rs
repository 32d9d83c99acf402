//! End-to-end scenarios driving [`driveline::Overlay`] through its public
//! surface only: a host double implementing [`HostVehicle`] and an input
//! double implementing [`InputSource`], ticked at 60 Hz.

use std::collections::{HashMap, HashSet};

use driveline::math::Vec3;
use driveline::types::{
    Axis, ControlId, InputDevice, KeyboardControl, ShiftMode, VehicleClass, VehicleDomain,
    VehicleFlags,
};
use driveline::{
    HandlingField, HostControl, HostVehicle, InputSource, Overlay, PatchSet, Settings, SoftPatch,
};

const DT: f32 = 1.0 / 60.0;

/// Minimal register-file double. Telemetry fields are plain data the test
/// sets up; writes land in the same fields or the capture members.
struct TestHost {
    vehicle_id: Option<u64>,
    rpm: f32,
    throttle: f32,
    gear_curr: u8,
    gear_top: u8,
    gear_ratios: Vec<f32>,
    wheel_speeds: Vec<f32>,
    wheels_driven: Vec<bool>,
    wheels_locked_up: Vec<bool>,
    suspension_travel: Vec<f32>,
    wheel_brake_pressures: Vec<f32>,
    velocity: Vec3,
    speed: f32,
    engine_on: bool,
    flags: VehicleFlags,

    gear_written: Option<u8>,
    clutch_written: Option<f32>,
    disabled_controls: Vec<HostControl>,
    control_values: HashMap<HostControl, f32>,
    pressed_controls: HashSet<HostControl>,
}

impl TestHost {
    fn car() -> Self {
        Self {
            vehicle_id: Some(7),
            rpm: 0.2,
            throttle: 0.0,
            gear_curr: 1,
            gear_top: 6,
            gear_ratios: vec![-3.2, 3.3, 2.2, 1.6, 1.2, 1.0, 0.8],
            wheel_speeds: vec![0.0; 4],
            wheels_driven: vec![true; 4],
            wheels_locked_up: vec![false; 4],
            suspension_travel: vec![0.15; 4],
            wheel_brake_pressures: vec![0.0; 4],
            velocity: Vec3::default(),
            speed: 0.0,
            engine_on: true,
            flags: VehicleFlags { is_electric: false, has_abs: false, has_clutch: true },
            gear_written: None,
            clutch_written: None,
            disabled_controls: Vec::new(),
            control_values: HashMap::new(),
            pressed_controls: HashSet::new(),
        }
    }

    fn rolling(speed: f32, gear: u8, rpm: f32) -> Self {
        let mut host = Self::car();
        host.speed = speed;
        host.velocity = Vec3::new(0.0, speed, 0.0);
        host.wheel_speeds = vec![speed; 4];
        host.gear_curr = gear;
        host.rpm = rpm;
        host
    }

    fn clear_frame(&mut self) {
        self.gear_written = None;
        self.clutch_written = None;
        self.disabled_controls.clear();
        self.control_values.clear();
    }
}

impl HostVehicle for TestHost {
    fn occupied(&self) -> bool {
        self.vehicle_id.is_some()
    }
    fn vehicle_id(&self) -> Option<u64> {
        self.vehicle_id
    }
    fn model_name(&self) -> String {
        "Dominator".into()
    }
    fn plate(&self) -> String {
        "TEST 001".into()
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
        50.0
    }
    fn wheel_count(&self) -> usize {
        self.wheel_speeds.len()
    }
    fn wheels_driven(&self) -> Vec<bool> {
        self.wheels_driven.clone()
    }
    fn wheels_locked_up(&self) -> Vec<bool> {
        self.wheels_locked_up.clone()
    }
    fn wheels_on_ground(&self) -> Vec<bool> {
        vec![true; self.wheel_speeds.len()]
    }
    fn wheel_tyre_speeds(&self) -> Vec<f32> {
        self.wheel_speeds.clone()
    }
    fn suspension_travel(&self) -> Vec<f32> {
        self.suspension_travel.clone()
    }
    fn wheel_brake_pressures(&self) -> Vec<f32> {
        self.wheel_brake_pressures.clone()
    }
    fn wheel_powers(&self) -> Vec<f32> {
        vec![0.0; self.wheel_speeds.len()]
    }
    fn wheel_skids(&self) -> Vec<f32> {
        vec![0.0; self.wheel_speeds.len()]
    }
    fn avg_wheel_angle(&self) -> f32 {
        0.0
    }
    fn handbrake(&self) -> bool {
        false
    }
    fn in_burnout(&self) -> bool {
        false
    }
    fn velocity(&self) -> Vec3 {
        self.velocity
    }
    fn speed(&self) -> f32 {
        self.speed
    }
    fn rotation_velocity(&self) -> Vec3 {
        Vec3::default()
    }
    fn domain(&self) -> VehicleDomain {
        VehicleDomain::Road
    }
    fn class(&self) -> VehicleClass {
        VehicleClass::Car
    }
    fn flags(&self) -> VehicleFlags {
        self.flags
    }
    fn engine_running(&self) -> bool {
        self.engine_on
    }
    fn engine_health(&self) -> f32 {
        1000.0
    }
    fn handling(&self, field: HandlingField) -> f32 {
        match field {
            HandlingField::ClutchChangeRateUp | HandlingField::ClutchChangeRateDown => 2.5,
            HandlingField::DriveForce => 0.3,
            _ => 1.0,
        }
    }

    fn set_rpm(&mut self, _value: f32) {}
    fn set_clutch(&mut self, value: f32) {
        self.clutch_written = Some(value);
    }
    fn set_throttle(&mut self, _value: f32) {}
    fn set_throttle_p(&mut self, _value: f32) {}
    fn set_brake_p(&mut self, _value: f32) {}
    fn set_gear(&mut self, gear: u8) {
        self.gear_written = Some(gear);
    }
    fn set_wheel_brake_pressure(&mut self, wheel: usize, value: f32) {
        self.wheel_brake_pressures[wheel] = value;
    }
    fn set_wheel_power(&mut self, _wheel: usize, _value: f32) {}
    fn set_wheel_skid(&mut self, _wheel: usize, _value: f32) {}
    fn set_engine_health(&mut self, _value: f32) {}
    fn set_engine_on(&mut self, on: bool) {
        self.engine_on = on;
    }
    fn set_brake_lights(&mut self, _on: bool) {}
    fn set_steering_multiplier(&mut self, _mult: f32) {}
    fn apply_forward_force(&mut self, _accel: f32) {}

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

/// Scriptable input double: every button reads as bound, axes come from a
/// table, no wheel hardware.
#[derive(Default)]
struct TestInput {
    down: HashSet<ControlId>,
    axes: HashMap<(Axis, InputDevice), f32>,
}

impl TestInput {
    fn press(&mut self, id: ControlId) {
        self.down.insert(id);
    }
    fn release(&mut self, id: ControlId) {
        self.down.remove(&id);
    }
    fn set_axis(&mut self, axis: Axis, value: f32) {
        self.axes.insert((axis, InputDevice::Keyboard), value);
    }
}

impl InputSource for TestInput {
    fn axis(&self, axis: Axis, device: InputDevice) -> Option<f32> {
        self.axes.get(&(axis, device)).copied()
    }
    fn button(&self, id: ControlId) -> Option<bool> {
        Some(self.down.contains(&id))
    }
    fn wheel_available(&self) -> bool {
        false
    }
}

fn overlay_with(settings: Settings) -> Overlay<SoftPatch> {
    Overlay::new(
        settings,
        PatchSet::new(
            SoftPatch::default(),
            SoftPatch::default(),
            SoftPatch::default(),
            SoftPatch::default(),
        ),
    )
}

fn base_settings() -> Settings {
    let mut settings = Settings::default();
    settings.global.game_assists.default_neutral = false;
    settings
}

#[test]
fn sequential_upshift_reaches_the_host() {
    let mut overlay = overlay_with(base_settings());
    let mut host = TestHost::rolling(15.0, 1, 0.7);
    let mut input = TestInput::default();
    overlay.tick(&mut host, &input, DT);

    input.press(ControlId::Keyboard(KeyboardControl::ShiftUp));
    overlay.tick(&mut host, &input, DT);
    input.release(ControlId::Keyboard(KeyboardControl::ShiftUp));

    let mut ticks = 0;
    while host.gear_written != Some(2) && ticks < 120 {
        overlay.tick(&mut host, &input, DT);
        ticks += 1;
    }
    assert_eq!(host.gear_written, Some(2));
    // The blend took more than one frame.
    assert!(ticks > 1);
}

#[test]
fn automatic_box_upshifts_under_throttle() {
    let mut settings = base_settings();
    settings.global.mt_options.shift_mode = ShiftMode::Automatic;
    let mut overlay = overlay_with(settings);

    let mut host = TestHost::rolling(20.0, 1, 0.9);
    let mut input = TestInput::default();
    input.set_axis(Axis::Throttle, 0.9);

    let mut ticks = 0;
    while host.gear_written != Some(2) && ticks < 120 {
        overlay.tick(&mut host, &input, DT);
        ticks += 1;
    }
    assert_eq!(host.gear_written, Some(2));
}

#[test]
fn lugging_at_standstill_stalls_the_engine() {
    let mut settings = base_settings();
    settings.global.mt_options.eng_stall_s = true;
    let mut overlay = overlay_with(settings);

    let mut host = TestHost::car();
    host.rpm = 0.1;
    let input = TestInput::default();

    let mut ticks = 0;
    while host.engine_on && ticks < 600 {
        overlay.tick(&mut host, &input, DT);
        ticks += 1;
    }
    assert!(!host.engine_on);
    // Stall progress needed several frames to build.
    assert!(ticks > 5);
}

#[test]
fn abs_releases_the_locked_wheel() {
    let mut settings = base_settings();
    settings.global.drive_assists.abs.enable = true;
    let mut overlay = overlay_with(settings);

    let mut host = TestHost::rolling(20.0, 3, 0.5);
    host.wheels_locked_up = vec![true, false, false, false];
    host.wheel_brake_pressures = vec![0.5; 4];
    let mut input = TestInput::default();
    input.set_axis(Axis::Brake, 1.0);

    overlay.tick(&mut host, &input, DT);
    overlay.tick(&mut host, &input, DT);

    assert_eq!(host.wheel_brake_pressures[0], 0.0);
    assert!(host.wheel_brake_pressures[1] > 0.0);
}

#[test]
fn toggle_off_stops_all_register_writes() {
    let mut overlay = overlay_with(base_settings());
    let mut host = TestHost::rolling(15.0, 2, 0.5);
    let mut input = TestInput::default();
    overlay.tick(&mut host, &input, DT);
    assert!(host.gear_written.is_some());

    input.press(ControlId::Keyboard(KeyboardControl::Toggle));
    overlay.tick(&mut host, &input, DT);
    input.release(ControlId::Keyboard(KeyboardControl::Toggle));

    host.clear_frame();
    overlay.tick(&mut host, &input, DT);
    assert_eq!(host.gear_written, None);
    assert_eq!(host.clutch_written, None);
}

#[test]
fn profile_override_changes_live_behavior() {
    use driveline::config::{MtOptions, VehicleProfile};

    let mut settings = base_settings();
    settings.override_enable = true;
    settings.profiles.push(VehicleProfile {
        name: "auto box".into(),
        model_names: vec!["Dominator".into()],
        plates: vec![],
        profile: driveline::Profile {
            mt_options: MtOptions { shift_mode: ShiftMode::Automatic, ..Default::default() },
            ..Default::default()
        },
    });
    let mut overlay = overlay_with(settings);

    // Same stimulus as the automatic scenario, but the mode comes from the
    // matched vehicle profile instead of the global settings.
    let mut host = TestHost::rolling(20.0, 1, 0.9);
    let mut input = TestInput::default();
    input.set_axis(Axis::Throttle, 0.9);

    let mut ticks = 0;
    while host.gear_written != Some(2) && ticks < 120 {
        overlay.tick(&mut host, &input, DT);
        ticks += 1;
    }
    assert_eq!(host.gear_written, Some(2));
    assert!(overlay.settings().has_active_profile());
}

mod update_notice {
    use super::*;
    use async_trait::async_trait;
    use driveline::{ReleaseInfo, UpdateSource};

    struct StubSource;

    #[async_trait]
    impl UpdateSource for StubSource {
        async fn latest_release(&self) -> driveline::Result<ReleaseInfo> {
            Ok(ReleaseInfo { version: "v1.2.0".into(), url: "https://example.invalid".into() })
        }
    }

    #[tokio::test]
    async fn release_notice_surfaces_through_tick() {
        let mut overlay = overlay_with(base_settings());
        let mut host = TestHost::car();
        let input = TestInput::default();

        overlay.start_update_check(StubSource, "v1.0.0");
        for _ in 0..100 {
            tokio::task::yield_now().await;
            overlay.tick(&mut host, &input, DT);
            if overlay.pending_update().is_some() {
                break;
            }
        }
        let release = overlay.pending_update().expect("release notice expected");
        assert_eq!(release.version, "v1.2.0");
    }
}
