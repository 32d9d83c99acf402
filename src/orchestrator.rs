//! Per-tick pipeline.
//!
//! [`Overlay`] owns every piece of cross-tick state and runs the fixed
//! sequence each host frame: telemetry snapshot, input poll, overlay
//! toggles, the drive features, the shifting algorithm, shift progression
//! and finally the RPM/clutch/gear writeback. All state is rebuilt on
//! vehicle change; nothing leaks between vehicles.

use crate::assists::{brake, clutch, engine, reverse};
use crate::config::Settings;
use crate::device::{InputPoller, InputSource};
use crate::gearbox::{self, automatic, hpattern, is_clutch_pressed, sequential};
use crate::host::{
    HandlingField, HostControl, HostVehicle, PatchGate, PatchKind, PatchSet,
};
use crate::rev;
use crate::types::{
    ControlId, ControllerControl, GearboxState, InputDevice, InputFrame, KeyboardControl,
    ShiftMode, VehicleClass, VehicleDomain, VehicleTelemetry, WheelControl, WheelPatchState,
};
use crate::update_check::{ReleaseInfo, UpdateChecker, UpdateSource};

/// Hold time for the wheel-mounted overlay toggle, milliseconds.
const WHEEL_TOGGLE_HOLD_MS: u64 = 500;

/// The running overlay: all cross-tick state plus the patch gates.
pub struct Overlay<G: PatchGate> {
    settings: Settings,
    gearbox: GearboxState,
    patch_state: WheelPatchState,
    poller: InputPoller,
    patches: PatchSet<G>,
    active_vehicle: Option<u64>,
    rpm_prev: f32,
    /// Accumulated game time, seconds.
    game_time: f64,
    clock_ms: f64,
    toggle_latch: bool,
    mode_latch: bool,
    engine_latch: bool,
    update_checker: Option<UpdateChecker>,
    pending_update: Option<ReleaseInfo>,
}

impl<G: PatchGate> Overlay<G> {
    pub fn new(settings: Settings, patches: PatchSet<G>) -> Self {
        Self {
            settings,
            gearbox: GearboxState::default(),
            patch_state: WheelPatchState::default(),
            poller: InputPoller::new(),
            patches,
            active_vehicle: None,
            rpm_prev: 0.0,
            game_time: 0.0,
            clock_ms: 0.0,
            toggle_latch: false,
            mode_latch: false,
            engine_latch: false,
            update_checker: None,
            pending_update: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Gearbox state for diagnostics.
    pub fn gearbox(&self) -> &GearboxState {
        &self.gearbox
    }

    /// Kick off the background release check. Requires a tokio runtime.
    pub fn start_update_check(&mut self, source: impl UpdateSource, current_version: &str) {
        if !self.settings.update.enable {
            return;
        }
        self.update_checker = Some(UpdateChecker::spawn(
            source,
            current_version,
            self.settings.update.ignored_version.clone(),
        ));
    }

    /// The release the background check surfaced, if any.
    pub fn pending_update(&self) -> Option<&ReleaseInfo> {
        self.pending_update.as_ref()
    }

    /// Enable or disable the whole overlay; disabling hands every patched
    /// behavior back to the host.
    pub fn set_enabled(&mut self, enable: bool) {
        if self.settings.global.mt_options.enable == enable {
            return;
        }
        self.settings.global.mt_options.enable = enable;
        if enable {
            tracing::info!("Manual transmission enabled");
        } else {
            tracing::info!("Manual transmission disabled");
            self.patches.restore_all();
        }
    }

    /// Run one tick against the host. `dt` is the host frame time, seconds.
    pub fn tick(&mut self, host: &mut impl HostVehicle, source: &impl InputSource, dt: f32) {
        self.game_time += dt as f64;
        self.clock_ms += dt as f64 * 1000.0;

        self.poll_update_notice();

        let vehicle = host.vehicle_id().filter(|_| host.occupied());
        if vehicle != self.active_vehicle {
            self.on_vehicle_change(host, vehicle);
        }
        if vehicle.is_none() {
            return;
        }

        let telemetry = VehicleTelemetry::read(host, self.rpm_prev);
        self.rpm_prev = telemetry.rpm;

        let input = self.poller.poll(source, self.clock_ms as u64, self.settings.wheel.enable);

        if self.toggle_requested(&input) {
            self.set_enabled(!self.settings.global.mt_options.enable);
            return;
        }

        if telemetry.domain != VehicleDomain::Road || !self.settings.global.mt_options.enable {
            return;
        }

        self.cycle_shift_mode(&input);

        let profile = self.settings.active().clone();
        let simple_bike =
            telemetry.class == VehicleClass::Bike && profile.game_assists.simple_bike;

        self.start_stop_engine(&input, &telemetry, &profile, host);
        self.update_features(&input, &telemetry, &profile, simple_bike, host, dt);

        match profile.mt_options.shift_mode {
            ShiftMode::Sequential => {
                sequential::update(&mut self.gearbox, &input, &telemetry, &profile);
                if profile.game_assists.auto_gear1
                    && telemetry.throttle < 0.1
                    && telemetry.speed < 0.1
                    && telemetry.gear_curr > 1
                {
                    gearbox::shift_to(&mut self.gearbox, 1, false);
                }
            }
            ShiftMode::HPattern => {
                hpattern::update(
                    &mut self.gearbox,
                    &input,
                    &telemetry,
                    &profile,
                    &self.settings.wheel,
                    host,
                );
            }
            ShiftMode::Automatic => {
                automatic::update(
                    &mut self.gearbox,
                    &input,
                    &telemetry,
                    &profile,
                    &self.settings.wheel,
                    host,
                    self.game_time,
                    dt,
                );
            }
        }

        rev::limiter(&mut self.gearbox, &telemetry, &profile);

        gearbox::update_shifting(
            &mut self.gearbox,
            host.handling(HandlingField::ClutchChangeRateUp),
            host.handling(HandlingField::ClutchChangeRateDown),
            profile.shift_options.clutch_rate_mult,
            dt,
        );

        rev::handle_rpm(&self.gearbox, &input, &telemetry, &profile, simple_bike, host, dt);
        host.set_gear(self.gearbox.lock_gear);

        self.update_steering(&input, &telemetry, host);
    }

    fn on_vehicle_change(&mut self, host: &impl HostVehicle, vehicle: Option<u64>) {
        self.gearbox = GearboxState::default();
        self.patch_state = WheelPatchState::default();
        self.patches.restore_all();
        self.active_vehicle = vehicle;
        self.rpm_prev = 0.0;

        if vehicle.is_none() {
            self.settings.clear_profile();
            return;
        }

        let model = host.model_name();
        self.settings.select_profile(&model, &host.plate());

        // Single-speed and electric drivetrains have no neutral to sit in.
        let flags = host.flags();
        if host.gear_top() == 1 || flags.is_electric {
            self.gearbox.fake_neutral = false;
        } else {
            self.gearbox.fake_neutral = self.settings.active().game_assists.default_neutral;
        }
        self.rpm_prev = host.rpm();
        tracing::debug!(model, "Vehicle changed");
    }

    fn toggle_requested(&mut self, input: &InputFrame) -> bool {
        let raw = input.just_pressed(ControlId::Keyboard(KeyboardControl::Toggle))
            || input.held_for(ControlId::Wheel(WheelControl::Toggle), WHEEL_TOGGLE_HOLD_MS)
            || (input.device_is(InputDevice::Controller)
                && input.held_for(
                    ControlId::Controller(ControllerControl::Toggle),
                    self.settings.controller.hold_time_ms,
                ));
        let fired = raw && !self.toggle_latch;
        self.toggle_latch = raw;
        fired
    }

    fn cycle_shift_mode(&mut self, input: &InputFrame) {
        let raw = input.just_pressed(ControlId::Keyboard(KeyboardControl::ToggleH))
            || input.just_pressed(ControlId::Wheel(WheelControl::ToggleH))
            || (input.device_is(InputDevice::Controller)
                && input.held_for(
                    ControlId::Controller(ControllerControl::ToggleH),
                    self.settings.controller.hold_time_ms,
                ));
        let fired = raw && !self.mode_latch;
        self.mode_latch = raw;
        if !fired {
            return;
        }

        let mut next = self.settings.active().mt_options.shift_mode.next();
        // Controllers can't express an H-pattern.
        if next == ShiftMode::HPattern
            && input.device_is(InputDevice::Controller)
            && self.settings.controller.block_h_shift
        {
            next = next.next();
        }
        self.settings.set_shift_mode(next);
        tracing::info!(mode = ?next, "Shift mode changed");
    }

    fn start_stop_engine(
        &mut self,
        input: &InputFrame,
        telemetry: &VehicleTelemetry,
        profile: &crate::config::Profile,
        host: &mut impl HostVehicle,
    ) {
        let controller_raw = input.device_is(InputDevice::Controller)
            && input.held_for(
                ControlId::Controller(ControllerControl::Engine),
                self.settings.controller.hold_time_ms,
            );
        let controller_active = controller_raw && !self.engine_latch;
        self.engine_latch = controller_raw;

        let keyboard_active = input.device_is(InputDevice::Keyboard)
            && input.just_pressed(ControlId::Keyboard(KeyboardControl::Engine));
        let wheel_active = input.device_is(InputDevice::Wheel)
            && input.just_pressed(ControlId::Wheel(WheelControl::Engine));

        let throttle_start = profile.game_assists.throttle_start
            && input.throttle > 0.75
            && (is_clutch_pressed(input, profile) || self.gearbox.fake_neutral);

        if !telemetry.engine_running
            && (controller_active || keyboard_active || wheel_active || throttle_start)
        {
            host.set_engine_on(true);
        } else if telemetry.engine_running
            && ((controller_active && self.settings.controller.toggle_engine)
                || keyboard_active
                || wheel_active)
        {
            host.set_engine_on(false);
        }
    }

    fn update_features(
        &mut self,
        input: &InputFrame,
        telemetry: &VehicleTelemetry,
        profile: &crate::config::Profile,
        simple_bike: bool,
        host: &mut impl HostVehicle,
        dt: f32,
    ) {
        if profile.game_assists.auto_look_back
            && telemetry.class != VehicleClass::Heli
            && telemetry.gear_top > 0
            && telemetry.gear_curr == 0
        {
            host.set_control(HostControl::LookBehind, 1.0);
        }

        // Wheel pedals already separate throttle and brake.
        if !input.device_is(InputDevice::Wheel) {
            if simple_bike {
                reverse::auto_reverse(&mut self.gearbox, telemetry, host);
            } else {
                reverse::real_reverse(
                    &self.gearbox,
                    &mut self.patch_state,
                    input,
                    telemetry,
                    profile,
                    host,
                    dt,
                );
            }
        }

        if profile.mt_options.eng_brake {
            engine::engine_brake(
                &mut self.patch_state,
                &self.gearbox,
                input,
                telemetry,
                profile,
                host,
            );
        } else {
            self.patch_state.eng_brake_active = false;
        }

        if profile.mt_options.eng_damage && telemetry.flags.has_clutch {
            engine::over_rev_damage(input, telemetry, profile, host);
        }

        if profile.mt_options.eng_lock {
            engine::engine_lock(
                &mut self.patch_state,
                &self.gearbox,
                input,
                telemetry,
                profile,
                host,
                dt,
            );
        } else {
            self.patch_state.eng_lock_active = false;
        }

        if !self.gearbox.fake_neutral && !simple_bike && telemetry.flags.has_clutch {
            let stalling = match profile.mt_options.shift_mode {
                ShiftMode::HPattern => profile.mt_options.eng_stall_h,
                ShiftMode::Sequential => profile.mt_options.eng_stall_s,
                ShiftMode::Automatic => false,
            };
            if stalling {
                clutch::engine_stall(&mut self.gearbox, input, telemetry, profile, host, dt);
            }
            if profile.mt_options.clutch_creep && telemetry.engine_running {
                clutch::clutch_catch(input, telemetry, profile, host);
            }
        }

        brake::handle_brake_patch(
            &self.patch_state,
            &mut self.patches,
            input,
            telemetry,
            profile,
            &self.settings.steering,
            host,
        );
    }

    fn update_steering(
        &mut self,
        input: &InputFrame,
        telemetry: &VehicleTelemetry,
        host: &mut impl HostVehicle,
    ) {
        let use_custom = self.settings.steering.custom_steering
            && telemetry.class == VehicleClass::Car
            && !input.device_is(InputDevice::Wheel);
        if use_custom {
            self.patches.ensure_applied(PatchKind::SteeringAssist);
            self.patches.ensure_applied(PatchKind::SteeringControl);
            host.set_steering_multiplier(self.settings.steering.custom_steer_mult);
        } else {
            self.patches.ensure_restored(PatchKind::SteeringAssist);
            self.patches.ensure_restored(PatchKind::SteeringControl);
            let mult = if input.device_is(InputDevice::Wheel) {
                self.settings.steering.wheel_steer_mult
            } else {
                1.0
            };
            host.set_steering_multiplier(mult);
        }
    }

    fn poll_update_notice(&mut self) {
        if let Some(checker) = self.update_checker.as_mut() {
            if let Some(release) = checker.poll() {
                tracing::info!(version = %release.version, url = %release.url, "Update available");
                self.pending_update = Some(release);
                self.update_checker = None;
            }
        }
    }
}
