//! Hierarchical settings with per-vehicle overrides.
//!
//! A [`Settings`] object holds the global [`Profile`] (everything the
//! transmission and assist pipeline reads per tick) plus a table of
//! [`VehicleProfile`] overrides keyed by model name or license plate. The
//! live accessor [`Settings::active`] resolves to the override while one is
//! selected and the global profile otherwise.
//!
//! Files are YAML; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrivelineError, Result};
use crate::types::ShiftMode;

fn default_true() -> bool {
    true
}

/// Core transmission toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MtOptions {
    pub enable: bool,
    pub shift_mode: ShiftMode,
    /// Require clutch for H-pattern shifts.
    pub clutch_shift_h: bool,
    /// Require clutch for sequential shifts.
    pub clutch_shift_s: bool,
    pub eng_brake: bool,
    pub eng_damage: bool,
    pub eng_lock: bool,
    pub eng_stall_h: bool,
    pub eng_stall_s: bool,
    pub clutch_creep: bool,
    /// Limit speed in every gear, not just intermediates.
    pub hard_limiter: bool,
}

impl Default for MtOptions {
    fn default() -> Self {
        Self {
            enable: true,
            shift_mode: ShiftMode::Sequential,
            clutch_shift_h: true,
            clutch_shift_s: false,
            eng_brake: false,
            eng_damage: false,
            eng_lock: false,
            eng_stall_h: false,
            eng_stall_s: false,
            clutch_creep: false,
            hard_limiter: false,
        }
    }
}

/// Transmission tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MtParams {
    /// Pedal travel from fully pressed within which the clutch counts as
    /// pressed.
    pub clutch_threshold: f32,
    pub stalling_threshold: f32,
    /// Normalized RPM below which the engine can stall.
    pub stalling_rpm: f32,
    /// Engine health bled per tick of sustained over-rev.
    pub rpm_damage: f32,
    /// Engine health cost of a misshift.
    pub misshift_damage: f32,
    /// Normalized RPM above which engine braking activates.
    pub eng_brake_threshold: f32,
    pub eng_brake_power: f32,
}

impl Default for MtParams {
    fn default() -> Self {
        Self {
            clutch_threshold: 0.15,
            stalling_threshold: 0.35,
            stalling_rpm: 0.09,
            rpm_damage: 0.1,
            misshift_damage: 10.0,
            eng_brake_threshold: 0.75,
            eng_brake_power: 1.0,
        }
    }
}

/// Shift-progression options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftOptions {
    /// Multiplier on the vehicle's handling clutch change rate.
    pub clutch_rate_mult: f32,
    /// Rev-match tolerance for H-pattern validation.
    pub rpm_tolerance: f32,
    /// Cut throttle while upshifting without pedal clutch.
    pub upshift_cut: bool,
    /// Blip throttle while downshifting without pedal clutch.
    pub downshift_blip: bool,
}

impl Default for ShiftOptions {
    fn default() -> Self {
        Self { clutch_rate_mult: 1.0, rpm_tolerance: 0.25, upshift_cut: true, downshift_blip: true }
    }
}

/// Automatic-mode shift decision parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoParams {
    /// Engine load below which the box upshifts.
    pub upshift_load: f32,
    /// Engine load above which the box downshifts.
    pub downshift_load: f32,
    /// Minimum RPM the next gear must reach before an upshift.
    pub next_gear_min_rpm: f32,
    /// RPM floor in the current gear before a downshift.
    pub curr_gear_min_rpm: f32,
    /// Throttle peak-hold decay per second.
    pub eco_rate: f32,
    /// Downshift cooldown as a multiple of the upshift clutch time.
    pub downshift_timeout_mult: f32,
}

impl Default for AutoParams {
    fn default() -> Self {
        Self {
            upshift_load: 0.12,
            downshift_load: 0.60,
            next_gear_min_rpm: 0.33,
            curr_gear_min_rpm: 0.27,
            eco_rate: 0.05,
            downshift_timeout_mult: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsSettings {
    pub enable: bool,
    /// Defer to the vehicle's own ABS when it has one.
    #[serde(default = "default_true")]
    pub filter: bool,
}

impl Default for AbsSettings {
    fn default() -> Self {
        Self { enable: false, filter: true }
    }
}

/// Traction control operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TcsMode {
    #[default]
    Off,
    /// Brake the slipping wheel.
    Brake,
    /// Cut throttle input entirely.
    Throttle,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TcsSettings {
    pub mode: TcsMode,
    /// Wheel speed over vehicle speed that counts as slip.
    pub slip_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EspSettings {
    pub enable: bool,
    /// Oversteer detection window, degrees.
    pub over_min: f32,
    pub over_max: f32,
    /// Brake compensation range mapped over the oversteer window.
    pub over_min_comp: f32,
    pub over_max_comp: f32,
    /// Understeer detection window, degrees.
    pub under_min: f32,
    pub under_max: f32,
    pub under_min_comp: f32,
    pub under_max_comp: f32,
}

impl Default for EspSettings {
    fn default() -> Self {
        Self {
            enable: false,
            over_min: 4.0,
            over_max: 30.0,
            over_min_comp: 0.0,
            over_max_comp: 2.0,
            under_min: 6.0,
            under_max: 30.0,
            under_min_comp: 0.0,
            under_max_comp: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DriveAssists {
    pub abs: AbsSettings,
    pub tcs: TcsSettings,
    pub esp: EspSettings,
}

/// Host-side convenience assists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameAssists {
    /// Start in fake neutral when entering a vehicle.
    pub default_neutral: bool,
    /// Snap back to first when stopped in a higher gear (sequential).
    pub auto_gear1: bool,
    pub auto_look_back: bool,
    /// Start the engine on heavy throttle with a free gear.
    pub throttle_start: bool,
    /// Arcade handling for bikes.
    pub simple_bike: bool,
}

impl Default for GameAssists {
    fn default() -> Self {
        Self {
            default_neutral: true,
            auto_gear1: false,
            auto_look_back: false,
            throttle_start: false,
            simple_bike: false,
        }
    }
}

/// Everything the per-tick pipeline reads; the overridable unit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Profile {
    pub mt_options: MtOptions,
    pub mt_params: MtParams,
    pub shift_options: ShiftOptions,
    pub auto_params: AutoParams,
    pub drive_assists: DriveAssists,
    pub game_assists: GameAssists,
}

/// A per-vehicle override profile, matched by model name or plate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VehicleProfile {
    pub name: String,
    pub model_names: Vec<String>,
    pub plates: Vec<String>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringSettings {
    pub wheel_steer_mult: f32,
    pub custom_steer_mult: f32,
    /// Enhanced keyboard/controller steering (engages the steering patches).
    pub custom_steering: bool,
}

impl Default for SteeringSettings {
    fn default() -> Self {
        Self { wheel_steer_mult: 1.0, custom_steer_mult: 1.0, custom_steering: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Controllers can't express an H-pattern; fall back to automatic.
    pub block_h_shift: bool,
    /// Hold time for controller toggle buttons, milliseconds.
    pub hold_time_ms: u64,
    /// Allow the engine button to also switch the engine off.
    pub toggle_engine: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self { block_h_shift: true, hold_time_ms: 250, toggle_engine: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelOptions {
    pub enable: bool,
    /// Use the H-shifter gate as the automatic-mode selector.
    pub use_shifter_for_auto: bool,
    /// Accept keyboard H-pattern keys while the wheel is active.
    pub h_pattern_keyboard: bool,
}

impl Default for WheelOptions {
    fn default() -> Self {
        Self { enable: true, use_shifter_for_auto: false, h_pattern_keyboard: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    pub enable: bool,
    /// Release version the user chose to ignore.
    pub ignored_version: String,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self { enable: true, ignored_version: String::new() }
    }
}

/// Root settings object.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub global: Profile,
    pub steering: SteeringSettings,
    pub controller: ControllerSettings,
    pub wheel: WheelOptions,
    pub update: UpdateSettings,
    /// Honor per-vehicle override profiles.
    pub override_enable: bool,
    pub profiles: Vec<VehicleProfile>,
    #[serde(skip)]
    active: Option<usize>,
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DrivelineError::config_file(path.to_path_buf(), e))?;
        serde_yaml_ng::from_str(&text)
            .map_err(|e| DrivelineError::config_parse(path.display().to_string(), e.to_string()))
    }

    /// Load one vehicle profile file and append it to the override table.
    ///
    /// Profiles without any model name or plate cannot match and are
    /// rejected.
    pub fn load_profile(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DrivelineError::config_file(path.to_path_buf(), e))?;
        let profile: VehicleProfile = serde_yaml_ng::from_str(&text)
            .map_err(|e| DrivelineError::config_parse(path.display().to_string(), e.to_string()))?;
        if profile.model_names.is_empty() && profile.plates.is_empty() {
            return Err(DrivelineError::config_parse(
                path.display().to_string(),
                "profile has no model names or plates",
            ));
        }
        tracing::debug!("Loaded vehicle profile [{}]", profile.name);
        self.profiles.push(profile);
        Ok(())
    }

    /// Select the override profile for a vehicle, if any matches.
    ///
    /// Plate matches are case-insensitive and rank equal to model matches;
    /// the first matching profile wins. Returns the selected profile name.
    pub fn select_profile(&mut self, model: &str, plate: &str) -> Option<&str> {
        self.active = None;
        if !self.override_enable {
            return None;
        }
        let model_lower = model.to_lowercase();
        let plate_lower = plate.trim().to_lowercase();
        let index = self.profiles.iter().position(|p| {
            p.model_names.iter().any(|m| m.to_lowercase() == model_lower)
                || p.plates.iter().any(|pl| pl.trim().to_lowercase() == plate_lower)
        })?;
        self.active = Some(index);
        let name = self.profiles[index].name.as_str();
        tracing::info!("Vehicle profile [{name}] selected");
        Some(name)
    }

    /// Drop the active override (vehicle left / no match).
    pub fn clear_profile(&mut self) {
        self.active = None;
    }

    /// Live accessor: the active override when selected, else the global
    /// profile.
    pub fn active(&self) -> &Profile {
        match self.active {
            Some(i) => &self.profiles[i].profile,
            None => &self.global,
        }
    }

    pub fn has_active_profile(&self) -> bool {
        self.active.is_some()
    }

    /// Change the shift mode on whichever profile is live.
    pub fn set_shift_mode(&mut self, mode: ShiftMode) {
        match self.active {
            Some(i) => self.profiles[i].profile.mt_options.shift_mode = mode,
            None => self.global.mt_options.shift_mode = mode,
        }
    }
}
