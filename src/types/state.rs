//! Mutable gearbox and patch state carried across ticks.
//!
//! Both structs live for exactly as long as one vehicle is occupied: the
//! orchestrator rebuilds them from `Default` on every vehicle change, never
//! reusing state across vehicles.

use serde::{Deserialize, Serialize};

/// Which of the three mutually exclusive shifting algorithms drives the
/// gearbox each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShiftMode {
    #[default]
    Sequential,
    HPattern,
    Automatic,
}

impl ShiftMode {
    /// Cycle Sequential -> H-Pattern -> Automatic -> Sequential.
    pub fn next(self) -> Self {
        match self {
            ShiftMode::Sequential => ShiftMode::HPattern,
            ShiftMode::HPattern => ShiftMode::Automatic,
            ShiftMode::Automatic => ShiftMode::Sequential,
        }
    }
}

/// Direction of an in-flight shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftDirection {
    #[default]
    Up,
    Down,
}

/// Gearbox state machine data.
///
/// `clutch_val` is the shift-clutch blend in `[0, 1]`, distinct from the
/// pedal clutch: it ramps to 1 while disengaging, the gear commits, then it
/// ramps back to 0. Values above 1.5 are treated as a stuck shift and
/// force-recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct GearboxState {
    /// Committed gear, written to the host gear registers each tick.
    pub lock_gear: u8,
    /// Target gear while a shift is in flight.
    pub next_gear: u8,
    pub shifting: bool,
    pub clutch_val: f32,
    pub shift_direction: ShiftDirection,
    /// Simulated neutral while the host stays mechanically in gear.
    pub fake_neutral: bool,
    /// Stall accumulator; crossing 1.0 kills the engine.
    pub stall_progress: f32,
    /// Decaying peak-hold of throttle, drives automatic shift hysteresis.
    pub throttle_hang: f32,
    /// Game-time seconds of the last automatic upshift.
    pub last_upshift_time: f64,
    pub hit_rpm_limiter: bool,
    pub hit_speed_limiter: bool,
    /// Last derived engine-load metric (diagnostics).
    pub engine_load: f32,
}

impl Default for GearboxState {
    fn default() -> Self {
        Self {
            lock_gear: 1,
            next_gear: 1,
            shifting: false,
            clutch_val: 0.0,
            shift_direction: ShiftDirection::Up,
            fake_neutral: false,
            stall_progress: 0.0,
            throttle_hang: 0.0,
            last_upshift_time: 0.0,
            hit_rpm_limiter: false,
            hit_speed_limiter: false,
            engine_load: 0.0,
        }
    }
}

/// Which low-level behavior overrides want to be engaged this tick.
///
/// Set by the force-shaping features, consumed by the brake patch
/// arbitration, reset on vehicle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelPatchState {
    pub eng_brake_active: bool,
    pub eng_lock_active: bool,
    pub induce_burnout: bool,
}
