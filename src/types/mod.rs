//! Core types for the overlay engine.
//!
//! - [`VehicleTelemetry`] is the immutable-per-tick host snapshot
//! - [`InputFrame`] is the normalized device input for one tick
//! - [`GearboxState`] / [`WheelPatchState`] are the cross-tick mutable state
//!   owned by the orchestrator and reset on vehicle change

mod input;
mod state;
mod telemetry;

pub use input::{
    Axis, ButtonState, ControlId, ControllerControl, InputDevice, InputFrame, KeyboardControl,
    MAX_H_GEAR, WheelControl,
};
pub use state::{GearboxState, ShiftDirection, ShiftMode, WheelPatchState};
pub use telemetry::{VehicleClass, VehicleDomain, VehicleFlags, VehicleTelemetry};
