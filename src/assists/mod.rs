//! Force and torque shaping on top of the gearbox.
//!
//! Each feature reads the telemetry snapshot and the current input frame and
//! writes per-wheel forces, control overrides or engine state back to the
//! host. Features that need a behavior override raise a flag in
//! [`WheelPatchState`](crate::types::WheelPatchState); the brake arbitration
//! in [`brake`] is the single place those flags turn into patch engagement.

pub mod brake;
pub mod clutch;
pub mod engine;
pub mod reverse;
