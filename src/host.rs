//! Host simulation boundary.
//!
//! The host owns vehicle physics, geometry and rendering; the overlay sees it
//! as a read/write register file ([`HostVehicle`]) plus a set of idempotent,
//! capability-gated behavior overrides ([`PatchGate`]). Handling coefficients
//! are exposed through a typed accessor rather than raw offsets.
//!
//! The core reads registers once per tick (into a
//! [`VehicleTelemetry`](crate::types::VehicleTelemetry) snapshot) and writes
//! back a bounded set each tick; it never reads its own writes mid-tick.

use crate::error::Result;
use crate::math::Vec3;
use crate::types::{VehicleClass, VehicleDomain, VehicleFlags};

/// Typed handling coefficient identifiers.
///
/// Backed by an offset table inside the host adapter; the overlay never sees
/// raw offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlingField {
    BrakeForce,
    BrakeBiasFront,
    BrakeBiasRear,
    ClutchChangeRateUp,
    ClutchChangeRateDown,
    DriveForce,
}

/// Host input controls the overlay may suppress or synthesize for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostControl {
    Accelerate,
    Brake,
    Handbrake,
    LookBehind,
}

/// Read/write register file over the occupied vehicle.
///
/// Reads are sampled once per tick into a telemetry snapshot. Writes are
/// bounded: RPM, clutch, throttle, gear, per-wheel brake/power/skid, engine
/// health/on-off, control overrides. Control overrides last one host frame.
pub trait HostVehicle {
    /// A vehicle is occupied by the player and drivable.
    fn occupied(&self) -> bool;
    /// Stable identity of the occupied vehicle, `None` when on foot.
    fn vehicle_id(&self) -> Option<u64>;
    fn model_name(&self) -> String;
    fn plate(&self) -> String;

    // Telemetry reads.
    fn rpm(&self) -> f32;
    fn throttle(&self) -> f32;
    fn gear_curr(&self) -> u8;
    fn gear_top(&self) -> u8;
    fn gear_ratios(&self) -> Vec<f32>;
    fn drive_max_flat_vel(&self) -> f32;
    fn wheel_count(&self) -> usize;
    fn wheels_driven(&self) -> Vec<bool>;
    fn wheels_locked_up(&self) -> Vec<bool>;
    fn wheels_on_ground(&self) -> Vec<bool>;
    fn wheel_tyre_speeds(&self) -> Vec<f32>;
    fn suspension_travel(&self) -> Vec<f32>;
    fn wheel_brake_pressures(&self) -> Vec<f32>;
    fn wheel_powers(&self) -> Vec<f32>;
    fn wheel_skids(&self) -> Vec<f32>;
    fn avg_wheel_angle(&self) -> f32;
    fn handbrake(&self) -> bool;
    fn in_burnout(&self) -> bool;
    fn velocity(&self) -> Vec3;
    fn speed(&self) -> f32;
    fn rotation_velocity(&self) -> Vec3;
    fn domain(&self) -> VehicleDomain;
    fn class(&self) -> VehicleClass;
    fn flags(&self) -> VehicleFlags;
    fn engine_running(&self) -> bool;
    fn engine_health(&self) -> f32;
    /// Typed handling coefficient access.
    fn handling(&self, field: HandlingField) -> f32;

    // Register writes.
    fn set_rpm(&mut self, value: f32);
    fn set_clutch(&mut self, value: f32);
    fn set_throttle(&mut self, value: f32);
    /// Display throttle; negative values light the reverse lamps.
    fn set_throttle_p(&mut self, value: f32);
    fn set_brake_p(&mut self, value: f32);
    /// Writes both the current and next gear registers.
    fn set_gear(&mut self, gear: u8);
    fn set_wheel_brake_pressure(&mut self, wheel: usize, value: f32);
    fn set_wheel_power(&mut self, wheel: usize, value: f32);
    fn set_wheel_skid(&mut self, wheel: usize, value: f32);
    fn set_engine_health(&mut self, value: f32);
    fn set_engine_on(&mut self, on: bool);
    fn set_brake_lights(&mut self, on: bool);
    fn set_steering_multiplier(&mut self, mult: f32);
    /// Forward force at the center of mass, host acceleration units.
    fn apply_forward_force(&mut self, accel: f32);

    // One-frame control overrides.
    fn disable_control(&mut self, control: HostControl);
    fn set_control(&mut self, control: HostControl, value: f32);
    fn control_pressed(&self, control: HostControl) -> bool;
}

/// One low-level behavior override.
///
/// `apply`/`restore` must be idempotent: applying an already-applied patch is
/// a no-op, as is restoring an unapplied one. `patched()` is the observable
/// guard.
pub trait PatchGate {
    fn patched(&self) -> bool;
    fn apply(&mut self) -> Result<()>;
    fn restore(&mut self) -> Result<()>;
}

/// The four behavior overrides the overlay manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    SteeringAssist,
    SteeringControl,
    Brake,
    Throttle,
}

impl PatchKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatchKind::SteeringAssist => "steering-assist",
            PatchKind::SteeringControl => "steering-control",
            PatchKind::Brake => "brake",
            PatchKind::Throttle => "throttle",
        }
    }
}

/// The overlay's patch gates, one per [`PatchKind`].
///
/// Engagement is lazy and edge-triggered: a gate is applied on first need and
/// restored when the owning feature deactivates. A gate that fails to apply
/// downgrades its feature to inactive and is reported once, not retried every
/// tick.
pub struct PatchSet<G: PatchGate> {
    pub steering_assist: G,
    pub steering_control: G,
    pub brake: G,
    pub throttle: G,
    /// Kinds that failed to apply this session; suppresses retry spam.
    failed: Vec<PatchKind>,
}

impl<G: PatchGate> PatchSet<G> {
    pub fn new(steering_assist: G, steering_control: G, brake: G, throttle: G) -> Self {
        Self { steering_assist, steering_control, brake, throttle, failed: Vec::new() }
    }

    fn gate(&mut self, kind: PatchKind) -> &mut G {
        match kind {
            PatchKind::SteeringAssist => &mut self.steering_assist,
            PatchKind::SteeringControl => &mut self.steering_control,
            PatchKind::Brake => &mut self.brake,
            PatchKind::Throttle => &mut self.throttle,
        }
    }

    pub fn patched(&self, kind: PatchKind) -> bool {
        match kind {
            PatchKind::SteeringAssist => self.steering_assist.patched(),
            PatchKind::SteeringControl => self.steering_control.patched(),
            PatchKind::Brake => self.brake.patched(),
            PatchKind::Throttle => self.throttle.patched(),
        }
    }

    /// A gate is usable unless it already failed to apply this session.
    pub fn available(&self, kind: PatchKind) -> bool {
        !self.failed.contains(&kind)
    }

    /// Engage `kind` if it isn't already. Returns whether the patch is now
    /// applied; a first-time failure is logged and permanently downgrades
    /// the gate.
    pub fn ensure_applied(&mut self, kind: PatchKind) -> bool {
        if self.failed.contains(&kind) {
            return false;
        }
        if self.patched(kind) {
            return true;
        }
        match self.gate(kind).apply() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Patch '{}' failed to apply, feature disabled: {err}", kind.name());
                self.failed.push(kind);
                false
            }
        }
    }

    /// Disengage `kind` if it is applied.
    pub fn ensure_restored(&mut self, kind: PatchKind) {
        if !self.patched(kind) {
            return;
        }
        if let Err(err) = self.gate(kind).restore() {
            tracing::warn!("Patch '{}' failed to restore: {err}", kind.name());
        }
    }

    /// Restore every applied gate (overlay disable / vehicle change).
    pub fn restore_all(&mut self) {
        for kind in [
            PatchKind::SteeringAssist,
            PatchKind::SteeringControl,
            PatchKind::Brake,
            PatchKind::Throttle,
        ] {
            self.ensure_restored(kind);
        }
    }
}

/// In-process patch gate: a guarded flag with no real host capability.
///
/// Stands in for hosts without memory-patching support and backs the test
/// doubles; `fail_apply` simulates a capability failure.
#[derive(Debug, Default)]
pub struct SoftPatch {
    applied: bool,
    pub fail_apply: bool,
}

impl PatchGate for SoftPatch {
    fn patched(&self) -> bool {
        self.applied
    }

    fn apply(&mut self) -> Result<()> {
        if self.fail_apply {
            return Err(crate::error::DrivelineError::patch_failed("soft", "applied"));
        }
        self.applied = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.applied = false;
        Ok(())
    }
}
