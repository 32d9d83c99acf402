//! Manual transmission and drive-assist overlay engine.
//!
//! Driveline sits between a host driving simulation and the player: each host
//! frame it reads a vehicle telemetry snapshot plus the player's pedals and
//! buttons, runs a gearbox state machine and a set of force-shaping assists,
//! and writes a bounded set of registers back to the host.
//!
//! # Features
//!
//! - **Three shift modes**: sequential, H-pattern and automatic, cycled at
//!   runtime
//! - **Force shaping**: engine braking, engine locking, stalling, clutch
//!   creep, burnouts and a separate-pedal reverse
//! - **Drive assists**: ABS, traction and stability control with per-wheel
//!   brake arbitration
//! - **Per-vehicle profiles**: YAML settings with model/plate overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use driveline::{Overlay, PatchSet, Settings, SoftPatch};
//!
//! let settings = Settings::load("settings.yml")?;
//! let mut overlay = Overlay::new(
//!     settings,
//!     PatchSet::new(
//!         SoftPatch::default(),
//!         SoftPatch::default(),
//!         SoftPatch::default(),
//!         SoftPatch::default(),
//!     ),
//! );
//! // Each host frame:
//! // overlay.tick(&mut host, &input_source, dt);
//! # Ok::<(), driveline::DrivelineError>(())
//! ```
//!
//! The host boundary is two traits: [`HostVehicle`] (the vehicle register
//! file) and [`InputSource`] (raw device input). Implement them against your
//! host and feed [`Overlay::tick`] once per frame.

// Core types and error handling
pub mod config;
mod error;
pub mod math;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Host and device boundaries
pub mod device;
pub mod host;

// Gearbox and force shaping
pub mod assists;
pub mod gearbox;
pub mod rev;

// Pipeline and background services
pub mod orchestrator;
pub mod update_check;

// Core exports
pub use config::{Profile, Settings};
pub use error::*;
pub use types::*;

// Boundary exports
pub use device::{InputPoller, InputSource};
pub use host::{HandlingField, HostControl, HostVehicle, PatchGate, PatchKind, PatchSet, SoftPatch};

// Main API exports
pub use orchestrator::Overlay;
pub use update_check::{ReleaseInfo, UpdateChecker, UpdateSource};
