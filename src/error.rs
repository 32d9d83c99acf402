//! Error types for the overlay engine.
//!
//! All failures in the tick pipeline are local and non-fatal: a failed patch
//! downgrades its feature, a missing device makes a feature inactive, and a
//! corrupted shift state is force-recovered. Errors surface here only at the
//! crate boundary (configuration loading, patch capability, update checks).
//!
//! ## Error Categories
//!
//! - **Config Errors**: settings or vehicle profile files failed to load/parse
//! - **Patch Errors**: a low-level behavior override could not be engaged
//! - **Device Errors**: an input device went away mid-session
//! - **State Errors**: internal shift state left its plausible bounds
//!   (recovered locally, reported for diagnostics)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for overlay operations.
pub type Result<T, E = DrivelineError> = std::result::Result<T, E>;

/// Main error type for overlay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DrivelineError {
    #[error("Config file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error in {context}: {details}")]
    ConfigParse { context: String, details: String },

    #[error("Patch '{patch}' could not be {operation}")]
    Patch {
        patch: String,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Input device unavailable: {device}")]
    DeviceUnavailable { device: String },

    #[error("Shift state out of bounds: clutch blend {clutch_val} (recovered)")]
    ShiftStateCorrupt { clutch_val: f32 },
}

impl DrivelineError {
    /// Returns whether the failing feature may be retried later.
    ///
    /// Non-recoverable errors permanently downgrade the dependent feature
    /// for the session; recoverable ones may come back (device replug,
    /// patch re-attempt on mode change).
    pub fn is_recoverable(&self) -> bool {
        match self {
            DrivelineError::ConfigFile { .. } => false,
            DrivelineError::ConfigParse { .. } => false,
            DrivelineError::Patch { .. } => true,
            DrivelineError::DeviceUnavailable { .. } => true,
            DrivelineError::ShiftStateCorrupt { .. } => true,
        }
    }

    /// Helper constructor for config file errors with path context.
    pub fn config_file(path: PathBuf, source: std::io::Error) -> Self {
        DrivelineError::ConfigFile { path, source }
    }

    /// Helper constructor for config parse errors.
    pub fn config_parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        DrivelineError::ConfigParse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for patch failures.
    pub fn patch_failed(patch: impl Into<String>, operation: impl Into<String>) -> Self {
        DrivelineError::Patch { patch: patch.into(), operation: operation.into(), source: None }
    }

    /// Helper constructor for patch failures with an underlying cause.
    pub fn patch_failed_with_source(
        patch: impl Into<String>,
        operation: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        DrivelineError::Patch {
            patch: patch.into(),
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for device loss.
    pub fn device_unavailable(device: impl Into<String>) -> Self {
        DrivelineError::DeviceUnavailable { device: device.into() }
    }
}

impl From<std::io::Error> for DrivelineError {
    fn from(err: std::io::Error) -> Self {
        DrivelineError::ConfigFile { path: PathBuf::from("<unknown>"), source: err }
    }
}
