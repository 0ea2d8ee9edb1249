// crates/coupled-driver-core/src/error.rs
// ============================================================================
// Module: Driver Errors
// Description: Error type shared by the core rendering and file helpers.
// Purpose: Surface descriptive, fatal failures to the invoking command.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every fallible operation in the core crate returns [`DriverError`]. Errors
//! are never retried; callers propagate them to the CLI which prints the
//! message and exits with a failure code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or writing configuration artifacts.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Platform name is not in the platform table.
    #[error("unrecognized platform \"{name}\"; must be one of {valid}")]
    UnknownPlatform {
        /// Name supplied by the caller.
        name: String,
        /// Comma-separated list of valid names.
        valid: String,
    },
    /// Forcing name is not one of the supported forcings.
    #[error("unrecognized forcing \"{name}\"; must be one of {valid}")]
    UnknownForcing {
        /// Name supplied by the caller.
        name: String,
        /// Comma-separated list of valid names.
        valid: String,
    },
    /// An enumerated value could not be parsed.
    #[error("invalid {kind} \"{value}\"")]
    InvalidValue {
        /// Kind of value being parsed (for example `email type`).
        kind: &'static str,
        /// Offending input.
        value: String,
    },
    /// Datetime or duration string could not be parsed.
    #[error("invalid time value \"{0}\"")]
    InvalidTime(String),
    /// A required input file does not exist.
    #[error("{kind} not found at \"{}\"", path.display())]
    MissingInput {
        /// Description of the missing input.
        kind: &'static str,
        /// Path that was checked.
        path: PathBuf,
    },
    /// Output file exists and overwriting is disabled.
    #[error("file exists at \"{}\"", .0.display())]
    FileExists(PathBuf),
    /// Input file could not be parsed.
    #[error("failed to parse \"{}\": {message}", path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Rendering inputs are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Filesystem failure.
    #[error("io error at \"{}\": {message}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O message.
        message: String,
    },
}

impl DriverError {
    /// Builds an [`DriverError::Io`] from a path and an I/O error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

/// Result alias for core operations.
pub type DriverResult<T> = Result<T, DriverError>;
