// crates/coupled-driver-generate/src/error.rs
// ============================================================================
// Module: Generation Errors
// Description: Failures while expanding a configuration directory.
// Purpose: Keep configuration, file and consistency errors distinguishable.
// Dependencies: coupled-driver-config, coupled-driver-core, thiserror
// ============================================================================

//! ## Overview
//! [`GenerateError::driver`] exposes the core error behind either wrapper so
//! callers can match on `FileExists` or `MissingInput`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use coupled_driver_config::ConfigError;
use coupled_driver_core::DriverError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while generating a run tree.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The configuration directory could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Input parsing, rendering or file output failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The configuration cannot be expanded as given.
    #[error("cannot generate configuration: {0}")]
    Invalid(String),
}

impl GenerateError {
    /// Returns the underlying driver error, looking through configuration
    /// errors.
    #[must_use]
    pub const fn driver(&self) -> Option<&DriverError> {
        match self {
            Self::Driver(error) | Self::Config(ConfigError::Driver(error)) => Some(error),
            Self::Config(_) | Self::Invalid(_) => None,
        }
    }
}

/// Result alias for generation.
pub type GenerateResult<T> = Result<T, GenerateError>;
