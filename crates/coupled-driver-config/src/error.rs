// crates/coupled-driver-config/src/error.rs
// ============================================================================
// Module: Configuration Errors
// Description: Error type shared by the settings file and JSON configuration.
// Purpose: Report load, parse and validation failures with their cause.
// Dependencies: coupled-driver-core, thiserror
// ============================================================================

//! ## Overview
//! Settings and JSON configuration share one error type. Failures from the
//! core writers pass through unchanged as [`ConfigError::Driver`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use coupled_driver_core::DriverError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Failure reported by the file writers or core parsers.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
