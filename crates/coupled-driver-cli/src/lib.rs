// crates/coupled-driver-cli/src/lib.rs
// ============================================================================
// Module: Coupled Driver CLI Library
// Description: Shared helpers for the coupled-driver binary.
// Purpose: Expose the message catalog and initialize logic for testing.
// Dependencies: coupled-driver-config, coupled-driver-core
// ============================================================================

//! ## Overview
//! The `coupled-driver` binary is a thin dispatcher; the option resolution
//! behind `initialize` and the user-facing message catalog live here so they
//! can be tested without spawning the binary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;
pub mod initialize;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use initialize::InitializeOptions;
pub use initialize::build_configuration;
pub use initialize::write_configuration;
