// crates/coupled-driver-generate/src/lib.rs
// ============================================================================
// Module: Coupled Driver Generate
// Description: Run tree generation from a configuration directory.
// Purpose: Turn the JSON configuration into files the model reads.
// Dependencies: coupled-driver-config, coupled-driver-core, tracing
// ============================================================================

//! ## Overview
//! [`generate_adcirc_configuration`] reads a configuration directory written
//! by `initialize` and writes the mesh, an optional tidal spinup, one
//! directory per perturbation and the scripts that submit them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod generator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::GenerateError;
pub use error::GenerateResult;
pub use generator::GeneratedTree;
pub use generator::RUNS_DIRECTORY;
pub use generator::SPINUP_DIRECTORY;
pub use generator::generate_adcirc_configuration;
