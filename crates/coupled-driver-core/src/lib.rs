// crates/coupled-driver-core/src/lib.rs
// ============================================================================
// Module: Coupled Driver Core
// Description: Platform table, job scripts and model input rendering.
// Purpose: Provide the building blocks the generator assembles into run trees.
// Dependencies: serde, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! This crate renders every text artifact of a coupled ADCIRC run: SLURM job
//! scripts, ensemble run and cleanup scripts, NEMS coupling files and the
//! ADCIRC mesh, nodal attribute and parameter files. It performs no
//! scheduling; it only writes files.
//! Invariants:
//! - Platform and forcing names are validated against closed tables.
//! - Every write honors the caller's overwrite flag.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adcirc;
pub mod error;
pub mod forcing;
pub mod fs;
pub mod nems;
pub mod platform;
pub mod script;
pub mod timeutil;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::DriverError;
pub use error::DriverResult;
pub use forcing::ConstituentSelection;
pub use forcing::ForcingKind;
pub use forcing::TidalSource;
pub use nems::ModelingSystem;
pub use platform::Platform;
pub use script::EnsembleCleanupScript;
pub use script::EnsembleRunScript;
pub use script::GenerationScript;
pub use script::JobScript;
pub use script::SlurmEmailType;

/// Generator label written into file headers.
pub const GENERATOR: &str = concat!("coupled-driver ", env!("CARGO_PKG_VERSION"));
