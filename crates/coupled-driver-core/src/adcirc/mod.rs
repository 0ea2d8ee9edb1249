// crates/coupled-driver-core/src/adcirc/mod.rs
// ============================================================================
// Module: ADCIRC Inputs
// Description: Mesh, nodal attributes, tides, parameter file and jobs.
// Purpose: Group the ADCIRC-specific file formats.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! ADCIRC reads a mesh (`fort.14`), optional nodal attributes (`fort.13`) and
//! a parameter file (`fort.15`). Jobs decompose the mesh and launch the model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod attributes;
pub mod fort15;
pub mod jobs;
pub mod mesh;
pub mod tides;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attributes::FORT13;
pub use attributes::NodalAttribute;
pub use attributes::NodalAttributes;
pub use fort15::FORT15;
pub use fort15::Fort15;
pub use fort15::GwceScheme;
pub use fort15::MeteorologicalForcing;
pub use fort15::RunPhase;
pub use fort15::Station;
pub use jobs::AswipCommand;
pub use jobs::JobTemplate;
pub use mesh::FORT14;
pub use mesh::Mesh;
