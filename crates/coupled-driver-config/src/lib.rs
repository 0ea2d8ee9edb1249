// crates/coupled-driver-config/src/lib.rs
// ============================================================================
// Module: Coupled Driver Config
// Description: Configuration directory model and site settings.
// Purpose: Persist run parameters between `initialize` and `generate`.
// Dependencies: coupled-driver-core, serde, serde_json, toml, tracing
// ============================================================================

//! ## Overview
//! `initialize` writes a directory of JSON files describing a run; `generate`
//! reads it back and expands it. This crate owns that directory format, the
//! perturbation expansion and the optional TOML settings file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod files;
pub mod run;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ConfigError;
pub use error::ConfigResult;
pub use files::AdcircJson;
pub use files::AtmeshForcingJson;
pub use files::DEFAULT_ADCIRC_PROCESSORS;
pub use files::BestTrackForcingJson;
pub use files::ModelDriverJson;
pub use files::NemsJson;
pub use files::OwiForcingJson;
pub use files::Perturbation;
pub use files::SlurmJson;
pub use files::TidalForcingJson;
pub use files::Ww3DataForcingJson;
pub use run::RunConfiguration;
pub use run::UNPERTURBED;
pub use settings::DriverSettings;
pub use settings::PlatformSettings;
