// crates/coupled-driver-config/src/files.rs
// ============================================================================
// Module: Configuration Files
// Description: One JSON document per configuration concern.
// Purpose: Define the on-disk shape of a configuration directory.
// Dependencies: coupled-driver-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! A configuration directory holds `configure_<name>.json` files: the model
//! driver (platform and perturbations), SLURM settings, ADCIRC, optional NEMS
//! coupling and one file per forcing. Times are written as
//! `YYYY-MM-DD HH:MM:SS` and durations as `[D days, ]H:MM:SS`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_core::ConstituentSelection;
use coupled_driver_core::Platform;
use coupled_driver_core::SlurmEmailType;
use coupled_driver_core::TidalSource;
use coupled_driver_core::adcirc::GwceScheme;
use coupled_driver_core::adcirc::JobTemplate;
use coupled_driver_core::fs::read_text;
use coupled_driver_core::fs::write_text;
use coupled_driver_core::nems::Connection;
use coupled_driver_core::timeutil::serde_datetime;
use coupled_driver_core::timeutil::serde_datetime_option;
use coupled_driver_core::timeutil::serde_duration;
use coupled_driver_core::timeutil::serde_duration_option;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::Duration;
use time::PrimitiveDateTime;

use crate::error::ConfigError;
use crate::error::ConfigResult;

// ============================================================================
// SECTION: File Names
// ============================================================================

/// Model driver file.
pub const MODELDRIVER_FILENAME: &str = "configure_modeldriver.json";
/// SLURM file.
pub const SLURM_FILENAME: &str = "configure_slurm.json";
/// ADCIRC file.
pub const ADCIRC_FILENAME: &str = "configure_adcirc.json";
/// NEMS file; its presence switches generation to coupled mode.
pub const NEMS_FILENAME: &str = "configure_nems.json";

// ============================================================================
// SECTION: JSON Helpers
// ============================================================================

/// Reads and parses one JSON configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] naming the file when parsing fails.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|err| ConfigError::Parse(format!("{}: {err}", path.display())))
}

/// Writes one JSON configuration file with a trailing newline.
///
/// # Errors
///
/// Returns [`ConfigError::Driver`] wrapping `FileExists` when `overwrite` is
/// false and the file exists.
pub fn write_json<T: Serialize>(path: &Path, value: &T, overwrite: bool) -> ConfigResult<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
    text.push('\n');
    write_text(path, &text, overwrite)?;
    Ok(())
}

/// Applies `key → value` overrides to `value` through its JSON form.
///
/// Keys that are not fields of `T` are returned for the caller to handle.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when an override has the wrong type.
pub fn apply_overrides<T: Serialize + DeserializeOwned>(
    value: &T,
    section: &str,
    overrides: &BTreeMap<String, Value>,
) -> ConfigResult<(T, BTreeMap<String, Value>)> {
    let mut document = serde_json::to_value(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let mut unknown = BTreeMap::new();
    let Value::Object(fields) = &mut document else {
        return Err(ConfigError::Invalid(format!("section \"{section}\" is not an object")));
    };
    for (key, override_value) in overrides {
        match fields.get_mut(key) {
            Some(field) => *field = override_value.clone(),
            None => {
                unknown.insert(key.clone(), override_value.clone());
            }
        }
    }
    let updated = serde_json::from_value(document)
        .map_err(|err| ConfigError::Invalid(format!("perturbation of \"{section}\": {err}")))?;
    Ok((updated, unknown))
}

// ============================================================================
// SECTION: Model Driver
// ============================================================================

/// Perturbation of one run: section → key → value.
pub type Perturbation = BTreeMap<String, BTreeMap<String, Value>>;

/// `configure_modeldriver.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDriverJson {
    /// Target platform.
    pub platform: Platform,
    /// Named run variants.
    #[serde(default)]
    pub perturbations: BTreeMap<String, Perturbation>,
}

// ============================================================================
// SECTION: SLURM
// ============================================================================

/// `configure_slurm.json`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlurmJson {
    /// Account charged.
    #[serde(default)]
    pub account: Option<String>,
    /// Task count override for run jobs.
    #[serde(default)]
    pub tasks: Option<u32>,
    /// Partition.
    #[serde(default)]
    pub partition: Option<String>,
    /// Wall-clock limit.
    #[serde(default, with = "serde_duration_option")]
    pub job_duration: Option<Duration>,
    /// Working directory.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Job name prefix.
    #[serde(default)]
    pub run_name: Option<String>,
    /// Notification events.
    #[serde(default)]
    pub email_type: Option<SlurmEmailType>,
    /// Notification address.
    #[serde(default)]
    pub email_address: Option<String>,
    /// Scheduler log file override.
    #[serde(default)]
    pub log_filename: Option<String>,
    /// Environment modules.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Directory prepended to `PATH`.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Commands appended to every job.
    #[serde(default)]
    pub extra_commands: Vec<String>,
    /// Launcher override.
    #[serde(default)]
    pub launcher: Option<String>,
    /// Node count override.
    #[serde(default)]
    pub nodes: Option<u32>,
}

impl SlurmJson {
    /// Notification events, defaulting to `ALL` when only an address is set.
    #[must_use]
    pub fn effective_email_type(&self) -> Option<SlurmEmailType> {
        match (self.email_type, self.email_address.as_deref()) {
            (Some(kind), _) => Some(kind),
            (None, Some(address)) if !address.trim().is_empty() => Some(SlurmEmailType::All),
            _ => None,
        }
    }

    /// Job template for `platform`, sourcing `source_filename` first.
    #[must_use]
    pub fn job_template(&self, platform: Platform, source_filename: Option<PathBuf>) -> JobTemplate {
        let mut template = JobTemplate::new(platform);
        template.account.clone_from(&self.account);
        template.duration = self.job_duration;
        template.partition.clone_from(&self.partition);
        template.nodes = self.nodes;
        template.email_type = self.effective_email_type();
        template.email_address.clone_from(&self.email_address);
        template.run_directory.clone_from(&self.run_directory);
        template.modules.clone_from(&self.modules);
        template.path_prefix.clone_from(&self.path_prefix);
        template.source_filename = source_filename;
        template.launcher.clone_from(&self.launcher);
        template.extra_commands.clone_from(&self.extra_commands);
        template
    }
}

// ============================================================================
// SECTION: ADCIRC
// ============================================================================

/// Default ADCIRC processor count.
pub const DEFAULT_ADCIRC_PROCESSORS: u32 = 11;

/// Default for boolean fields that start enabled.
const fn enabled() -> bool {
    true
}

/// Default ADCIRC processor count for serde.
const fn default_processors() -> u32 {
    DEFAULT_ADCIRC_PROCESSORS
}

/// `configure_adcirc.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcircJson {
    /// ADCIRC (or PADCIRC) executable.
    pub adcirc_executable_path: PathBuf,
    /// ADCPREP executable.
    pub adcprep_executable_path: PathBuf,
    /// ASWIP executable for best track preprocessing.
    #[serde(default)]
    pub aswip_executable_path: Option<PathBuf>,
    /// Start of the modeled window.
    #[serde(with = "serde_datetime")]
    pub modeled_start_time: PrimitiveDateTime,
    /// End of the modeled window.
    #[serde(with = "serde_datetime")]
    pub modeled_end_time: PrimitiveDateTime,
    /// Model timestep.
    #[serde(with = "serde_duration")]
    pub modeled_timestep: Duration,
    /// Nodal attributes file.
    #[serde(default)]
    pub fort_13_path: Option<PathBuf>,
    /// Mesh file.
    pub fort_14_path: PathBuf,
    /// Write global elevation and velocity output.
    #[serde(default = "enabled")]
    pub write_surface_output: bool,
    /// Write station output.
    #[serde(default)]
    pub write_station_output: bool,
    /// Link the mesh files instead of rewriting them.
    #[serde(default)]
    pub use_original_mesh: bool,
    /// Stations file.
    #[serde(default)]
    pub stations_file_path: Option<PathBuf>,
    /// Tidal spinup length; enables the spinup phase.
    #[serde(default, with = "serde_duration_option")]
    pub tidal_spinup_duration: Option<Duration>,
    /// Spinup timestep; the modeled timestep when unset.
    #[serde(default, with = "serde_duration_option")]
    pub tidal_spinup_timestep: Option<Duration>,
    /// GWCE solver.
    #[serde(default)]
    pub gwce_solution_scheme: GwceScheme,
    /// Smagorinsky lateral viscosity.
    #[serde(default = "enabled")]
    pub use_smagorinsky: bool,
    /// File sourced by jobs before running.
    #[serde(default)]
    pub source_filename: Option<PathBuf>,
    /// ADCIRC processor count.
    #[serde(default = "default_processors")]
    pub processors: u32,
    /// Uniform nodal attribute values set by perturbations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodal_attributes: BTreeMap<String, f64>,
}

impl AdcircJson {
    /// Spinup timestep.
    #[must_use]
    pub fn spinup_timestep(&self) -> Duration {
        self.tidal_spinup_timestep.unwrap_or(self.modeled_timestep)
    }
}

// ============================================================================
// SECTION: NEMS
// ============================================================================

/// `configure_nems.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NemsJson {
    /// NEMS executable.
    pub executable_path: PathBuf,
    /// Start of the coupled window.
    #[serde(with = "serde_datetime")]
    pub modeled_start_time: PrimitiveDateTime,
    /// End of the coupled window.
    #[serde(with = "serde_datetime")]
    pub modeled_end_time: PrimitiveDateTime,
    /// Coupling interval.
    #[serde(with = "serde_duration", alias = "modeled_timestep")]
    pub interval: Duration,
    /// Connections; empty means every data component feeds the ocean.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Run sequence; empty means connections then components.
    #[serde(default)]
    pub sequence: Vec<String>,
}

// ============================================================================
// SECTION: Forcings
// ============================================================================

/// One hour, the default forcing interval.
const fn one_hour() -> Duration {
    Duration::hours(1)
}

/// One processor, the default for data components.
const fn one_processor() -> u32 {
    1
}

/// `configure_tidalforcing.json`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TidalForcingJson {
    /// Boundary database.
    #[serde(default)]
    pub tidal_source: TidalSource,
    /// Constituents forced.
    #[serde(default)]
    pub constituents: ConstituentSelection,
    /// Database location.
    #[serde(default)]
    pub resource: Option<PathBuf>,
}

/// Default atmospheric mesh `NWS`.
const fn atmesh_nws() -> i32 {
    17
}

/// `configure_atmesh.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtmeshForcingJson {
    /// Atmospheric mesh file.
    #[serde(default)]
    pub resource: Option<PathBuf>,
    /// ADCIRC `NWS`.
    #[serde(default = "atmesh_nws")]
    pub nws: i32,
    /// Input interval.
    #[serde(default = "one_hour", with = "serde_duration", alias = "modeled_timestep")]
    pub interval: Duration,
    /// NEMS component processors.
    #[serde(default = "one_processor")]
    pub processors: u32,
}

impl Default for AtmeshForcingJson {
    fn default() -> Self {
        Self {
            resource: None,
            nws: atmesh_nws(),
            interval: one_hour(),
            processors: one_processor(),
        }
    }
}

/// Default wave radiation stress `NRS`.
const fn ww3data_nrs() -> i32 {
    5
}

/// `configure_ww3data.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ww3DataForcingJson {
    /// WaveWatch III output file.
    #[serde(default)]
    pub resource: Option<PathBuf>,
    /// ADCIRC `NRS`.
    #[serde(default = "ww3data_nrs")]
    pub nrs: i32,
    /// Input interval.
    #[serde(default = "one_hour", with = "serde_duration", alias = "modeled_timestep")]
    pub interval: Duration,
    /// NEMS component processors.
    #[serde(default = "one_processor")]
    pub processors: u32,
}

impl Default for Ww3DataForcingJson {
    fn default() -> Self {
        Self {
            resource: None,
            nrs: ww3data_nrs(),
            interval: one_hour(),
            processors: one_processor(),
        }
    }
}

/// Default best track `NWS`.
const fn besttrack_nws() -> i32 {
    20
}

/// `configure_besttrack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTrackForcingJson {
    /// ATCF storm identifier (for example `al062018`).
    #[serde(default)]
    pub storm_id: Option<String>,
    /// Local ATCF track file written as `fort.22`.
    #[serde(default)]
    pub fort22_filename: Option<PathBuf>,
    /// ADCIRC `NWS`.
    #[serde(default = "besttrack_nws")]
    pub nws: i32,
    /// First track record used.
    #[serde(default, with = "serde_datetime_option")]
    pub start_date: Option<PrimitiveDateTime>,
    /// Last track record used.
    #[serde(default, with = "serde_datetime_option")]
    pub end_date: Option<PrimitiveDateTime>,
}

impl Default for BestTrackForcingJson {
    fn default() -> Self {
        Self {
            storm_id: None,
            fort22_filename: None,
            nws: besttrack_nws(),
            start_date: None,
            end_date: None,
        }
    }
}

impl BestTrackForcingJson {
    /// Creates a best track forcing for `storm_id`.
    #[must_use]
    pub fn for_storm(storm_id: impl Into<String>) -> Self {
        Self {
            storm_id: Some(storm_id.into()),
            ..Self::default()
        }
    }
}

/// Default OWI `NWS`.
const fn owi_nws() -> i32 {
    12
}

/// `configure_owi.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwiForcingJson {
    /// Directory holding `fort.22*` files.
    #[serde(default)]
    pub resource: Option<PathBuf>,
    /// ADCIRC `NWS`.
    #[serde(default = "owi_nws")]
    pub nws: i32,
    /// Input interval.
    #[serde(default = "one_hour", with = "serde_duration", alias = "modeled_timestep")]
    pub interval: Duration,
}

impl Default for OwiForcingJson {
    fn default() -> Self {
        Self {
            resource: None,
            nws: owi_nws(),
            interval: one_hour(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
