// crates/coupled-driver-cli/src/initialize.rs
// ============================================================================
// Module: Initialize Command
// Description: Builds a configuration directory from command-line options.
// Purpose: Combine flags, site settings and platform defaults into JSON files.
// Dependencies: coupled-driver-config, coupled-driver-core, time, tracing
// ============================================================================

//! ## Overview
//! [`build_configuration`] resolves every option against the settings file
//! and platform profile, in that order of precedence after explicit flags.
//! [`write_configuration`] writes the result, relative to the output
//! directory unless absolute paths are requested.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_config::AdcircJson;
use coupled_driver_config::AtmeshForcingJson;
use coupled_driver_config::BestTrackForcingJson;
use coupled_driver_config::ConfigError;
use coupled_driver_config::ConfigResult;
use coupled_driver_config::DEFAULT_ADCIRC_PROCESSORS;
use coupled_driver_config::DriverSettings;
use coupled_driver_config::ModelDriverJson;
use coupled_driver_config::NemsJson;
use coupled_driver_config::OwiForcingJson;
use coupled_driver_config::RunConfiguration;
use coupled_driver_config::SlurmJson;
use coupled_driver_config::TidalForcingJson;
use coupled_driver_config::Ww3DataForcingJson;
use coupled_driver_core::ConstituentSelection;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::Platform;
use coupled_driver_core::TidalSource;
use coupled_driver_core::adcirc::FORT13;
use coupled_driver_core::adcirc::FORT14;
use coupled_driver_core::adcirc::GwceScheme;
use time::Duration;
use time::PrimitiveDateTime;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Job wall-clock limit when neither a flag nor the settings give one.
pub const DEFAULT_JOB_DURATION: Duration = Duration::hours(6);

// ============================================================================
// SECTION: Options
// ============================================================================

/// Resolved `initialize` options.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeOptions {
    /// Target platform; falls back to the settings default.
    pub platform: Option<Platform>,
    /// Directory holding `fort.14` and optionally `fort.13`.
    pub mesh_directory: PathBuf,
    /// Start of the modeled window.
    pub modeled_start_time: PrimitiveDateTime,
    /// Length of the modeled window.
    pub modeled_duration: Duration,
    /// Model timestep.
    pub modeled_timestep: Duration,
    /// NEMS coupling interval; enables NEMS.
    pub nems_interval: Option<Duration>,
    /// Module file sourced by jobs.
    pub modulefile: Option<PathBuf>,
    /// Requested forcings.
    pub forcings: Vec<ForcingKind>,
    /// Tidal spinup length.
    pub tidal_spinup_duration: Option<Duration>,
    /// Tidal database.
    pub tidal_source: Option<TidalSource>,
    /// Tidal constituents.
    pub tidal_constituents: Option<ConstituentSelection>,
    /// Tidal database location.
    pub tidal_path: Option<PathBuf>,
    /// Atmospheric mesh file.
    pub atmesh_path: Option<PathBuf>,
    /// WaveWatch III file.
    pub ww3data_path: Option<PathBuf>,
    /// ATCF storm identifier.
    pub besttrack_storm_id: Option<String>,
    /// Local ATCF track file.
    pub besttrack_path: Option<PathBuf>,
    /// First best track record.
    pub besttrack_start_date: Option<PrimitiveDateTime>,
    /// Last best track record.
    pub besttrack_end_date: Option<PrimitiveDateTime>,
    /// OWI directory.
    pub owi_path: Option<PathBuf>,
    /// ADCIRC executable, or the NEMS executable when coupled.
    pub adcirc_executable: PathBuf,
    /// ADCPREP executable.
    pub adcprep_executable: PathBuf,
    /// ASWIP executable.
    pub aswip_executable: Option<PathBuf>,
    /// ADCIRC processor count.
    pub adcirc_processors: Option<u32>,
    /// Job wall-clock limit.
    pub job_duration: Option<Duration>,
}

// ============================================================================
// SECTION: Building
// ============================================================================

/// Builds the configuration described by `options`.
///
/// Paths are resolved against `working_directory`. Tidal forcing is added
/// when a spinup or tidal source is requested without listing `tidal`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when no platform is known or the result
/// fails validation.
pub fn build_configuration(
    options: &InitializeOptions,
    settings: &DriverSettings,
    working_directory: &Path,
) -> ConfigResult<RunConfiguration> {
    let platform = options.platform.or(settings.defaults.platform).ok_or_else(|| {
        ConfigError::Invalid("a platform is required (--platform or defaults.platform)".to_string())
    })?;
    let overrides = settings.platform(platform);
    let start = options.modeled_start_time;
    let end = start + options.modeled_duration;

    let fort13 = options.mesh_directory.join(FORT13);
    let source_filename = options
        .modulefile
        .clone()
        .or_else(|| overrides.and_then(|entry| entry.modulefile.clone()))
        .or_else(|| platform.profile().source_filename.map(PathBuf::from));
    let adcirc = AdcircJson {
        adcirc_executable_path: options.adcirc_executable.clone(),
        adcprep_executable_path: options.adcprep_executable.clone(),
        aswip_executable_path: options.aswip_executable.clone(),
        modeled_start_time: start,
        modeled_end_time: end,
        modeled_timestep: options.modeled_timestep,
        fort_13_path: fort13.is_file().then_some(fort13),
        fort_14_path: options.mesh_directory.join(FORT14),
        write_surface_output: true,
        write_station_output: false,
        use_original_mesh: false,
        stations_file_path: None,
        tidal_spinup_duration: options.tidal_spinup_duration,
        tidal_spinup_timestep: None,
        gwce_solution_scheme: GwceScheme::default(),
        use_smagorinsky: true,
        source_filename,
        processors: options
            .adcirc_processors
            .or(settings.defaults.adcirc_processors)
            .unwrap_or(DEFAULT_ADCIRC_PROCESSORS),
        nodal_attributes: BTreeMap::new(),
    };
    let slurm = SlurmJson {
        account: overrides.and_then(|entry| entry.account.clone()),
        partition: overrides.and_then(|entry| entry.partition.clone()),
        job_duration: Some(options.job_duration.or(settings.defaults.job_duration).unwrap_or(DEFAULT_JOB_DURATION)),
        email_type: settings.defaults.email_type,
        email_address: settings.defaults.email_address.clone(),
        ..SlurmJson::default()
    };
    let modeldriver = ModelDriverJson {
        platform,
        perturbations: BTreeMap::new(),
    };

    let mut configuration = RunConfiguration::new(modeldriver, slurm, adcirc);
    if let Some(interval) = options.nems_interval {
        configuration.nems = Some(NemsJson {
            executable_path: options.adcirc_executable.clone(),
            modeled_start_time: start,
            modeled_end_time: end,
            interval,
            connections: Vec::new(),
            sequence: Vec::new(),
        });
    }
    for kind in requested_forcings(options) {
        add_forcing(&mut configuration, options, kind);
    }

    let configuration = configuration.absolute(working_directory);
    configuration.validate()?;
    debug!(platform = %platform, forcings = ?configuration.forcings(), "built configuration");
    Ok(configuration)
}

/// Requested forcings with tidal forcing implied by tidal options.
fn requested_forcings(options: &InitializeOptions) -> Vec<ForcingKind> {
    let mut forcings = options.forcings.clone();
    let tidal_requested = options.tidal_spinup_duration.is_some() || options.tidal_source.is_some();
    if tidal_requested && !forcings.contains(&ForcingKind::Tidal) {
        forcings.insert(0, ForcingKind::Tidal);
    }
    forcings
}

/// Adds the configuration file of one forcing.
fn add_forcing(configuration: &mut RunConfiguration, options: &InitializeOptions, kind: ForcingKind) {
    let interval = options.nems_interval;
    match kind {
        ForcingKind::Tidal => {
            configuration.tidal = Some(TidalForcingJson {
                tidal_source: options.tidal_source.unwrap_or_default(),
                constituents: options.tidal_constituents.clone().unwrap_or_default(),
                resource: options.tidal_path.clone(),
            });
        }
        ForcingKind::Atmesh => {
            let mut forcing = AtmeshForcingJson {
                resource: options.atmesh_path.clone(),
                ..AtmeshForcingJson::default()
            };
            if let Some(interval) = interval {
                forcing.interval = interval;
            }
            configuration.atmesh = Some(forcing);
        }
        ForcingKind::BestTrack => {
            configuration.besttrack = Some(BestTrackForcingJson {
                storm_id: options.besttrack_storm_id.clone(),
                fort22_filename: options.besttrack_path.clone(),
                start_date: options.besttrack_start_date,
                end_date: options.besttrack_end_date,
                ..BestTrackForcingJson::default()
            });
        }
        ForcingKind::Owi => {
            let mut forcing = OwiForcingJson {
                resource: options.owi_path.clone(),
                ..OwiForcingJson::default()
            };
            if let Some(interval) = interval {
                forcing.interval = interval;
            }
            configuration.owi = Some(forcing);
        }
        ForcingKind::Ww3Data => {
            let mut forcing = Ww3DataForcingJson {
                resource: options.ww3data_path.clone(),
                ..Ww3DataForcingJson::default()
            };
            if let Some(interval) = interval {
                forcing.interval = interval;
            }
            configuration.ww3data = Some(forcing);
        }
    }
}

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Writes `configuration` into `output_directory`.
///
/// Unless `absolute_paths` is set, paths are written relative to the output
/// directory so the configuration can be moved with its inputs.
///
/// # Errors
///
/// Returns `FileExists` (wrapped) when a file exists and `overwrite` is
/// false; nothing is written in that case.
pub fn write_configuration(
    configuration: &RunConfiguration,
    output_directory: &Path,
    absolute_paths: bool,
    overwrite: bool,
) -> ConfigResult<Vec<PathBuf>> {
    let document =
        if absolute_paths { configuration.clone() } else { configuration.relative_to(output_directory) };
    let components: Vec<String> = document.forcings().iter().map(ToString::to_string).collect();
    info!(
        directory = %output_directory.display(),
        nems = document.nems.is_some(),
        forcings = %components.join("+"),
        "writing configuration"
    );
    document.write_directory(output_directory, overwrite)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
