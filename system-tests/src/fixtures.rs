// system-tests/src/fixtures.rs
// ============================================================================
// Module: Fixtures
// Description: Sample mesh and run configurations for reference trees.
// Purpose: Build the inputs whose generated output is stored under
//          `tests/data/reference`.
// Dependencies: coupled-driver-config, coupled-driver-core, time
// ============================================================================

//! ## Overview
//! The sample mesh is a four-node patch near Shinnecock Inlet with two deep
//! and two shallow nodes, so the generated tau0 attribute has both values.
//! The sample configuration targets Hera with a fixed job duration so job
//! headers do not depend on site settings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_config::AdcircJson;
use coupled_driver_config::ModelDriverJson;
use coupled_driver_config::RunConfiguration;
use coupled_driver_config::SlurmJson;
use coupled_driver_core::Platform;
use coupled_driver_core::adcirc::GwceScheme;
use time::Date;
use time::Duration;
use time::Month;
use time::PrimitiveDateTime;
use time::Time;

// ============================================================================
// SECTION: Mesh
// ============================================================================

/// Four nodes, two elements, one open boundary header.
pub const SAMPLE_MESH: &str = "shinnecock sample\n2 4\n1 -72.50 40.80 3.0\n2 -72.40 40.80 15.0\n3 -72.40 \
                               40.90 25.0\n4 -72.50 40.90 2.0\n1 3 1 2 3\n2 3 1 3 4\n1 = NOPE\n2 = NETA\n";

/// Writes [`SAMPLE_MESH`] to `directory/fort.14` and returns the file path.
///
/// # Errors
///
/// Returns a description of the failed directory or file write.
pub fn write_sample_mesh(directory: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(directory).map_err(|err| format!("{}: {err}", directory.display()))?;
    let path = directory.join("fort.14");
    fs::write(&path, SAMPLE_MESH).map_err(|err| format!("{}: {err}", path.display()))?;
    Ok(path)
}

// ============================================================================
// SECTION: Configurations
// ============================================================================

/// Midnight on `day` August 2008.
fn august_2008(day: u8) -> Result<PrimitiveDateTime, String> {
    let date = Date::from_calendar_date(2008, Month::August, day).map_err(|err| err.to_string())?;
    Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT))
}

/// One-day Hera run over `fort_14`, optionally preceded by a two-day tidal
/// spinup.
///
/// # Errors
///
/// Returns a description of an invalid calendar date.
pub fn sample_configuration(fort_14: &Path, spinup: bool) -> Result<RunConfiguration, String> {
    let adcirc = AdcircJson {
        adcirc_executable_path: PathBuf::from("padcirc"),
        adcprep_executable_path: PathBuf::from("adcprep"),
        aswip_executable_path: None,
        modeled_start_time: august_2008(23)?,
        modeled_end_time: august_2008(24)?,
        modeled_timestep: Duration::seconds(6),
        fort_13_path: None,
        fort_14_path: fort_14.to_path_buf(),
        write_surface_output: true,
        write_station_output: false,
        use_original_mesh: false,
        stations_file_path: None,
        tidal_spinup_duration: spinup.then(|| Duration::days(2)),
        tidal_spinup_timestep: None,
        gwce_solution_scheme: GwceScheme::Explicit,
        use_smagorinsky: true,
        source_filename: None,
        processors: 4,
        nodal_attributes: BTreeMap::new(),
    };
    let modeldriver = ModelDriverJson {
        platform: Platform::Hera,
        perturbations: BTreeMap::new(),
    };
    let slurm = SlurmJson {
        job_duration: Some(Duration::hours(6)),
        ..SlurmJson::default()
    };
    Ok(RunConfiguration::new(modeldriver, slurm, adcirc))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
