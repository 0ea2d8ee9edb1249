// crates/coupled-driver-config/tests/configuration_directory.rs
// ============================================================================
// Module: Configuration Directory Tests
// Description: Read, write, relocate and perturb configuration directories.
// Purpose: Exercise the JSON directory format end to end on disk.
// ============================================================================

//! ## Overview
//! Writes configuration directories to scratch space, reads them back and
//! checks path relocation and perturbation expansion.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_config::AdcircJson;
use coupled_driver_config::AtmeshForcingJson;
use coupled_driver_config::ConfigError;
use coupled_driver_config::ModelDriverJson;
use coupled_driver_config::Perturbation;
use coupled_driver_config::RunConfiguration;
use coupled_driver_config::SlurmJson;
use coupled_driver_config::TidalForcingJson;
use coupled_driver_config::UNPERTURBED;
use coupled_driver_core::DriverError;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::Platform;
use coupled_driver_core::adcirc::GwceScheme;
use serde_json::json;
use time::Duration;
use time::macros::datetime;

type TestResult = Result<(), String>;

fn adcirc(mesh_directory: &Path) -> AdcircJson {
    AdcircJson {
        adcirc_executable_path: PathBuf::from("adcirc"),
        adcprep_executable_path: PathBuf::from("adcprep"),
        aswip_executable_path: None,
        modeled_start_time: datetime!(2008-08-23 00:00:00),
        modeled_end_time: datetime!(2008-09-06 12:00:00),
        modeled_timestep: Duration::seconds(6),
        fort_13_path: Some(mesh_directory.join("fort.13")),
        fort_14_path: mesh_directory.join("fort.14"),
        write_surface_output: true,
        write_station_output: false,
        use_original_mesh: false,
        stations_file_path: None,
        tidal_spinup_duration: Some(Duration::days(12) + Duration::hours(12)),
        tidal_spinup_timestep: None,
        gwce_solution_scheme: GwceScheme::Explicit,
        use_smagorinsky: true,
        source_filename: None,
        processors: 11,
        nodal_attributes: BTreeMap::new(),
    }
}

fn configuration(mesh_directory: &Path) -> RunConfiguration {
    let modeldriver = ModelDriverJson {
        platform: Platform::Hera,
        perturbations: BTreeMap::new(),
    };
    let mut configuration = RunConfiguration::new(modeldriver, SlurmJson::default(), adcirc(mesh_directory));
    configuration.tidal = Some(TidalForcingJson::default());
    configuration
}

#[test]
fn directory_round_trips() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let original = configuration(&dir.path().join("mesh"));
    let written = original.write_directory(dir.path(), false).map_err(|err| err.to_string())?;
    assert_eq!(written.len(), 4);
    assert!(dir.path().join("configure_tidalforcing.json").is_file());

    let read = RunConfiguration::read_directory(dir.path()).map_err(|err| err.to_string())?;
    assert_eq!(read, original);
    assert_eq!(read.forcings(), vec![ForcingKind::Tidal]);
    Ok(())
}

#[test]
fn write_refuses_existing_files() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let original = configuration(&dir.path().join("mesh"));
    original.write_directory(dir.path(), false).map_err(|err| err.to_string())?;
    let before = fs::read_to_string(dir.path().join("configure_adcirc.json")).map_err(|err| err.to_string())?;

    let mut changed = original.clone();
    changed.adcirc.processors = 40;
    let error = changed.write_directory(dir.path(), false).unwrap_err();
    assert!(matches!(error, ConfigError::Driver(DriverError::FileExists(_))), "{error}");
    let after = fs::read_to_string(dir.path().join("configure_adcirc.json")).map_err(|err| err.to_string())?;
    assert_eq!(before, after);

    changed.write_directory(dir.path(), true).map_err(|err| err.to_string())?;
    let read = RunConfiguration::read_directory(dir.path()).map_err(|err| err.to_string())?;
    assert_eq!(read.adcirc.processors, 40);
    Ok(())
}

#[test]
fn missing_adcirc_file_is_missing_input() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    configuration(dir.path()).write_directory(dir.path(), false).map_err(|err| err.to_string())?;
    fs::remove_file(dir.path().join("configure_adcirc.json")).map_err(|err| err.to_string())?;
    let error = RunConfiguration::read_directory(dir.path()).unwrap_err();
    assert!(matches!(error, ConfigError::Driver(DriverError::MissingInput { .. })), "{error}");
    Ok(())
}

#[test]
fn relative_paths_resolve_against_directory() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let config_dir = dir.path().join("config");
    let original = configuration(&dir.path().join("mesh"));
    let relative = original.relative_to(&config_dir);
    assert_eq!(relative.adcirc.fort_14_path, PathBuf::from("../mesh/fort.14"));
    assert_eq!(relative.adcirc.adcirc_executable_path, PathBuf::from("adcirc"));

    relative.write_directory(&config_dir, false).map_err(|err| err.to_string())?;
    let text = fs::read_to_string(config_dir.join("configure_adcirc.json")).map_err(|err| err.to_string())?;
    assert!(text.contains("\"../mesh/fort.14\""));
    let read = RunConfiguration::read_directory(&config_dir).map_err(|err| err.to_string())?;
    assert_eq!(read.adcirc.fort_14_path, dir.path().join("mesh").join("fort.14"));
    Ok(())
}

#[test]
fn no_perturbations_yield_single_unperturbed_run() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let runs = configuration(dir.path()).perturb().map_err(|err| err.to_string())?;
    assert_eq!(runs.keys().cloned().collect::<Vec<_>>(), vec![UNPERTURBED.to_string()]);
    Ok(())
}

#[test]
fn perturbations_override_fields_and_attributes() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut base = configuration(dir.path());
    let mut low: Perturbation = BTreeMap::new();
    low.insert(
        "adcirc".to_string(),
        BTreeMap::from([
            ("mannings_n_at_sea_floor".to_string(), json!(0.02)),
            ("use_smagorinsky".to_string(), json!(false)),
        ]),
    );
    let mut high: Perturbation = BTreeMap::new();
    high.insert("tidalforcing".to_string(), BTreeMap::from([("tidal_source".to_string(), json!("HAMTIDE"))]));
    base.modeldriver.perturbations.insert("low_friction".to_string(), low);
    base.modeldriver.perturbations.insert("hamtide".to_string(), high);

    let runs = base.perturb().map_err(|err| err.to_string())?;
    assert_eq!(runs.keys().cloned().collect::<Vec<_>>(), vec!["hamtide".to_string(), "low_friction".to_string()]);
    let low = &runs["low_friction"];
    assert!(!low.adcirc.use_smagorinsky);
    assert_eq!(low.adcirc.nodal_attributes.get("mannings_n_at_sea_floor"), Some(&0.02));
    assert!(low.modeldriver.perturbations.is_empty());
    let hamtide = runs["hamtide"].tidal.as_ref().ok_or("missing tidal forcing")?;
    assert_eq!(hamtide.tidal_source.to_string(), "HAMTIDE");
    Ok(())
}

#[test]
fn unknown_perturbation_section_fails() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut base = configuration(dir.path());
    let mut run: Perturbation = BTreeMap::new();
    run.insert("ocean".to_string(), BTreeMap::from([("depth".to_string(), json!(1))]));
    base.modeldriver.perturbations.insert("bad".to_string(), run);
    let error = base.perturb().unwrap_err().to_string();
    assert!(error.contains("unknown perturbation section \"ocean\""), "{error}");

    let mut base = configuration(dir.path());
    let mut run: Perturbation = BTreeMap::new();
    run.insert("slurm".to_string(), BTreeMap::from([("queue".to_string(), json!("debug"))]));
    base.modeldriver.perturbations.insert("bad".to_string(), run);
    let error = base.perturb().unwrap_err().to_string();
    assert!(error.contains("unknown key \"queue\""), "{error}");
    Ok(())
}

#[test]
fn data_components_require_nems() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut base = configuration(dir.path());
    base.atmesh = Some(AtmeshForcingJson::default());
    let error = base.validate().unwrap_err().to_string();
    assert!(error.contains("atmesh forcing requires NEMS coupling"), "{error}");
    Ok(())
}
