// crates/coupled-driver-generate/tests/generate_tree.rs
// ============================================================================
// Module: Generation Tests
// Description: Expand configuration directories into run trees on disk.
// Purpose: Check layout, job naming, overwrite refusal and forcing inputs.
// ============================================================================

//! ## Overview
//! Builds configuration directories in scratch space, generates run trees
//! from them and inspects the files written.
//! Invariants:
//! - Generation never writes outside the output directory.
//! - Without overwrite, existing output is left untouched.

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
use coupled_driver_config::BestTrackForcingJson;
use coupled_driver_config::ModelDriverJson;
use coupled_driver_config::NemsJson;
use coupled_driver_config::Perturbation;
use coupled_driver_config::RunConfiguration;
use coupled_driver_config::SlurmJson;
use coupled_driver_config::TidalForcingJson;
use coupled_driver_config::Ww3DataForcingJson;
use coupled_driver_core::DriverError;
use coupled_driver_core::Platform;
use coupled_driver_core::adcirc::GwceScheme;
use coupled_driver_core::adcirc::NodalAttributes;
use coupled_driver_core::adcirc::attributes::TAU0_ATTRIBUTE;
use coupled_driver_generate::GenerateError;
use coupled_driver_generate::generate_adcirc_configuration;
use serde_json::json;
use time::Duration;
use time::macros::datetime;

type TestResult = Result<(), String>;

const MESH: &str = "shinnecock sample\n2 4\n1 -72.50 40.80 3.0\n2 -72.40 40.80 15.0\n3 -72.40 \
                    40.90 25.0\n4 -72.50 40.90 2.0\n1 3 1 2 3\n2 3 1 3 4\n1 = NOPE\n2 = NETA\n";

const TRACK: &str = "AL, 06, 2008082300,   , BEST,   0, 214N,  725W,  45, 1000, TS\n";

/// Writes the sample mesh and returns its directory.
fn mesh_directory(root: &Path) -> Result<PathBuf, String> {
    let directory = root.join("mesh");
    fs::create_dir_all(&directory).map_err(|err| err.to_string())?;
    fs::write(directory.join("fort.14"), MESH).map_err(|err| err.to_string())?;
    Ok(directory)
}

fn configuration(mesh: &Path, spinup: bool) -> RunConfiguration {
    let adcirc = AdcircJson {
        adcirc_executable_path: PathBuf::from("padcirc"),
        adcprep_executable_path: PathBuf::from("adcprep"),
        aswip_executable_path: None,
        modeled_start_time: datetime!(2008-08-23 00:00:00),
        modeled_end_time: datetime!(2008-08-24 00:00:00),
        modeled_timestep: Duration::seconds(6),
        fort_13_path: None,
        fort_14_path: mesh.join("fort.14"),
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
    let mut configuration = RunConfiguration::new(modeldriver, SlurmJson::default(), adcirc);
    configuration.tidal = Some(TidalForcingJson::default());
    configuration
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("{}: {err}", path.display()))
}

#[test]
fn spinup_and_runs_are_written() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let config_dir = dir.path().join("config");
    let mut configuration = configuration(&mesh, true);
    let mut rough: Perturbation = BTreeMap::new();
    rough.insert("adcirc".to_string(), BTreeMap::from([("mannings_n_at_sea_floor".to_string(), json!(0.05))]));
    configuration.modeldriver.perturbations.insert("rough".to_string(), rough);
    configuration.modeldriver.perturbations.insert("smooth".to_string(), Perturbation::new());
    configuration.write_directory(&config_dir, false).map_err(|err| err.to_string())?;

    let output = dir.path().join("output");
    let tree = generate_adcirc_configuration(&config_dir, &output, true, false).map_err(|err| err.to_string())?;
    assert_eq!(tree.runs, vec!["rough".to_string(), "smooth".to_string()]);
    assert_eq!(tree.spinup.as_deref(), Some(output.join("spinup").as_path()));

    for name in ["fort.14", "fort.13", "cleanup.sh", "run_hera.sh"] {
        assert!(output.join(name).is_file(), "missing {name}");
    }
    let root_attributes = NodalAttributes::read(&output.join("fort.13")).map_err(|err| err.to_string())?;
    assert!(root_attributes.get(TAU0_ATTRIBUTE).is_some());

    let spinup = output.join("spinup");
    assert!(read(&spinup.join("setup.job"))?.contains("#SBATCH -J ADCIRC_SETUP_SPINUP"));
    let spinup_job = read(&spinup.join("adcirc.job"))?;
    assert!(spinup_job.contains("#SBATCH -J ADCIRC_COLDSTART_SPINUP"));
    assert!(spinup_job.contains("#SBATCH --error=ADCIRC_COLDSTART_SPINUP.err.log"));
    assert!(spinup_job.contains("srun padcirc"));
    let spinup_fort15 = read(&spinup.join("fort.15"))?;
    assert!(spinup_fort15.contains(&format!("{:<40} ! IHOT", 0)));
    assert!(spinup_fort15.contains(&format!("{:<40} ! NRAMP", 1)));
    assert!(spinup.join("fort.14").is_symlink());

    let rough = tree.run_directory("rough");
    let run_job = read(&rough.join("adcirc.job"))?;
    assert!(run_job.contains("#SBATCH -J ADCIRC_HOTSTART_rough"));
    assert!(read(&rough.join("setup.job"))?.contains("srun adcprep --np 4 --partmesh"));
    assert!(read(&rough.join("fort.15"))?.contains(&format!("{:<40} ! IHOT", 567)));
    assert!(rough.join("fort.67.nc").is_symlink());
    assert!(rough.join("fort.68.nc").is_symlink());
    let attributes = NodalAttributes::read(&rough.join("fort.13")).map_err(|err| err.to_string())?;
    let mannings = attributes.get("mannings_n_at_sea_floor").unwrap();
    assert_eq!(mannings.defaults, vec![0.05]);
    let smooth = NodalAttributes::read(&tree.run_directory("smooth").join("fort.13")).map_err(|err| err.to_string())?;
    assert!(smooth.get("mannings_n_at_sea_floor").is_none());

    let run_script = read(&output.join("run_hera.sh"))?;
    assert!(run_script.contains("sh ${DIRECTORY}/cleanup.sh"));
    assert!(run_script.contains("# run spinup"));
    Ok(())
}

#[test]
fn unperturbed_coldstart_without_spinup() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let config_dir = dir.path().join("config");
    configuration(&mesh, false).write_directory(&config_dir, false).map_err(|err| err.to_string())?;

    let output = dir.path().join("output");
    let tree = generate_adcirc_configuration(&config_dir, &output, false, false).map_err(|err| err.to_string())?;
    assert!(tree.spinup.is_none());
    assert!(!output.join("spinup").exists());

    let run = tree.run_directory("unperturbed");
    let fort15 = read(&run.join("fort.15"))?;
    assert!(fort15.contains(&format!("{:<40} ! IHOT", 0)));
    assert!(fort15.contains(&format!("{:<40} ! NRAMP", 0)));
    assert!(read(&run.join("adcirc.job"))?.contains("#SBATCH -J ADCIRC_COLDSTART_unperturbed"));
    assert!(!run.join("fort.67.nc").is_symlink());
    assert!(!read(&output.join("run_hera.sh"))?.contains("# run spinup"));
    Ok(())
}

#[test]
fn existing_output_is_not_overwritten() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let config_dir = dir.path().join("config");
    configuration(&mesh, true).write_directory(&config_dir, false).map_err(|err| err.to_string())?;
    let output = dir.path().join("output");
    generate_adcirc_configuration(&config_dir, &output, false, false).map_err(|err| err.to_string())?;

    let fort15 = output.join("runs").join("unperturbed").join("fort.15");
    fs::write(&fort15, "edited\n").map_err(|err| err.to_string())?;
    let error = generate_adcirc_configuration(&config_dir, &output, false, false).unwrap_err();
    assert!(matches!(error.driver(), Some(DriverError::FileExists(_))), "unexpected error: {error}");
    assert_eq!(read(&fort15)?, "edited\n");

    generate_adcirc_configuration(&config_dir, &output, false, true).map_err(|err| err.to_string())?;
    assert_ne!(read(&fort15)?, "edited\n");
    Ok(())
}

#[test]
fn missing_mesh_fails_before_writing() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let config_dir = dir.path().join("config");
    configuration(&dir.path().join("absent"), false)
        .write_directory(&config_dir, false)
        .map_err(|err| err.to_string())?;
    let output = dir.path().join("output");
    let error = generate_adcirc_configuration(&config_dir, &output, false, false).unwrap_err();
    assert!(matches!(error.driver(), Some(DriverError::MissingInput { .. })), "unexpected error: {error}");
    assert!(!output.exists());
    Ok(())
}

#[test]
fn original_mesh_is_linked() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let config_dir = dir.path().join("config");
    let mut configuration = configuration(&mesh, false);
    configuration.adcirc.use_original_mesh = true;
    configuration.write_directory(&config_dir, false).map_err(|err| err.to_string())?;

    let output = dir.path().join("output");
    let tree = generate_adcirc_configuration(&config_dir, &output, true, false).map_err(|err| err.to_string())?;
    assert!(output.join("fort.14").is_symlink());
    assert!(!output.join("fort.13").exists());
    assert_eq!(read(&tree.run_directory("unperturbed").join("fort.14"))?, MESH);
    Ok(())
}

#[test]
fn regeneration_never_writes_through_linked_inputs() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let scratch = dir.path().join("scratch");
    let scratch_config = dir.path().join("scratch-config");
    configuration(&mesh, false).write_directory(&scratch_config, false).map_err(|err| err.to_string())?;
    generate_adcirc_configuration(&scratch_config, &scratch, false, false).map_err(|err| err.to_string())?;
    let fort13 = mesh.join("fort.13");
    fs::copy(scratch.join("fort.13"), &fort13).map_err(|err| err.to_string())?;
    let original = read(&fort13)?;

    let config_dir = dir.path().join("config");
    let mut linked = configuration(&mesh, false);
    linked.adcirc.use_original_mesh = true;
    linked.adcirc.fort_13_path = Some(fort13.clone());
    linked.write_directory(&config_dir, false).map_err(|err| err.to_string())?;
    let output = dir.path().join("output");
    let tree = generate_adcirc_configuration(&config_dir, &output, true, false).map_err(|err| err.to_string())?;
    let run_fort13 = tree.run_directory("unperturbed").join("fort.13");
    assert!(run_fort13.is_symlink());

    let mut rough: Perturbation = BTreeMap::new();
    rough.insert("adcirc".to_string(), BTreeMap::from([("mannings_n_at_sea_floor".to_string(), json!(0.9))]));
    linked.modeldriver.perturbations.insert("unperturbed".to_string(), rough);
    linked.write_directory(&config_dir, true).map_err(|err| err.to_string())?;
    generate_adcirc_configuration(&config_dir, &output, true, true).map_err(|err| err.to_string())?;
    assert!(!run_fort13.is_symlink());
    let attributes = NodalAttributes::read(&run_fort13).map_err(|err| err.to_string())?;
    assert_eq!(attributes.get("mannings_n_at_sea_floor").unwrap().defaults, vec![0.9]);
    assert_eq!(read(&fort13)?, original);

    linked.adcirc.use_original_mesh = false;
    linked.write_directory(&config_dir, true).map_err(|err| err.to_string())?;
    generate_adcirc_configuration(&config_dir, &output, true, true).map_err(|err| err.to_string())?;
    assert!(!output.join("fort.14").is_symlink());
    assert!(!output.join("fort.13").is_symlink());
    assert_eq!(read(&fort13)?, original);
    assert_eq!(read(&mesh.join("fort.14"))?, MESH);
    Ok(())
}

#[test]
fn coupled_best_track_run_gets_nems_files_and_track() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let track = dir.path().join("track.dat");
    fs::write(&track, TRACK).map_err(|err| err.to_string())?;
    let waves = dir.path().join("ww3.nc");
    fs::write(&waves, "").map_err(|err| err.to_string())?;

    let mut configuration = configuration(&mesh, true);
    configuration.adcirc.aswip_executable_path = Some(PathBuf::from("aswip"));
    configuration.nems = Some(NemsJson {
        executable_path: PathBuf::from("NEMS.x"),
        modeled_start_time: datetime!(2008-08-23 00:00:00),
        modeled_end_time: datetime!(2008-08-24 00:00:00),
        interval: Duration::hours(1),
        connections: Vec::new(),
        sequence: Vec::new(),
    });
    let mut besttrack = BestTrackForcingJson::for_storm("al062008");
    besttrack.fort22_filename = Some(track);
    configuration.besttrack = Some(besttrack);
    configuration.ww3data = Some(Ww3DataForcingJson {
        resource: Some(waves),
        ..Ww3DataForcingJson::default()
    });
    let config_dir = dir.path().join("config");
    configuration.write_directory(&config_dir, false).map_err(|err| err.to_string())?;

    let output = dir.path().join("output");
    let tree = generate_adcirc_configuration(&config_dir, &output, true, false).map_err(|err| err.to_string())?;
    let run = tree.run_directory("unperturbed");
    assert_eq!(read(&run.join("fort.22"))?, TRACK);
    assert_eq!(read(&output.join("spinup").join("fort.22"))?, TRACK);
    let nems = read(&run.join("nems.configure"))?;
    assert!(nems.contains("WAV -> OCN"));
    assert!(run.join("model_configure").is_file());
    assert!(run.join("config.rc").is_file());
    assert!(run.join("atm_namelist.rc").is_symlink());
    assert!(output.join("spinup").join("nems.configure").is_file());

    let job = read(&run.join("adcirc.job"))?;
    assert!(job.contains("#SBATCH -n 5"));
    assert!(job.contains("srun NEMS.x"));
    let setup = read(&run.join("setup.job"))?;
    assert!(setup.contains("aswip -n 20 -m 4 -z 2"));
    assert!(read(&run.join("fort.15"))?.contains(&format!("{:<40} ! NWS", 320)));
    Ok(())
}

#[test]
fn best_track_without_local_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mesh = mesh_directory(dir.path())?;
    let mut configuration = configuration(&mesh, false);
    configuration.besttrack = Some(BestTrackForcingJson::for_storm("al062008"));
    let config_dir = dir.path().join("config");
    configuration.write_directory(&config_dir, false).map_err(|err| err.to_string())?;

    let output = dir.path().join("output");
    let error = generate_adcirc_configuration(&config_dir, &output, false, false).unwrap_err();
    assert!(matches!(error, GenerateError::Invalid(_)), "unexpected error: {error}");
    assert!(error.to_string().contains("fort22_filename"));
    assert!(!output.exists());
    Ok(())
}
