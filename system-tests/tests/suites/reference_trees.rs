// system-tests/tests/suites/reference_trees.rs
// ============================================================================
// Module: Reference Tree Tests
// Description: Hera coldstart and spinup trees against stored copies.
// Purpose: Pin every generated line apart from version stamps.
// Dependencies: system-tests, coupled-driver-generate, helpers
// ============================================================================

//! ## Overview
//! Each test writes the sample mesh and a configuration directory, runs the
//! generator and compares the output with `tests/data/reference/<name>`.
//! Invariants:
//! - Reference files are compared after their first line.
//! - Regenerating without overwrite fails and leaves the tree intact.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_core::DriverError;
use coupled_driver_generate::generate_adcirc_configuration;
use helpers::artifacts::TestArtifacts;
use system_tests::fixtures::sample_configuration;
use system_tests::fixtures::write_sample_mesh;
use system_tests::reference::check_reference_directory;

use crate::helpers;

type TestResult = Result<(), String>;

fn reference_directory(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/reference").join(name)
}

/// Writes the mesh and configuration, returning the configuration directory.
fn prepare(artifacts: &TestArtifacts, spinup: bool) -> Result<PathBuf, String> {
    let fort_14 = write_sample_mesh(&artifacts.path("mesh"))?;
    let configuration = sample_configuration(&fort_14, spinup)?;
    let directory = artifacts.path("configuration");
    configuration.write_directory(&directory, false).map_err(|err| err.to_string())?;
    Ok(directory)
}

#[test]
fn hera_coldstart_matches_reference() -> TestResult {
    let artifacts = TestArtifacts::new("hera_coldstart")?;
    let configuration = prepare(&artifacts, false)?;
    let output = artifacts.path("output");

    let tree = generate_adcirc_configuration(&configuration, &output, true, false).map_err(|err| err.to_string())?;
    assert!(tree.spinup.is_none());
    assert_eq!(tree.runs, vec!["unperturbed".to_string()]);
    assert!(!output.join("spinup").exists());
    check_reference_directory(&output, &reference_directory("hera_coldstart"))
}

#[test]
fn hera_spinup_matches_reference() -> TestResult {
    let artifacts = TestArtifacts::new("hera_spinup")?;
    let configuration = prepare(&artifacts, true)?;
    let output = artifacts.path("output");

    let tree = generate_adcirc_configuration(&configuration, &output, true, false).map_err(|err| err.to_string())?;
    assert_eq!(tree.spinup.as_deref(), Some(output.join("spinup").as_path()));
    check_reference_directory(&output, &reference_directory("hera_spinup"))?;

    let run = tree.run_directory("unperturbed");
    let hotstart = fs::read_link(run.join("fort.67.nc")).map_err(|err| err.to_string())?;
    assert_eq!(hotstart, Path::new("../../spinup/fort.67.nc"));
    let mesh = fs::read_link(run.join("fort.14")).map_err(|err| err.to_string())?;
    assert_eq!(mesh, Path::new("../../fort.14"));
    Ok(())
}

#[test]
fn regeneration_requires_overwrite() -> TestResult {
    let artifacts = TestArtifacts::new("regeneration_requires_overwrite")?;
    let configuration = prepare(&artifacts, true)?;
    let output = artifacts.path("output");
    generate_adcirc_configuration(&configuration, &output, true, false).map_err(|err| err.to_string())?;

    let Err(error) = generate_adcirc_configuration(&configuration, &output, true, false) else {
        return Err("second generation without overwrite succeeded".to_string());
    };
    assert!(matches!(error.driver(), Some(DriverError::FileExists(_))), "unexpected error: {error}");

    generate_adcirc_configuration(&configuration, &output, true, true).map_err(|err| err.to_string())?;
    check_reference_directory(&output, &reference_directory("hera_spinup"))
}
