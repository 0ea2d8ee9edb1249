// system-tests/tests/suites/shinnecock.rs
// ============================================================================
// Module: Shinnecock Inlet Tests
// Description: Tidal spinup generation over a downloaded mesh.
// Purpose: Exercise real `fort.13` / `fort.14` inputs end to end.
// Dependencies: system-tests, coupled-driver-generate, helpers
// ============================================================================

//! ## Overview
//! The Shinnecock Inlet archive is fetched from the configured mesh URL.
//! These tests need network access and run only with `network-tests`.

use std::fs;

use coupled_driver_config::TidalForcingJson;
use coupled_driver_core::adcirc::Mesh;
use coupled_driver_core::adcirc::NodalAttributes;
use coupled_driver_core::adcirc::attributes::TAU0_ATTRIBUTE;
use coupled_driver_generate::generate_adcirc_configuration;
use helpers::artifacts::TestArtifacts;
use system_tests::download::download_mesh;
use system_tests::fixtures::sample_configuration;
use system_tests::harness::HarnessSettings;

use crate::helpers;

type TestResult = Result<(), String>;

#[test]
fn shinnecock_tidal_spinup() -> TestResult {
    let settings = HarnessSettings::from_env()?;
    let artifacts = TestArtifacts::new("shinnecock_tidal_spinup")?;
    let mesh_directory = artifacts.path("mesh");
    download_mesh(&settings.mesh_url, &mesh_directory, settings.timeout)?;

    let fort_14 = mesh_directory.join("fort.14");
    let fort_13 = mesh_directory.join("fort.13");
    let mut configuration = sample_configuration(&fort_14, true)?;
    if fort_13.is_file() {
        configuration.adcirc.fort_13_path = Some(fort_13);
    }
    configuration.tidal = Some(TidalForcingJson::default());
    let configuration_directory = artifacts.path("configuration");
    configuration.write_directory(&configuration_directory, false).map_err(|err| err.to_string())?;

    let output = artifacts.path("output");
    let tree = generate_adcirc_configuration(&configuration_directory, &output, true, false)
        .map_err(|err| err.to_string())?;

    let mesh = Mesh::read(&fort_14).map_err(|err| err.to_string())?;
    let run = tree.run_directory("unperturbed");
    let attributes = NodalAttributes::read(&run.join("fort.13")).map_err(|err| err.to_string())?;
    assert_eq!(attributes.node_count, mesh.node_count());
    assert!(attributes.get(TAU0_ATTRIBUTE).is_some());

    let spinup = fs::read_to_string(output.join("spinup/fort.15")).map_err(|err| err.to_string())?;
    assert!(spinup.contains(&format!("{:<40} ! IHOT", 0)));
    assert!(!spinup.contains(&format!("{:<40} ! NTIF", 0)), "spinup must force tidal potential constituents");
    let hotstart = fs::read_to_string(run.join("fort.15")).map_err(|err| err.to_string())?;
    assert!(hotstart.contains(&format!("{:<40} ! IHOT", 567)));
    assert!(output.join("run_hera.sh").is_file());
    Ok(())
}
