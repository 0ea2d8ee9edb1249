// crates/coupled-driver-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Tests
// Description: Unit tests for argument parsing in the CLI entry point.
// Purpose: Ensure flags map onto initialize options and defaults apply.
// Dependencies: coupled-driver-cli main helpers
// ============================================================================

//! ## Overview
//! Parses representative command lines with [`Cli::try_parse_from`] and
//! checks the resulting options.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::Parser;
use coupled_driver_core::ConstituentSelection;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::Platform;
use coupled_driver_core::TidalSource;
use time::Duration;
use time::macros::datetime;

use super::Cli;
use super::Commands;
use super::initialize_options;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const REQUIRED: [&str; 10] = [
    "coupled-driver",
    "initialize",
    "--mesh-directory",
    "mesh",
    "--modeled-start-time",
    "2018-09-13 06:00:00",
    "--modeled-duration",
    "1 days, 12:00:00",
    "--modeled-timestep",
    "2",
];

fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(REQUIRED.iter().chain(extra.iter()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn initialize_defaults() {
    let cli = parse(&[]).unwrap();
    assert!(!cli.verbose);
    let Some(Commands::Initialize(command)) = cli.command else {
        panic!("expected initialize");
    };
    assert_eq!(command.modeled_start_time, datetime!(2018-09-13 06:00:00));
    assert_eq!(command.modeled_duration, Duration::hours(36));
    assert_eq!(command.modeled_timestep, Duration::seconds(2));
    assert_eq!(command.adcirc_executable, PathBuf::from("adcirc"));
    assert_eq!(command.adcprep_executable, PathBuf::from("adcprep"));
    assert_eq!(command.output_directory, PathBuf::from("."));
    assert!(command.platform.is_none());
    assert!(!command.skip_existing);
    assert!(!command.generate_script);
    assert!(!command.absolute_paths);
}

#[test]
fn initialize_flags_reach_options() {
    let cli = parse(&[
        "--platform",
        "HERA",
        "--nems-interval",
        "01:00:00",
        "--tidal-spinup-duration",
        "12 days, 00:00:00",
        "--tidal-source",
        "hamtide",
        "--tidal-constituents",
        "M2,S2",
        "--besttrack-storm-id",
        "al062018",
        "--adcirc-processors",
        "40",
        "--job-duration",
        "02:00:00",
        "--verbose",
    ])
    .unwrap();
    assert!(cli.verbose);
    let Some(Commands::Initialize(command)) = cli.command else {
        panic!("expected initialize");
    };
    let options = initialize_options(command, vec![ForcingKind::BestTrack]);
    assert_eq!(options.platform, Some(Platform::Hera));
    assert_eq!(options.nems_interval, Some(Duration::hours(1)));
    assert_eq!(options.tidal_spinup_duration, Some(Duration::days(12)));
    assert_eq!(options.tidal_source, Some(TidalSource::Hamtide));
    assert!(matches!(options.tidal_constituents, Some(ConstituentSelection::List(_))));
    assert_eq!(options.besttrack_storm_id.as_deref(), Some("al062018"));
    assert_eq!(options.adcirc_processors, Some(40));
    assert_eq!(options.job_duration, Some(Duration::hours(2)));
    assert_eq!(options.forcings, vec![ForcingKind::BestTrack]);
}

#[test]
fn unknown_platform_is_a_parse_error() {
    let error = parse(&["--platform", "summit"]).unwrap_err();
    assert!(error.to_string().contains("summit"));
}

#[test]
fn malformed_duration_is_a_parse_error() {
    assert!(parse(&["--job-duration", "soon"]).is_err());
}

#[test]
fn mesh_directory_is_required() {
    let result = Cli::try_parse_from([
        "coupled-driver",
        "initialize",
        "--modeled-start-time",
        "2018-09-13",
        "--modeled-duration",
        "06:00:00",
        "--modeled-timestep",
        "2",
    ]);
    assert!(result.is_err());
}

#[test]
fn generate_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["coupled-driver", "generate", "--overwrite"]).unwrap();
    let Some(Commands::Generate(command)) = cli.command else {
        panic!("expected generate");
    };
    assert_eq!(command.configuration_directory, PathBuf::from("."));
    assert_eq!(command.output_directory, PathBuf::from("."));
    assert!(command.overwrite);
    assert!(!command.relative_paths);
}

#[test]
fn version_needs_no_subcommand() {
    let cli = Cli::try_parse_from(["coupled-driver", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(cli.command.is_none());
}
