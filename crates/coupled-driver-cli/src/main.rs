// crates/coupled-driver-cli/src/main.rs
// ============================================================================
// Module: Coupled Driver CLI Entry Point
// Description: Command dispatcher for `initialize` and `generate`.
// Purpose: Turn command-line flags into configuration directories and runs.
// Dependencies: clap, coupled-driver-config, coupled-driver-core,
//               coupled-driver-generate, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `coupled-driver initialize` writes a JSON configuration directory from
//! flags, settings and platform defaults. `coupled-driver generate` expands a
//! configuration directory into a spinup and per-run ADCIRC tree with job
//! scripts. Every failure is printed to stderr with a failure exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use coupled_driver_cli::InitializeOptions;
use coupled_driver_cli::build_configuration;
use coupled_driver_cli::t;
use coupled_driver_cli::write_configuration;
use coupled_driver_config::DriverSettings;
use coupled_driver_core::ConstituentSelection;
use coupled_driver_core::DriverError;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::GenerationScript;
use coupled_driver_core::Platform;
use coupled_driver_core::TidalSource;
use coupled_driver_core::forcing::parse_forcing_list;
use coupled_driver_core::timeutil::parse_datetime;
use coupled_driver_core::timeutil::parse_duration;
use coupled_driver_generate::generate_adcirc_configuration;
use thiserror::Error;
use time::Duration;
use time::PrimitiveDateTime;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "coupled-driver", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Settings file (overrides `COUPLED_DRIVER_CONFIG`).
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Log at debug level.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration directory for a run.
    Initialize(InitializeCommand),
    /// Expand a configuration directory into a run tree.
    Generate(GenerateCommand),
}

/// Arguments for `initialize`.
#[derive(Args, Debug)]
struct InitializeCommand {
    /// HPC platform (hera, stampede2, orion, local).
    #[arg(long, value_parser = parse_platform_arg)]
    platform: Option<Platform>,
    /// Directory containing `fort.14` and optionally `fort.13`.
    #[arg(long, value_name = "DIR")]
    mesh_directory: PathBuf,
    /// Start of the modeled window.
    #[arg(long, value_parser = parse_datetime_arg)]
    modeled_start_time: PrimitiveDateTime,
    /// Length of the modeled window.
    #[arg(long, value_parser = parse_duration_arg)]
    modeled_duration: Duration,
    /// Model timestep.
    #[arg(long, value_parser = parse_duration_arg)]
    modeled_timestep: Duration,
    /// NEMS coupling interval; enables NEMS.
    #[arg(long, value_parser = parse_duration_arg)]
    nems_interval: Option<Duration>,
    /// Module file sourced by job scripts.
    #[arg(long, value_name = "PATH")]
    modulefile: Option<PathBuf>,
    /// Comma-separated forcings (tidal, atmesh, besttrack, owi, ww3data).
    #[arg(long, value_name = "LIST")]
    forcings: Option<String>,
    /// Tidal spinup duration.
    #[arg(long, value_parser = parse_duration_arg)]
    tidal_spinup_duration: Option<Duration>,
    /// Tidal database (TPXO, HAMTIDE).
    #[arg(long, value_parser = parse_tidal_source_arg)]
    tidal_source: Option<TidalSource>,
    /// Tidal constituents (all, major, or a comma list).
    #[arg(long, value_parser = parse_constituents_arg)]
    tidal_constituents: Option<ConstituentSelection>,
    /// Tidal database location.
    #[arg(long, value_name = "PATH")]
    tidal_path: Option<PathBuf>,
    /// Atmospheric mesh forcing file.
    #[arg(long, value_name = "PATH")]
    atmesh_path: Option<PathBuf>,
    /// WaveWatch III forcing file.
    #[arg(long, value_name = "PATH")]
    ww3data_path: Option<PathBuf>,
    /// ATCF storm identifier, e.g. `al062018`.
    #[arg(long, value_name = "ID")]
    besttrack_storm_id: Option<String>,
    /// Local ATCF best track file.
    #[arg(long, value_name = "PATH")]
    besttrack_path: Option<PathBuf>,
    /// First best track record to use.
    #[arg(long, value_parser = parse_datetime_arg)]
    besttrack_start_date: Option<PrimitiveDateTime>,
    /// Last best track record to use.
    #[arg(long, value_parser = parse_datetime_arg)]
    besttrack_end_date: Option<PrimitiveDateTime>,
    /// Directory of OWI `fort.22*` files.
    #[arg(long, value_name = "PATH")]
    owi_path: Option<PathBuf>,
    /// ADCIRC executable, or the NEMS executable with `--nems-interval`.
    #[arg(long, value_name = "PATH", default_value = "adcirc")]
    adcirc_executable: PathBuf,
    /// ADCPREP executable.
    #[arg(long, value_name = "PATH", default_value = "adcprep")]
    adcprep_executable: PathBuf,
    /// ASWIP executable.
    #[arg(long, value_name = "PATH")]
    aswip_executable: Option<PathBuf>,
    /// ADCIRC processors (default 11).
    #[arg(long, value_name = "COUNT")]
    adcirc_processors: Option<u32>,
    /// Job wall-clock limit (default 06:00:00).
    #[arg(long, value_parser = parse_duration_arg)]
    job_duration: Option<Duration>,
    /// Directory receiving the configuration files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_directory: PathBuf,
    /// Also write an executable `generate_adcirc.sh`.
    #[arg(long, action = ArgAction::SetTrue)]
    generate_script: bool,
    /// Fail instead of overwriting existing files.
    #[arg(long, action = ArgAction::SetTrue)]
    skip_existing: bool,
    /// Keep paths absolute instead of relative to the output directory.
    #[arg(long, action = ArgAction::SetTrue)]
    absolute_paths: bool,
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Directory holding the configuration files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    configuration_directory: PathBuf,
    /// Directory receiving the run tree.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_directory: PathBuf,
    /// Write input links relative to the output directory.
    #[arg(long, action = ArgAction::SetTrue)]
    relative_paths: bool,
    /// Replace existing files.
    #[arg(long, action = ArgAction::SetTrue)]
    overwrite: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    init_logging(cli.verbose);
    match command {
        Commands::Initialize(command) => command_initialize(command, cli.config.as_deref()),
        Commands::Generate(command) => command_generate(&command),
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Installs the stderr log subscriber; `RUST_LOG` takes precedence.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "coupled_driver=debug" } else { "coupled_driver=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

// ============================================================================
// SECTION: Initialize Command
// ============================================================================

/// Executes the `initialize` command.
fn command_initialize(command: InitializeCommand, config: Option<&Path>) -> CliResult<ExitCode> {
    let forcings = match command.forcings.as_deref() {
        Some(list) => parse_forcing_list(list)
            .map_err(|err| CliError::new(t!("initialize.forcings_invalid", error = err)))?,
        None => Vec::new(),
    };
    let settings =
        DriverSettings::load_optional(config).map_err(|err| CliError::new(t!("settings.load_failed", error = err)))?;
    let working = env::current_dir().map_err(|err| CliError::new(t!("workdir.failed", error = err)))?;

    let output_directory = working.join(&command.output_directory);
    let absolute_paths = command.absolute_paths;
    let overwrite = !command.skip_existing;
    let generate_script = command.generate_script;
    let options = initialize_options(command, forcings);

    let configuration = build_configuration(&options, &settings, &working)
        .map_err(|err| CliError::new(t!("initialize.failed", error = err)))?;
    let written = write_configuration(&configuration, &output_directory, absolute_paths, overwrite)
        .map_err(|err| CliError::new(t!("initialize.failed", error = err)))?;
    write_stdout_line(&t!(
        "initialize.written",
        count = written.len(),
        directory = output_directory.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    if generate_script {
        let path = output_directory.join(GenerationScript::FILENAME);
        let script = GenerationScript {
            executable: generator_executable(),
            relative_paths: !absolute_paths,
            overwrite: true,
        };
        script
            .write(&path, overwrite)
            .map_err(|err| CliError::new(t!("initialize.script_failed", error = err)))?;
        write_stdout_line(&t!("initialize.script_written", path = path.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Moves parsed flags into [`InitializeOptions`].
fn initialize_options(command: InitializeCommand, forcings: Vec<ForcingKind>) -> InitializeOptions {
    InitializeOptions {
        platform: command.platform,
        mesh_directory: command.mesh_directory,
        modeled_start_time: command.modeled_start_time,
        modeled_duration: command.modeled_duration,
        modeled_timestep: command.modeled_timestep,
        nems_interval: command.nems_interval,
        modulefile: command.modulefile,
        forcings,
        tidal_spinup_duration: command.tidal_spinup_duration,
        tidal_source: command.tidal_source,
        tidal_constituents: command.tidal_constituents,
        tidal_path: command.tidal_path,
        atmesh_path: command.atmesh_path,
        ww3data_path: command.ww3data_path,
        besttrack_storm_id: command.besttrack_storm_id,
        besttrack_path: command.besttrack_path,
        besttrack_start_date: command.besttrack_start_date,
        besttrack_end_date: command.besttrack_end_date,
        owi_path: command.owi_path,
        adcirc_executable: command.adcirc_executable,
        adcprep_executable: command.adcprep_executable,
        aswip_executable: command.aswip_executable,
        adcirc_processors: command.adcirc_processors,
        job_duration: command.job_duration,
    }
}

/// Executable written into `generate_adcirc.sh`.
fn generator_executable() -> String {
    env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "coupled-driver".to_string())
}

// ============================================================================
// SECTION: Generate Command
// ============================================================================

/// Executes the `generate` command.
fn command_generate(command: &GenerateCommand) -> CliResult<ExitCode> {
    debug!(
        configuration = %command.configuration_directory.display(),
        output = %command.output_directory.display(),
        "generating run tree"
    );
    let tree = generate_adcirc_configuration(
        &command.configuration_directory,
        &command.output_directory,
        command.relative_paths,
        command.overwrite,
    )
    .map_err(|err| CliError::new(t!("generate.failed", error = err)))?;
    if let Some(spinup) = &tree.spinup {
        write_stdout_line(&t!("generate.spinup", directory = spinup.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    write_stdout_line(&t!("generate.written", runs = tree.runs.len(), directory = tree.root.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Value Parsers
// ============================================================================

/// Parses `--platform`.
fn parse_platform_arg(value: &str) -> Result<Platform, String> {
    value.parse().map_err(|err: DriverError| err.to_string())
}

/// Parses datetime flags.
fn parse_datetime_arg(value: &str) -> Result<PrimitiveDateTime, String> {
    parse_datetime(value).map_err(|err| err.to_string())
}

/// Parses duration flags.
fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|err| err.to_string())
}

/// Parses `--tidal-source`.
fn parse_tidal_source_arg(value: &str) -> Result<TidalSource, String> {
    value.parse().map_err(|err: DriverError| err.to_string())
}

/// Parses `--tidal-constituents`.
fn parse_constituents_arg(value: &str) -> Result<ConstituentSelection, String> {
    value.parse().map_err(|err: DriverError| err.to_string())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
