// crates/coupled-driver-generate/src/generator.rs
// ============================================================================
// Module: ADCIRC Configuration Generator
// Description: Expansion of a configuration directory into a run tree.
// Purpose: Write the mesh, spinup directory, run directories and scripts.
// Dependencies: coupled-driver-config, coupled-driver-core, tracing
// ============================================================================

//! ## Overview
//! Generation reads a configuration directory, loads the mesh and nodal
//! attributes once, then writes:
//!
//! ```text
//! <output>/fort.14, fort.13          mesh (rewritten or linked)
//! <output>/spinup/                   tidal spinup (coldstart)
//! <output>/runs/<name>/              one directory per perturbation
//! <output>/cleanup.sh, run_<platform>.sh
//! ```
//!
//! Every input is validated and every perturbation is expanded before the
//! first file is written. Existing files are only replaced when overwriting
//! is enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_config::RunConfiguration;
use coupled_driver_core::DriverError;
use coupled_driver_core::EnsembleCleanupScript;
use coupled_driver_core::EnsembleRunScript;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::GENERATOR;
use coupled_driver_core::adcirc::AswipCommand;
use coupled_driver_core::adcirc::FORT13;
use coupled_driver_core::adcirc::FORT14;
use coupled_driver_core::adcirc::FORT15;
use coupled_driver_core::adcirc::Fort15;
use coupled_driver_core::adcirc::Mesh;
use coupled_driver_core::adcirc::MeteorologicalForcing;
use coupled_driver_core::adcirc::NodalAttributes;
use coupled_driver_core::adcirc::RunPhase;
use coupled_driver_core::adcirc::Station;
use coupled_driver_core::adcirc::fort15::read_stations;
use coupled_driver_core::adcirc::jobs::RUN_JOB;
use coupled_driver_core::adcirc::jobs::SETUP_JOB;
use coupled_driver_core::adcirc::jobs::run_job_name;
use coupled_driver_core::adcirc::jobs::setup_job_name;
use coupled_driver_core::adcirc::tides::Constituent;
use coupled_driver_core::adcirc::tides::select_constituents;
use coupled_driver_core::forcing::effective_nws;
use coupled_driver_core::fs::absolute_from;
use coupled_driver_core::fs::create_dir_all;
use coupled_driver_core::fs::create_symlink;
use coupled_driver_core::fs::ensure_writable;
use coupled_driver_core::fs::normalize;
use coupled_driver_core::fs::posix;
use coupled_driver_core::fs::read_text;
use coupled_driver_core::fs::relative_path;
use coupled_driver_core::fs::write_text;
use coupled_driver_core::nems::ModelEntry;
use coupled_driver_core::nems::ModelType;
use coupled_driver_core::nems::ModelingSystem;
use time::Duration;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::GenerateError;
use crate::error::GenerateResult;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Spinup directory under the output root.
pub const SPINUP_DIRECTORY: &str = "spinup";
/// Parent of the run directories.
pub const RUNS_DIRECTORY: &str = "runs";
/// Job name suffix of the spinup jobs.
pub const SPINUP_JOB_SUFFIX: &str = "SPINUP";
/// Hotstart files linked from the spinup into each run.
pub const HOTSTART_FILES: [&str; 2] = ["fort.67.nc", "fort.68.nc"];
/// Best track and OWI input file name.
pub const FORT22: &str = "fort.22";
/// Wind interval when the forcing does not carry one.
const DEFAULT_WIND_INTERVAL: Duration = Duration::hours(1);

/// Summary of a generated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTree {
    /// Absolute output root.
    pub root: PathBuf,
    /// Spinup directory, when a tidal spinup is configured.
    pub spinup: Option<PathBuf>,
    /// Run names in directory order.
    pub runs: Vec<String>,
}

impl GeneratedTree {
    /// Directory of run `name`.
    #[must_use]
    pub fn run_directory(&self, name: &str) -> PathBuf {
        self.root.join(RUNS_DIRECTORY).join(name)
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Expands `configuration_directory` into a run tree under
/// `output_directory`.
///
/// With `relative_paths`, links and paths written into job scripts and NEMS
/// files are expressed relative to the directory that holds them.
///
/// # Errors
///
/// Returns [`GenerateError`] when the configuration is missing or invalid, an
/// input file is absent, or a target exists and `overwrite` is false.
pub fn generate_adcirc_configuration(
    configuration_directory: &Path,
    output_directory: &Path,
    relative_paths: bool,
    overwrite: bool,
) -> GenerateResult<GeneratedTree> {
    let working = env::current_dir().map_err(|err| DriverError::io(Path::new("."), &err))?;
    let configuration_directory = absolute_from(configuration_directory, &working);
    let root = absolute_from(output_directory, &working);
    info!(
        configuration = %configuration_directory.display(),
        output = %root.display(),
        "generating ADCIRC configuration"
    );

    let configuration = RunConfiguration::read_directory(&configuration_directory)?;
    let generator = Generator::new(&configuration, root, relative_paths, overwrite)?;
    let runs = configuration.perturb()?;
    generator.check_runs(&runs)?;

    create_dir_all(&generator.root)?;
    generator.write_mesh()?;
    let spinup = match configuration.adcirc.tidal_spinup_duration {
        Some(duration) => Some(generator.write_spinup(duration)?),
        None => None,
    };
    for (name, run) in &runs {
        generator.write_run(name, run, spinup.as_deref())?;
    }
    generator.write_scripts(spinup.is_some())?;

    info!(runs = runs.len(), spinup = spinup.is_some(), "generated ADCIRC configuration");
    Ok(GeneratedTree {
        root: generator.root,
        spinup,
        runs: runs.into_keys().collect(),
    })
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Shared state of one generation.
struct Generator<'a> {
    /// Unperturbed configuration.
    configuration: &'a RunConfiguration,
    /// Absolute output root.
    root: PathBuf,
    /// Write paths relative to their directory.
    relative_paths: bool,
    /// Replace existing files.
    overwrite: bool,
    /// Mesh read from `fort_14_path`.
    mesh: Mesh,
    /// Nodal attributes before per-run overrides.
    attributes: NodalAttributes,
}

impl<'a> Generator<'a> {
    /// Loads the mesh and nodal attributes.
    fn new(
        configuration: &'a RunConfiguration,
        root: PathBuf,
        relative_paths: bool,
        overwrite: bool,
    ) -> GenerateResult<Self> {
        let adcirc = &configuration.adcirc;
        let mesh = Mesh::read(&adcirc.fort_14_path)?;
        let mut attributes = match &adcirc.fort_13_path {
            Some(path) if path.is_file() => NodalAttributes::read(path)?,
            Some(path) => {
                return Err(DriverError::MissingInput {
                    kind: "nodal attributes (fort.13)",
                    path: path.clone(),
                }
                .into());
            }
            None => NodalAttributes::for_mesh(&mesh),
        };
        if attributes.node_count != mesh.node_count() {
            return Err(GenerateError::Invalid(format!(
                "fort.13 describes {} nodes but fort.14 has {}",
                attributes.node_count,
                mesh.node_count()
            )));
        }
        if !adcirc.use_original_mesh && attributes.generate_tau0(&mesh) {
            info!("generated tau0 nodal attribute from mesh depths");
        }
        debug!(nodes = mesh.node_count(), attributes = ?attributes.names(), "loaded mesh");
        Ok(Self {
            configuration,
            root,
            relative_paths,
            overwrite,
            mesh,
            attributes,
        })
    }

    /// Rejects runs that cannot be written, before anything is written.
    fn check_runs(&self, runs: &BTreeMap<String, RunConfiguration>) -> GenerateResult<()> {
        check_run(SPINUP_DIRECTORY, self.configuration)?;
        for (name, run) in runs {
            check_run(name, run)?;
        }
        Ok(())
    }

    // ========================================================================
    // SECTION: Mesh
    // ========================================================================

    /// Writes or links `fort.14` and `fort.13` at the output root.
    fn write_mesh(&self) -> GenerateResult<()> {
        let adcirc = &self.configuration.adcirc;
        let fort14 = self.root.join(FORT14);
        let fort13 = self.root.join(FORT13);
        if adcirc.use_original_mesh {
            self.link(&adcirc.fort_14_path, &fort14, self.relative_paths)?;
            if let Some(path) = &adcirc.fort_13_path {
                self.link(path, &fort13, self.relative_paths)?;
            }
            debug!(root = %self.root.display(), "linked original mesh");
        } else {
            self.mesh.write(&fort14, self.overwrite)?;
            self.attributes.write(&fort13, self.overwrite)?;
            debug!(root = %self.root.display(), "wrote mesh");
        }
        Ok(())
    }

    /// Writes or links the nodal attributes of `run` into `directory`.
    fn write_attributes(&self, directory: &Path, run: &RunConfiguration) -> GenerateResult<NodalAttributes> {
        let mut attributes = self.attributes.clone();
        for (name, value) in &run.adcirc.nodal_attributes {
            attributes.set_uniform(name, *value);
        }
        let target = directory.join(FORT13);
        if run.adcirc.use_original_mesh && run.adcirc.nodal_attributes.is_empty() {
            if run.adcirc.fort_13_path.is_some() {
                self.link(&self.root.join(FORT13), &target, true)?;
            }
        } else {
            attributes.write(&target, self.overwrite)?;
        }
        Ok(attributes)
    }

    // ========================================================================
    // SECTION: Spinup
    // ========================================================================

    /// Writes the tidal spinup directory and returns its path.
    fn write_spinup(&self, duration: Duration) -> GenerateResult<PathBuf> {
        let configuration = self.configuration;
        let adcirc = &configuration.adcirc;
        let directory = self.root.join(SPINUP_DIRECTORY);
        create_dir_all(&directory)?;

        let attributes = self.write_attributes(&directory, configuration)?;
        self.link(&self.root.join(FORT14), &directory.join(FORT14), true)?;
        let constituents = constituents(configuration)?;
        let start = adcirc.modeled_start_time;
        let fort15 = Fort15 {
            description: self.mesh.description.clone(),
            run_id: SPINUP_DIRECTORY.to_string(),
            mesh: &self.mesh,
            attributes: &attributes,
            phase: RunPhase::Coldstart,
            coldstart_time: start - duration,
            end_time: start,
            timestep: adcirc.spinup_timestep(),
            ramp: duration,
            gwce: adcirc.gwce_solution_scheme,
            smagorinsky: adcirc.use_smagorinsky,
            constituents,
            meteorological: None,
            stations: &[],
            write_surface_output: false,
            write_station_output: false,
            output_start: start,
        };
        fort15.write(&directory.join(FORT15), self.overwrite)?;

        let system = match self.modeling_system(configuration, &directory)? {
            Some(system) => {
                let spinup = system.spinup(duration)?;
                spinup.write(&directory, GENERATOR, self.overwrite)?;
                Some(spinup)
            }
            None => None,
        };
        self.write_best_track(&directory, configuration)?;
        self.write_jobs(&directory, configuration, SPINUP_JOB_SUFFIX, RunPhase::Coldstart, system.as_ref())?;

        info!(directory = %directory.display(), duration = %duration, "wrote tidal spinup");
        Ok(directory)
    }

    // ========================================================================
    // SECTION: Runs
    // ========================================================================

    /// Writes `runs/<name>/`.
    fn write_run(&self, name: &str, run: &RunConfiguration, spinup: Option<&Path>) -> GenerateResult<()> {
        let adcirc = &run.adcirc;
        let directory = self.root.join(RUNS_DIRECTORY).join(name);
        create_dir_all(&directory)?;

        let attributes = self.write_attributes(&directory, run)?;
        self.link(&self.root.join(FORT14), &directory.join(FORT14), true)?;
        let stations: Vec<Station> = match &adcirc.stations_file_path {
            Some(path) if adcirc.write_station_output => read_stations(path)?,
            _ => Vec::new(),
        };
        let spinup_duration = self.configuration.adcirc.tidal_spinup_duration;
        let (phase, coldstart_time, ramp) = match spinup_duration {
            Some(duration) => (RunPhase::Hotstart, adcirc.modeled_start_time - duration, duration),
            None => (RunPhase::Coldstart, adcirc.modeled_start_time, Duration::ZERO),
        };
        let fort15 = Fort15 {
            description: self.mesh.description.clone(),
            run_id: name.to_string(),
            mesh: &self.mesh,
            attributes: &attributes,
            phase,
            coldstart_time,
            end_time: adcirc.modeled_end_time,
            timestep: adcirc.modeled_timestep,
            ramp,
            gwce: adcirc.gwce_solution_scheme,
            smagorinsky: adcirc.use_smagorinsky,
            constituents: constituents(run)?,
            meteorological: meteorological(run),
            stations: &stations,
            write_surface_output: adcirc.write_surface_output,
            write_station_output: adcirc.write_station_output,
            output_start: adcirc.modeled_start_time,
        };
        fort15.write(&directory.join(FORT15), self.overwrite)?;

        if let Some(spinup) = spinup {
            for filename in HOTSTART_FILES {
                if let Err(err) = self.link(&spinup.join(filename), &directory.join(filename), true) {
                    warn!(run = name, file = filename, error = %err, "could not link hotstart file");
                }
            }
        }

        let system = self.modeling_system(run, &directory)?;
        if let Some(system) = &system {
            system.write(&directory, GENERATOR, self.overwrite)?;
        }
        self.link_owi(&directory, run)?;
        self.write_best_track(&directory, run)?;
        self.write_jobs(&directory, run, name, phase, system.as_ref())?;

        info!(run = name, phase = phase.label(), directory = %directory.display(), "wrote run");
        Ok(())
    }

    // ========================================================================
    // SECTION: Jobs
    // ========================================================================

    /// Writes `setup.job` and `adcirc.job` into `directory`.
    fn write_jobs(
        &self,
        directory: &Path,
        run: &RunConfiguration,
        suffix: &str,
        phase: RunPhase,
        system: Option<&ModelingSystem>,
    ) -> GenerateResult<()> {
        let adcirc = &run.adcirc;
        let mut template = run.job_template();
        template.source_filename = template.source_filename.take().map(|path| self.display_path(&path, directory));

        let (executable, processors) = match (system, &run.nems) {
            (Some(system), Some(nems)) => (self.command(&nems.executable_path, directory), system.processors()),
            _ => (self.command(&adcirc.adcirc_executable_path, directory), adcirc.processors),
        };
        let processors = run.slurm.tasks.unwrap_or(processors);
        let adcprep = self.command(&adcirc.adcprep_executable_path, directory);
        let aswip = self.aswip(run, directory);

        let setup_name = job_name(run, &setup_job_name(suffix));
        let mut setup = template.setup_job(&setup_name, &adcprep, adcirc.processors, aswip.as_ref());
        let run_name = job_name(run, &run_job_name(phase, suffix));
        let mut job = template.run_job(&run_name, &executable, processors);
        if let Some(log) = &run.slurm.log_filename {
            setup.slurm_log_filename.clone_from(log);
            job.slurm_log_filename.clone_from(log);
        }
        setup.write(&directory.join(SETUP_JOB), self.overwrite)?;
        job.write(&directory.join(RUN_JOB), self.overwrite)?;
        Ok(())
    }

    /// ASWIP preprocessing for best track runs, when possible.
    fn aswip(&self, run: &RunConfiguration, directory: &Path) -> Option<AswipCommand> {
        let besttrack = run.besttrack.as_ref()?;
        let Some(executable) = &run.adcirc.aswip_executable_path else {
            warn!(nws = besttrack.nws, "no aswip executable configured; best track input is used as is");
            return None;
        };
        let command = AswipCommand::new(self.command(executable, directory), besttrack.nws);
        if command.is_none() {
            warn!(nws = besttrack.nws, "aswip does not support this NWS; best track input is used as is");
        }
        command
    }

    // ========================================================================
    // SECTION: Forcing Inputs
    // ========================================================================

    /// NEMS modeling system of `run`, when coupled.
    fn modeling_system(&self, run: &RunConfiguration, directory: &Path) -> GenerateResult<Option<ModelingSystem>> {
        let Some(nems) = &run.nems else {
            return Ok(None);
        };
        let mut models = vec![ModelEntry::adcirc(run.adcirc.processors)];
        if let Some(atmesh) = &run.atmesh {
            let path = resource(atmesh.resource.as_ref(), ForcingKind::Atmesh)?;
            models.push(ModelEntry::atmesh(self.display_path(path, directory), atmesh.processors));
        }
        if let Some(ww3data) = &run.ww3data {
            let path = resource(ww3data.resource.as_ref(), ForcingKind::Ww3Data)?;
            models.push(ModelEntry::ww3data(self.display_path(path, directory), ww3data.processors));
        }
        let mut system = ModelingSystem::new(nems.modeled_start_time, nems.modeled_end_time, nems.interval, models)?;
        if nems.connections.is_empty() {
            let sources: Vec<ModelType> = system
                .models
                .iter()
                .map(|entry| entry.model_type)
                .filter(|model_type| *model_type != ModelType::Ocn)
                .collect();
            for source in sources {
                system.connect(source, ModelType::Ocn)?;
            }
        } else {
            system.connections.clone_from(&nems.connections);
            system.validate()?;
        }
        if !nems.sequence.is_empty() {
            system.set_sequence(nems.sequence.clone())?;
        }
        Ok(Some(system))
    }

    /// Copies the best track file of `run` into `directory` as `fort.22`.
    fn write_best_track(&self, directory: &Path, run: &RunConfiguration) -> GenerateResult<()> {
        let Some(path) = run.besttrack.as_ref().and_then(|forcing| forcing.fort22_filename.as_ref()) else {
            return Ok(());
        };
        if !path.is_file() {
            return Err(DriverError::MissingInput {
                kind: "best track (fort.22)",
                path: path.clone(),
            }
            .into());
        }
        write_text(&directory.join(FORT22), &read_text(path)?, self.overwrite)?;
        Ok(())
    }

    /// Links the `fort.22*` files of the OWI resource directory.
    fn link_owi(&self, directory: &Path, run: &RunConfiguration) -> GenerateResult<()> {
        let Some(owi) = &run.owi else {
            return Ok(());
        };
        let Some(resource) = &owi.resource else {
            warn!("OWI forcing has no resource directory; fort.22 files must be provided by hand");
            return Ok(());
        };
        let entries = fs::read_dir(resource).map_err(|err| DriverError::io(resource, &err))?;
        let mut filenames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DriverError::io(resource, &err))?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename.starts_with(FORT22) {
                filenames.push(filename);
            }
        }
        if filenames.is_empty() {
            warn!(resource = %resource.display(), "no fort.22 files in OWI resource directory");
        }
        filenames.sort();
        for filename in filenames {
            self.link(&resource.join(&filename), &directory.join(&filename), self.relative_paths)?;
        }
        Ok(())
    }

    // ========================================================================
    // SECTION: Root Scripts
    // ========================================================================

    /// Writes `cleanup.sh` and `run_<platform>.sh`.
    fn write_scripts(&self, run_spinup: bool) -> GenerateResult<()> {
        let cleanup = EnsembleCleanupScript;
        cleanup.write(&self.root.join(EnsembleCleanupScript::FILENAME), self.overwrite)?;
        let script = EnsembleRunScript::new(
            self.configuration.modeldriver.platform,
            vec![
                "echo deleting previous ADCIRC output".to_string(),
                format!("sh ${{DIRECTORY}}/{}", EnsembleCleanupScript::FILENAME),
            ],
            run_spinup,
        );
        script.write(&self.root.join(script.filename()), self.overwrite)?;
        Ok(())
    }

    // ========================================================================
    // SECTION: Paths
    // ========================================================================

    /// Links `link` to `source` unless they are the same file.
    fn link(&self, source: &Path, link: &Path, relative: bool) -> GenerateResult<()> {
        if normalize(source) == normalize(link) {
            debug!(path = %link.display(), "source is already in place");
            return Ok(());
        }
        ensure_writable(link, self.overwrite)?;
        create_symlink(source, link, relative)?;
        Ok(())
    }

    /// `path` as written into files of `directory`.
    fn display_path(&self, path: &Path, directory: &Path) -> PathBuf {
        if self.relative_paths && path.is_absolute() {
            relative_path(path, directory)
        } else {
            path.to_path_buf()
        }
    }

    /// Executable invocation for scripts in `directory`.
    fn command(&self, path: &Path, directory: &Path) -> String {
        posix(&self.display_path(path, directory))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks inputs that only generation needs.
fn check_run(name: &str, run: &RunConfiguration) -> GenerateResult<()> {
    if let Some(besttrack) = &run.besttrack
        && besttrack.fort22_filename.is_none()
    {
        return Err(GenerateError::Invalid(format!(
            "best track forcing of \"{name}\" needs a local fort22_filename (storm {})",
            besttrack.storm_id.as_deref().unwrap_or("unknown")
        )));
    }
    if run.nems.is_some() {
        if let Some(atmesh) = &run.atmesh {
            resource(atmesh.resource.as_ref(), ForcingKind::Atmesh)?;
        }
        if let Some(ww3data) = &run.ww3data {
            resource(ww3data.resource.as_ref(), ForcingKind::Ww3Data)?;
        }
    }
    Ok(())
}

/// Requires a data component resource.
fn resource(path: Option<&PathBuf>, kind: ForcingKind) -> GenerateResult<&Path> {
    path.map(PathBuf::as_path)
        .ok_or_else(|| GenerateError::Invalid(format!("{kind} forcing needs a resource file for NEMS")))
}

/// Tidal constituents forced by `run`.
fn constituents(run: &RunConfiguration) -> GenerateResult<Vec<&'static Constituent>> {
    match &run.tidal {
        Some(tidal) => Ok(select_constituents(tidal.tidal_source, &tidal.constituents)?),
        None => Ok(Vec::new()),
    }
}

/// Wind and wave timing of `run`, when either is forced.
fn meteorological(run: &RunConfiguration) -> Option<MeteorologicalForcing> {
    let wind_nws = run.wind_nws();
    let has_waves = run.ww3data.is_some();
    if wind_nws.is_none() && !has_waves {
        return None;
    }
    let wind_interval = run
        .atmesh
        .as_ref()
        .map(|forcing| forcing.interval)
        .or_else(|| run.owi.as_ref().map(|forcing| forcing.interval))
        .unwrap_or(DEFAULT_WIND_INTERVAL);
    Some(MeteorologicalForcing {
        nws: effective_nws(wind_nws, has_waves),
        wind_interval,
        wave_interval: run.ww3data.as_ref().map(|forcing| forcing.interval),
        best_track_start: run
            .besttrack
            .as_ref()
            .map(|forcing| forcing.start_date.unwrap_or(run.adcirc.modeled_start_time)),
    })
}

/// Scheduler job name with the configured prefix.
fn job_name(run: &RunConfiguration, name: &str) -> String {
    match run.slurm.run_name.as_deref().map(str::trim) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}_{name}"),
        _ => name.to_string(),
    }
}
