// crates/coupled-driver-core/src/adcirc/jobs.rs
// ============================================================================
// Module: ADCIRC Jobs
// Description: Setup (adcprep) and run job scripts.
// Purpose: Build the `setup.job` / `adcirc.job` pair for one run directory.
// Dependencies: time
// ============================================================================

//! ## Overview
//! A [`JobTemplate`] carries the scheduler settings shared by every job of a
//! configuration. The setup job decomposes the mesh with `adcprep` (and
//! optionally preprocesses best track input with `aswip`); the run job
//! launches ADCIRC or NEMS on the requested task count.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use time::Duration;

use crate::adcirc::fort15::RunPhase;
use crate::fs::posix;
use crate::platform::Platform;
use crate::script::JobScript;
use crate::script::SlurmEmailType;

// ============================================================================
// SECTION: Job Names
// ============================================================================

/// Setup job file name.
pub const SETUP_JOB: &str = "setup.job";
/// Run job file name.
pub const RUN_JOB: &str = "adcirc.job";

/// Name of the setup job for `run` (`SPINUP` for the spinup directory).
#[must_use]
pub fn setup_job_name(run: &str) -> String {
    format!("ADCIRC_SETUP_{run}")
}

/// Name of the run job for `run` in `phase`.
#[must_use]
pub fn run_job_name(phase: RunPhase, run: &str) -> String {
    format!("ADCIRC_{}_{run}", phase.label())
}

// ============================================================================
// SECTION: Template
// ============================================================================

/// Scheduler settings shared by all jobs of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    /// Target platform.
    pub platform: Platform,
    /// Account charged.
    pub account: Option<String>,
    /// Wall-clock limit.
    pub duration: Option<Duration>,
    /// Partition override.
    pub partition: Option<String>,
    /// Node count override.
    pub nodes: Option<u32>,
    /// Mail events.
    pub email_type: Option<SlurmEmailType>,
    /// Mail recipient.
    pub email_address: Option<String>,
    /// Working directory.
    pub run_directory: Option<PathBuf>,
    /// Modules loaded before the commands.
    pub modules: Vec<String>,
    /// Directory prepended to `PATH`.
    pub path_prefix: Option<String>,
    /// File sourced before the commands (module file).
    pub source_filename: Option<PathBuf>,
    /// Launcher override.
    pub launcher: Option<String>,
    /// Commands appended after the job commands.
    pub extra_commands: Vec<String>,
}

impl JobTemplate {
    /// Template with platform defaults only.
    #[must_use]
    pub const fn new(platform: Platform) -> Self {
        Self {
            platform,
            account: None,
            duration: None,
            partition: None,
            nodes: None,
            email_type: None,
            email_address: None,
            run_directory: None,
            modules: Vec::new(),
            path_prefix: None,
            source_filename: None,
            launcher: None,
            extra_commands: Vec::new(),
        }
    }

    /// Prefixes `command` with the configured or platform launcher.
    #[must_use]
    pub fn launch(&self, command: &str) -> String {
        match self.launcher.as_deref().or_else(|| self.platform.launcher()) {
            Some(launcher) if !launcher.is_empty() => format!("{launcher} {command}"),
            _ => command.to_string(),
        }
    }

    /// Creates a job script named `name` using `tasks` tasks.
    fn script(&self, name: &str, tasks: u32) -> JobScript {
        let mut script = JobScript::new(self.platform, name);
        script.slurm_tasks = Some(tasks);
        script.slurm_account = self.account.clone().or_else(|| {
            self.platform.profile().slurm_account.map(str::to_string)
        });
        script.slurm_duration = self.duration;
        script.slurm_partition = self.partition.clone();
        script.slurm_nodes = self.nodes;
        script.slurm_email_type = self.email_type;
        script.slurm_email_address = self.email_address.clone();
        script.slurm_run_directory = self.run_directory.clone();
        script.slurm_error_filename = format!("{name}.err.log");
        script.slurm_log_filename = format!("{name}.out.log");
        script.modules = self.modules.clone();
        script.path_prefix = self.path_prefix.clone();
        if let Some(source) = &self.source_filename {
            script.commands.push(format!("source {}", posix(source)));
        }
        script
    }

    /// Appends the shared trailing commands.
    fn finish(&self, mut script: JobScript) -> JobScript {
        script.commands.extend(self.extra_commands.iter().cloned());
        script
    }

    // ========================================================================
    // SECTION: Builders
    // ========================================================================

    /// Mesh decomposition job for `processors` ADCIRC ranks.
    #[must_use]
    pub fn setup_job(
        &self,
        name: &str,
        adcprep: &str,
        processors: u32,
        aswip: Option<&AswipCommand>,
    ) -> JobScript {
        let mut script = self.script(name, 1);
        script.commands.push(self.launch(&format!("{adcprep} --np {processors} --partmesh")));
        script.commands.push(self.launch(&format!("{adcprep} --np {processors} --prepall")));
        if let Some(aswip) = aswip {
            script.commands.push(String::new());
            script.commands.push("## make sure ATCF format is correct for GAHM".to_string());
            script.commands.push(aswip.render());
        }
        self.finish(script)
    }

    /// Model run job launching `executable` on `processors` tasks.
    #[must_use]
    pub fn run_job(&self, name: &str, executable: &str, processors: u32) -> JobScript {
        let mut script = self.script(name, processors);
        script.commands.push(self.launch(executable));
        self.finish(script)
    }
}

// ============================================================================
// SECTION: ASWIP
// ============================================================================

/// Best track preprocessing with `aswip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AswipCommand {
    /// Executable path.
    pub executable: String,
    /// Target `NWS`.
    pub nws: i32,
    /// Isotachs used (`-m`).
    pub isotachs: u32,
    /// Radius of maximum winds method (`-z`).
    pub rmax_method: u32,
}

impl AswipCommand {
    /// `NWS` values `aswip` can prepare input for.
    pub const SUPPORTED_NWS: [i32; 4] = [8, 19, 20, 21];

    /// Creates the command, or `None` when `nws` is unsupported.
    #[must_use]
    pub fn new(executable: impl Into<String>, nws: i32) -> Option<Self> {
        if !Self::SUPPORTED_NWS.contains(&nws) {
            return None;
        }
        let (isotachs, rmax_method) = if nws == 20 { (4, 2) } else { (1, 1) };
        Some(Self {
            executable: executable.into(),
            nws,
            isotachs,
            rmax_method,
        })
    }

    /// Renders the invocation and the `fort.22` swap.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{} -n {} -m {} -z {}\nmv fort.22 fort.22.original\nmv NWS_{}_fort.22 fort.22",
            self.executable, self.nws, self.isotachs, self.rmax_method, self.nws
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
