// crates/coupled-driver-core/src/script.rs
// ============================================================================
// Module: Job Scripts
// Description: SLURM job scripts, bash snippets and ensemble driver scripts.
// Purpose: Render every shell artifact of a generated configuration.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`JobScript`] renders a login shell script with an optional SLURM header.
//! Ensemble scripts ([`EnsembleRunScript`], [`EnsembleCleanupScript`]) walk
//! the generated `spinup/` and `runs/*/` directories and submit or clean each
//! one. Rendering is pure; writing goes through [`crate::fs::write_text`].
//!
//! ## Invariants
//! - Header lines always appear in a fixed order.
//! - An email type without an address is rejected at render time.
//! - Written files end with exactly one trailing newline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use time::Duration;

use crate::error::DriverError;
use crate::error::DriverResult;
use crate::fs::make_executable;
use crate::fs::posix;
use crate::fs::write_text;
use crate::platform::Platform;
use crate::timeutil::format_wall_clock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interpreter line of every generated script.
pub const SHEBANG: &str = "#!/bin/bash --login";

/// Indentation used inside bash blocks.
const INDENT: &str = "    ";

/// Default SLURM log file when none is configured.
const DEFAULT_SLURM_LOG: &str = "slurm.log";

/// Resolves the directory holding the running script.
const DIRECTORY_DETECTION: [&str; 4] =
    ["DIRECTORY=\"$(", "    cd \"$(dirname \"$0\")\" >/dev/null 2>&1", "    pwd -P", ")\""];

/// SLURM queue listing with dependency columns.
const SQUEUE_COMMAND: &str = "squeue -u $USER -o \"%.8i %.21j %.4C %.4D %.31E %.20V %.20S %.20e\"";

// ============================================================================
// SECTION: Email Types
// ============================================================================

/// SLURM `--mail-type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlurmEmailType {
    /// No mail.
    None,
    /// Job started.
    Begin,
    /// Job ended.
    End,
    /// Job failed.
    Fail,
    /// Job requeued.
    Requeue,
    /// Burst buffer stage out and teardown completed.
    StageOut,
    /// Every event.
    All,
    /// Time limit reached.
    TimeLimit,
    /// 90 percent of the time limit reached.
    TimeLimit90,
    /// 80 percent of the time limit reached.
    TimeLimit80,
    /// 50 percent of the time limit reached.
    TimeLimit50,
    /// Mail for each array task.
    ArrayTasks,
}

impl SlurmEmailType {
    /// All email types in declaration order.
    pub const ALL_TYPES: [Self; 12] = [
        Self::None,
        Self::Begin,
        Self::End,
        Self::Fail,
        Self::Requeue,
        Self::StageOut,
        Self::All,
        Self::TimeLimit,
        Self::TimeLimit90,
        Self::TimeLimit80,
        Self::TimeLimit50,
        Self::ArrayTasks,
    ];

    /// Returns the SLURM spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Begin => "BEGIN",
            Self::End => "END",
            Self::Fail => "FAIL",
            Self::Requeue => "REQUEUE",
            Self::StageOut => "STAGE_OUT",
            Self::All => "ALL",
            Self::TimeLimit => "TIME_LIMIT",
            Self::TimeLimit90 => "TIME_LIMIT_90",
            Self::TimeLimit80 => "TIME_LIMIT_80",
            Self::TimeLimit50 => "TIME_LIMIT_50",
            Self::ArrayTasks => "ARRAY_TASKS",
        }
    }
}

impl fmt::Display for SlurmEmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlurmEmailType {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL_TYPES.into_iter().find(|kind| kind.as_str() == normalized).ok_or_else(|| {
            DriverError::InvalidValue {
                kind: "email type",
                value: value.to_string(),
            }
        })
    }
}

impl TryFrom<String> for SlurmEmailType {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlurmEmailType> for String {
    fn from(kind: SlurmEmailType) -> Self {
        kind.as_str().to_string()
    }
}

// ============================================================================
// SECTION: Job Script
// ============================================================================

/// Shell script runnable locally or through SLURM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    /// Platform the script targets.
    pub platform: Platform,
    /// Commands emitted after the header, one per line.
    pub commands: Vec<String>,
    /// `-n`: total task count.
    pub slurm_tasks: Option<u32>,
    /// `-A`: account charged for the job.
    pub slurm_account: Option<String>,
    /// `--time`: wall-clock limit.
    pub slurm_duration: Option<Duration>,
    /// `-J`: job name.
    pub slurm_run_name: String,
    /// `-D`: working directory.
    pub slurm_run_directory: Option<PathBuf>,
    /// `--mail-type`.
    pub slurm_email_type: Option<SlurmEmailType>,
    /// `--mail-user`.
    pub slurm_email_address: Option<String>,
    /// `--error` log file.
    pub slurm_error_filename: String,
    /// `--output` log file.
    pub slurm_log_filename: String,
    /// `-N`: node count; derived for Stampede2 when unset.
    pub slurm_nodes: Option<u32>,
    /// `--partition`; the platform default applies when unset.
    pub slurm_partition: Option<String>,
    /// Environment modules loaded before the commands.
    pub modules: Vec<String>,
    /// Directory prepended to `PATH`.
    pub path_prefix: Option<String>,
}

impl JobScript {
    /// Creates a script with default log files and no commands.
    #[must_use]
    pub fn new(platform: Platform, run_name: impl Into<String>) -> Self {
        Self {
            platform,
            commands: Vec::new(),
            slurm_tasks: None,
            slurm_account: None,
            slurm_duration: None,
            slurm_run_name: run_name.into(),
            slurm_run_directory: None,
            slurm_email_type: None,
            slurm_email_address: None,
            slurm_error_filename: DEFAULT_SLURM_LOG.to_string(),
            slurm_log_filename: DEFAULT_SLURM_LOG.to_string(),
            slurm_nodes: None,
            slurm_partition: None,
            modules: Vec::new(),
            path_prefix: None,
        }
    }

    /// Returns the launcher prefix for parallel commands.
    #[must_use]
    pub const fn launcher(&self) -> Option<&'static str> {
        self.platform.launcher()
    }

    /// Prefixes `command` with the platform launcher when there is one.
    #[must_use]
    pub fn launch(&self, command: &str) -> String {
        match self.launcher() {
            Some(launcher) => format!("{launcher} {command}"),
            None => command.to_string(),
        }
    }

    /// Node count written to the header.
    #[must_use]
    pub fn effective_nodes(&self) -> Option<u32> {
        self.slurm_nodes.or_else(|| self.slurm_tasks.and_then(|tasks| self.platform.nodes_for(tasks)))
    }

    /// Partition written to the header.
    #[must_use]
    pub fn effective_partition(&self) -> Option<&str> {
        self.slurm_partition.as_deref().or(self.platform.profile().default_partition)
    }

    /// Renders the `#SBATCH` header lines.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] when an email type is set without an
    /// address.
    pub fn slurm_header(&self) -> DriverResult<Vec<String>> {
        let mut lines = vec![format!("#SBATCH -J {}", self.slurm_run_name)];
        if let Some(directory) = &self.slurm_run_directory {
            lines.push(format!("#SBATCH -D {}", posix(directory)));
        }
        if let Some(account) = &self.slurm_account {
            lines.push(format!("#SBATCH -A {account}"));
        }
        if let Some(kind) = self.slurm_email_type.filter(|kind| *kind != SlurmEmailType::None) {
            lines.push(format!("#SBATCH --mail-type={kind}"));
            match self.slurm_email_address.as_deref().filter(|address| !address.is_empty()) {
                Some(address) => lines.push(format!("#SBATCH --mail-user={address}")),
                None => return Err(DriverError::Invalid("missing email address".to_string())),
            }
        }
        lines.push(format!("#SBATCH --error={}", self.slurm_error_filename));
        lines.push(format!("#SBATCH --output={}", self.slurm_log_filename));
        if let Some(tasks) = self.slurm_tasks {
            lines.push(format!("#SBATCH -n {tasks}"));
        }
        if let Some(nodes) = self.effective_nodes() {
            lines.push(format!("#SBATCH -N {nodes}"));
        }
        if let Some(duration) = self.slurm_duration {
            lines.push(format!("#SBATCH --time={}", format_wall_clock(duration)));
        }
        if let Some(partition) = self.effective_partition() {
            lines.push(format!("#SBATCH --partition={partition}"));
        }
        Ok(lines)
    }

    /// Renders the full script without a trailing newline.
    ///
    /// # Errors
    ///
    /// Propagates header validation failures.
    pub fn render(&self) -> DriverResult<String> {
        let mut lines = vec![SHEBANG.to_string()];
        if self.platform != Platform::Local {
            lines.extend(self.slurm_header()?);
            lines.extend([String::new(), "set -e".to_string(), String::new()]);
        }
        if !self.modules.is_empty() {
            lines.push(format!("module load {}", self.modules.join(" ")));
            lines.push(String::new());
        }
        if let Some(prefix) = &self.path_prefix {
            lines.push(format!("PATH={prefix}:$PATH"));
            lines.push(String::new());
        }
        lines.extend(self.commands.iter().cloned());
        Ok(lines.join("\n"))
    }

    /// Writes the script to `path` with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns rendering or write failures, including
    /// [`DriverError::FileExists`] when `overwrite` is false.
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        let output = format!("{}\n", self.render()?);
        write_text(path, &output, overwrite)
    }
}

// ============================================================================
// SECTION: Bash Helpers
// ============================================================================

/// Indents every non-empty line of `body`.
fn indent(body: &[String]) -> String {
    body.iter()
        .flat_map(|entry| entry.split('\n'))
        .map(|line| if line.is_empty() { String::new() } else { format!("{INDENT}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds a bash `for` loop from an iteration clause such as
/// `for dir in ./*`.
#[must_use]
pub fn bash_for_loop(iteration: &str, body: &[String]) -> String {
    format!("{iteration}; do\n{}\ndone", indent(body))
}

/// Alternative branch of [`bash_if_statement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElseBranch {
    /// `elif condition; then ...`.
    Elif {
        /// Branch condition.
        condition: String,
        /// Branch statements.
        then: Vec<String>,
    },
    /// `else ...`.
    Else(Vec<String>),
}

/// Builds a bash `if` statement with optional `elif`/`else` branches.
#[must_use]
pub fn bash_if_statement(condition: &str, then: &[String], branches: &[ElseBranch]) -> String {
    let condition = condition.trim().trim_start_matches("if ").trim_end_matches("; then");
    let mut lines = vec![format!("if {condition}; then"), indent(then)];
    for branch in branches {
        match branch {
            ElseBranch::Elif {
                condition,
                then,
            } => {
                lines.push(format!("elif {condition}; then"));
                lines.push(indent(then));
            }
            ElseBranch::Else(body) => {
                lines.push("else".to_string());
                lines.push(indent(body));
            }
        }
    }
    lines.push("fi".to_string());
    lines.join("\n")
}

/// Builds a bash function definition.
#[must_use]
pub fn bash_function(name: &str, body: &[String]) -> String {
    format!("{name}() {{\n{}\n}}", indent(body))
}

/// Converts string literals to owned lines.
fn lines(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

// ============================================================================
// SECTION: Ensemble Scripts
// ============================================================================

/// Script that submits (or runs) the spinup and every run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleRunScript {
    /// Target platform.
    pub platform: Platform,
    /// Commands run before any job.
    pub commands: Vec<String>,
    /// Whether a `spinup/` directory precedes the runs.
    pub run_spinup: bool,
}

impl EnsembleRunScript {
    /// Creates an ensemble run script.
    #[must_use]
    pub const fn new(platform: Platform, commands: Vec<String>, run_spinup: bool) -> Self {
        Self {
            platform,
            commands,
            run_spinup,
        }
    }

    /// Default file name (`run_<platform>.sh`).
    #[must_use]
    pub fn filename(&self) -> String {
        format!("run_{}.sh", self.platform.name())
    }

    /// Commands that start the spinup jobs.
    fn spinup_commands(&self) -> Vec<String> {
        if self.platform.profile().uses_slurm {
            lines(&[
                "spinup_setup_jobid=$(sbatch setup.job | awk '{print $NF}')",
                "spinup_jobid=$(sbatch --dependency=afterany:$spinup_setup_jobid adcirc.job | awk '{print $NF}')",
            ])
        } else {
            lines(&["sh setup.job", "sh adcirc.job"])
        }
    }

    /// Commands that start one run directory.
    fn run_commands(&self) -> Vec<String> {
        if !self.platform.profile().uses_slurm {
            return lines(&["sh setup.job", "sh adcirc.job"]);
        }
        let setup = if self.run_spinup {
            "setup_jobid=$(sbatch --dependency=afterany:$spinup_jobid setup.job | awk '{print $NF}')"
        } else {
            "setup_jobid=$(sbatch setup.job | awk '{print $NF}')"
        };
        lines(&[setup, "sbatch --dependency=afterany:$setup_jobid adcirc.job"])
    }

    /// Renders the script without a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = vec![SHEBANG.to_string(), String::new()];
        output.extend(lines(&DIRECTORY_DETECTION));
        output.push(String::new());
        if !self.commands.is_empty() {
            output.extend(self.commands.iter().cloned());
            output.push(String::new());
        }
        if self.run_spinup {
            output.push("# run spinup".to_string());
            output.push("pushd ${DIRECTORY}/spinup >/dev/null 2>&1".to_string());
            output.extend(self.spinup_commands());
            output.push("popd >/dev/null 2>&1".to_string());
            output.push(String::new());
        }
        output.push("# run configurations".to_string());
        let mut body = vec!["pushd ${directory} >/dev/null 2>&1".to_string()];
        body.extend(self.run_commands());
        body.push("popd >/dev/null 2>&1".to_string());
        output.push(bash_for_loop("for directory in ${DIRECTORY}/runs/*/", &body));
        if self.platform.profile().uses_slurm {
            output.push(String::new());
            output.push("# display job queue with dependencies".to_string());
            output.push(SQUEUE_COMMAND.to_string());
            output.push(format!("echo {}", SQUEUE_COMMAND.replace('"', "\\\"")));
        }
        output.join("\n")
    }

    /// Writes the script and marks it executable.
    ///
    /// # Errors
    ///
    /// Returns write or permission failures.
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &format!("{}\n", self.render()), overwrite)?;
        make_executable(path)
    }
}

/// Script that removes previous model output from every run directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsembleCleanupScript;

impl EnsembleCleanupScript {
    /// Default file name.
    pub const FILENAME: &'static str = "cleanup.sh";

    /// Renders the script without a trailing newline.
    #[must_use]
    pub fn render(self) -> String {
        let mut output = vec![SHEBANG.to_string(), String::new()];
        output.extend(lines(&DIRECTORY_DETECTION));
        output.push(String::new());
        output.push("# remove ADCIRC output of a previous run".to_string());
        output.push(bash_function(
            "cleanup_directory",
            &lines(&[
                "pushd ${1} >/dev/null 2>&1",
                "rm -rf PE*",
                "rm -f partmesh.txt metis_graph.txt",
                "rm -f fort.16 fort.80",
                "rm -f fort.6[1-4].nc max*.nc",
                "rm -f *.err.log *.out.log",
                "popd >/dev/null 2>&1",
            ]),
        ));
        output.push(String::new());
        output.push(bash_if_statement(
            "[ -d ${DIRECTORY}/spinup ]",
            &lines(&["cleanup_directory ${DIRECTORY}/spinup"]),
            &[],
        ));
        output.push(bash_for_loop(
            "for directory in ${DIRECTORY}/runs/*/",
            &lines(&["cleanup_directory ${directory}"]),
        ));
        output.join("\n")
    }

    /// Writes the script and marks it executable.
    ///
    /// # Errors
    ///
    /// Returns write or permission failures.
    pub fn write(self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &format!("{}\n", self.render()), overwrite)?;
        make_executable(path)
    }
}

/// Script that reruns `coupled-driver generate` next to a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationScript {
    /// Generator executable.
    pub executable: String,
    /// Pass `--relative-paths`.
    pub relative_paths: bool,
    /// Pass `--overwrite`.
    pub overwrite: bool,
}

impl GenerationScript {
    /// Default file name.
    pub const FILENAME: &'static str = "generate_adcirc.sh";

    /// Renders the script without a trailing newline.
    ///
    /// The configuration is read from, and the run tree written into, the
    /// directory holding the script.
    #[must_use]
    pub fn render(&self) -> String {
        let mut command = format!(
            "{} generate --configuration-directory ${{DIRECTORY}} --output-directory ${{DIRECTORY}}",
            self.executable
        );
        if self.relative_paths {
            command.push_str(" --relative-paths");
        }
        if self.overwrite {
            command.push_str(" --overwrite");
        }
        let mut output = vec![SHEBANG.to_string(), String::new()];
        output.extend(lines(&DIRECTORY_DETECTION));
        output.push(String::new());
        output.push(command);
        output.join("\n")
    }

    /// Writes the script and marks it executable.
    ///
    /// # Errors
    ///
    /// Returns write or permission failures.
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &format!("{}\n", self.render()), overwrite)?;
        make_executable(path)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn local_script_has_no_header() {
        let mut script = JobScript::new(Platform::Local, "job");
        script.commands.push("echo hello".to_string());
        assert_eq!(script.render().unwrap(), "#!/bin/bash --login\necho hello");
    }

    #[test]
    fn header_order_is_fixed() {
        let mut script = JobScript::new(Platform::Hera, "ADCIRC_JOB");
        script.slurm_account = Some("coastal".to_string());
        script.slurm_tasks = Some(600);
        script.slurm_duration = Some(Duration::hours(6));
        script.slurm_email_type = Some(SlurmEmailType::All);
        script.slurm_email_address = Some("example@email.gov".to_string());
        script.slurm_partition = Some("hera".to_string());
        let header = script.slurm_header().unwrap();
        assert_eq!(
            header,
            vec![
                "#SBATCH -J ADCIRC_JOB",
                "#SBATCH -A coastal",
                "#SBATCH --mail-type=ALL",
                "#SBATCH --mail-user=example@email.gov",
                "#SBATCH --error=slurm.log",
                "#SBATCH --output=slurm.log",
                "#SBATCH -n 600",
                "#SBATCH --time=06:00:00",
                "#SBATCH --partition=hera",
            ]
        );
    }

    #[test]
    fn email_type_requires_address() {
        let mut script = JobScript::new(Platform::Hera, "job");
        script.slurm_email_type = Some(SlurmEmailType::End);
        assert!(script.render().is_err());
        script.slurm_email_type = Some(SlurmEmailType::None);
        assert!(script.render().is_ok());
    }

    #[test]
    fn stampede_defaults_partition_and_nodes() {
        let mut script = JobScript::new(Platform::Stampede2, "job");
        script.slurm_tasks = Some(136);
        let header = script.slurm_header().unwrap();
        assert!(header.contains(&"#SBATCH -N 2".to_string()));
        assert!(header.contains(&"#SBATCH --partition=development".to_string()));
    }

    #[test]
    fn modules_and_path_prefix_precede_commands() {
        let mut script = JobScript::new(Platform::Local, "job");
        script.modules = vec!["intel".to_string(), "netcdf".to_string()];
        script.path_prefix = Some("/opt/adcirc/bin".to_string());
        script.commands.push("adcirc".to_string());
        assert_eq!(
            script.render().unwrap(),
            "#!/bin/bash --login\nmodule load intel netcdf\n\nPATH=/opt/adcirc/bin:$PATH\n\nadcirc"
        );
    }

    #[test]
    fn email_type_round_trips_names() {
        assert_eq!("time_limit_90".parse::<SlurmEmailType>().unwrap(), SlurmEmailType::TimeLimit90);
        assert!("sometimes".parse::<SlurmEmailType>().is_err());
    }

    #[test]
    fn for_loop_indents_body() {
        let rendered = bash_for_loop("for x in a b", &lines(&["echo $x", "", "true"]));
        assert_eq!(rendered, "for x in a b; do\n    echo $x\n\n    true\ndone");
    }

    #[test]
    fn if_statement_renders_branches() {
        let rendered = bash_if_statement(
            "if [ -f a ]; then",
            &lines(&["echo a"]),
            &[
                ElseBranch::Elif {
                    condition: "[ -f b ]".to_string(),
                    then: lines(&["echo b"]),
                },
                ElseBranch::Else(lines(&["echo none"])),
            ],
        );
        assert_eq!(
            rendered,
            "if [ -f a ]; then\n    echo a\nelif [ -f b ]; then\n    echo b\nelse\n    echo none\nfi"
        );
    }

    #[test]
    fn function_wraps_body() {
        assert_eq!(bash_function("greet", &lines(&["echo hi"])), "greet() {\n    echo hi\n}");
    }

    #[test]
    fn local_ensemble_runs_jobs_directly() {
        let script = EnsembleRunScript::new(Platform::Local, Vec::new(), true);
        let rendered = script.render();
        assert!(rendered.contains("pushd ${DIRECTORY}/spinup >/dev/null 2>&1\nsh setup.job\nsh adcirc.job"));
        assert!(!rendered.contains("sbatch"));
        assert!(!rendered.contains("squeue"));
        assert_eq!(script.filename(), "run_local.sh");
    }

    #[test]
    fn slurm_ensemble_chains_dependencies() {
        let script = EnsembleRunScript::new(Platform::Hera, Vec::new(), true);
        let rendered = script.render();
        assert!(rendered.contains("--dependency=afterany:$spinup_jobid setup.job"));
        assert!(rendered.contains("echo squeue -u $USER -o \\\"%.8i"));
        let script = EnsembleRunScript::new(Platform::Hera, Vec::new(), false);
        assert!(script.render().contains("setup_jobid=$(sbatch setup.job | awk '{print $NF}')"));
        assert!(!script.render().contains("spinup"));
    }

    #[test]
    fn generation_script_calls_generate_in_place() {
        let script = GenerationScript {
            executable: "coupled-driver".to_string(),
            relative_paths: true,
            overwrite: false,
        };
        let text = script.render();
        assert!(text.starts_with(SHEBANG));
        assert!(text.ends_with(
            "coupled-driver generate --configuration-directory ${DIRECTORY} --output-directory ${DIRECTORY} \
             --relative-paths"
        ));
    }
}
