// system-tests/src/harness.rs
// ============================================================================
// Module: Harness Settings
// Description: Environment knobs for the system-test binaries.
// Purpose: Locate run roots and the mesh archive without code changes.
// Dependencies: coupled-driver-core
// ============================================================================

//! ## Overview
//! Four variables steer the suites:
//!
//! | Variable | Effect |
//! |---|---|
//! | `COUPLED_DRIVER_TEST_RUN_ROOT` | Generate below this directory and keep it |
//! | `COUPLED_DRIVER_TEST_KEEP_OUTPUT` | Keep trees under `target/system-tests` |
//! | `COUPLED_DRIVER_TEST_MESH_URL` | Mesh archive for the network suite |
//! | `COUPLED_DRIVER_TEST_TIMEOUT` | Download timeout, `H:MM:SS` or seconds |
//!
//! A variable that is set must hold a usable value; blanks are errors rather
//! than defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use coupled_driver_core::timeutil::parse_duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Shinnecock Inlet mesh archive (`fort.13`, `fort.14`).
pub const DEFAULT_MESH_URL: &str = "https://www.dropbox.com/s/1wk91r67cacf132/NetCDF_shinnecock_inlet.tar.bz2?dl=1";

/// Run root variable.
pub const RUN_ROOT_VAR: &str = "COUPLED_DRIVER_TEST_RUN_ROOT";
/// Keep-output variable.
pub const KEEP_OUTPUT_VAR: &str = "COUPLED_DRIVER_TEST_KEEP_OUTPUT";
/// Mesh archive variable.
pub const MESH_URL_VAR: &str = "COUPLED_DRIVER_TEST_MESH_URL";
/// Download timeout variable.
pub const TIMEOUT_VAR: &str = "COUPLED_DRIVER_TEST_TIMEOUT";

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Resolved harness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    /// Directory that receives kept run trees.
    pub run_root: Option<PathBuf>,
    /// Keep trees even without a run root.
    pub keep_output: bool,
    /// Mesh archive location.
    pub mesh_url: String,
    /// Download timeout; the downloader default applies when unset.
    pub timeout: Option<Duration>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            run_root: None,
            keep_output: false,
            mesh_url: DEFAULT_MESH_URL.to_string(),
            timeout: None,
        }
    }
}

impl HarnessSettings {
    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first unusable variable.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(format!("{name} is not valid UTF-8")),
        })
    }

    /// Reads the settings through `lookup`, which returns a variable's value
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first unusable variable.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, String>
    where
        F: FnMut(&'static str) -> Result<Option<String>, String>,
    {
        let mut value = |name: &'static str| -> Result<Option<String>, String> {
            match lookup(name)? {
                Some(raw) if raw.trim().is_empty() => Err(format!("{name} is set but blank")),
                Some(raw) => Ok(Some(raw.trim().to_string())),
                None => Ok(None),
            }
        };
        let run_root = value(RUN_ROOT_VAR)?.map(PathBuf::from);
        let keep_output = match value(KEEP_OUTPUT_VAR)? {
            Some(raw) => parse_flag(KEEP_OUTPUT_VAR, &raw)?,
            None => false,
        };
        let mesh_url = value(MESH_URL_VAR)?.unwrap_or_else(|| DEFAULT_MESH_URL.to_string());
        let timeout = value(TIMEOUT_VAR)?.as_deref().map(parse_timeout).transpose()?;
        Ok(Self {
            run_root,
            keep_output,
            mesh_url,
            timeout,
        })
    }

    /// Whether generated trees outlive the test.
    #[must_use]
    pub const fn keeps_output(&self) -> bool {
        self.keep_output || self.run_root.is_some()
    }
}

/// Accepts `1`/`0`, `true`/`false` and `yes`/`no`.
fn parse_flag(name: &str, raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(format!("{name}: expected a boolean, got \"{raw}\"")),
    }
}

/// Parses a positive download timeout in the driver's duration syntax.
fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let duration = parse_duration(raw).map_err(|err| format!("{TIMEOUT_VAR}: {err}"))?;
    match Duration::try_from(duration) {
        Ok(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err(format!("{TIMEOUT_VAR}: timeout must be positive, got \"{raw}\"")),
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

    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&'static str, &str)]) -> Result<HarnessSettings, String> {
        let values: HashMap<&str, String> = pairs.iter().map(|(name, value)| (*name, (*value).to_string())).collect();
        HarnessSettings::from_lookup(|name| Ok(values.get(name).cloned()))
    }

    #[test]
    fn unset_environment_uses_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings, HarnessSettings::default());
        assert_eq!(settings.mesh_url, DEFAULT_MESH_URL);
        assert!(!settings.keeps_output());
    }

    #[test]
    fn run_root_keeps_output() {
        let settings = settings(&[(RUN_ROOT_VAR, "/scratch/runs"), (MESH_URL_VAR, "https://mirror.test/mesh.tar.bz2")])
            .unwrap();
        assert_eq!(settings.run_root, Some(PathBuf::from("/scratch/runs")));
        assert_eq!(settings.mesh_url, "https://mirror.test/mesh.tar.bz2");
        assert!(settings.keeps_output());
    }

    #[test]
    fn timeout_uses_duration_syntax() {
        assert_eq!(settings(&[(TIMEOUT_VAR, "120")]).unwrap().timeout, Some(Duration::from_secs(120)));
        assert_eq!(settings(&[(TIMEOUT_VAR, "0:10:00")]).unwrap().timeout, Some(Duration::from_secs(600)));
        assert!(settings(&[(TIMEOUT_VAR, "0")]).is_err());
        assert!(settings(&[(TIMEOUT_VAR, "soon")]).is_err());
    }

    #[test]
    fn keep_output_flag_values() {
        assert!(settings(&[(KEEP_OUTPUT_VAR, "YES")]).unwrap().keep_output);
        assert!(!settings(&[(KEEP_OUTPUT_VAR, "0")]).unwrap().keep_output);
        let error = settings(&[(KEEP_OUTPUT_VAR, "maybe")]).unwrap_err();
        assert!(error.contains(KEEP_OUTPUT_VAR), "{error}");
    }

    #[test]
    fn blank_values_are_rejected() {
        let error = settings(&[(RUN_ROOT_VAR, "  ")]).unwrap_err();
        assert!(error.contains("blank"), "{error}");
    }

    #[test]
    fn lookup_errors_propagate() {
        let error = HarnessSettings::from_lookup(|name| Err(format!("{name} unreadable"))).unwrap_err();
        assert!(error.contains(RUN_ROOT_VAR));
    }
}
