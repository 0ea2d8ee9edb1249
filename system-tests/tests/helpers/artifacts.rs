// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Working directory helpers for system-tests.
// Purpose: Create per-test run roots that survive only when asked to.
// Dependencies: system-tests, tempfile
// ============================================================================

//! ## Overview
//! Each test gets its own root directory. Kept roots are recreated empty so
//! stale files from an earlier run cannot satisfy a reference comparison.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use system_tests::harness::HarnessSettings;
use tempfile::TempDir;

fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

fn default_run_root(test_name: &str) -> PathBuf {
    let stamp = now_millis();
    PathBuf::from("target/system-tests").join(format!("run_{stamp}")).join(test_name)
}

/// Working directory of a single system-test.
#[derive(Debug)]
pub struct TestArtifacts {
    root: PathBuf,
    temporary: Option<TempDir>,
}

impl TestArtifacts {
    /// Creates the run root for a test.
    ///
    /// A configured run root or the keep-output flag keeps the tree on disk;
    /// otherwise a temporary directory is removed on drop.
    pub fn new(test_name: &str) -> Result<Self, String> {
        let settings = HarnessSettings::from_env()?;
        let kept = match settings.run_root {
            Some(root) => Some(root.join(test_name)),
            None if settings.keep_output => Some(default_run_root(test_name)),
            None => None,
        };
        if let Some(root) = kept {
            if root.exists() {
                fs::remove_dir_all(&root).map_err(|err| format!("{}: {err}", root.display()))?;
            }
            fs::create_dir_all(&root).map_err(|err| format!("{}: {err}", root.display()))?;
            let root = fs::canonicalize(&root).map_err(|err| format!("{}: {err}", root.display()))?;
            return Ok(Self {
                root,
                temporary: None,
            });
        }
        let temporary = tempfile::tempdir().map_err(|err| err.to_string())?;
        Ok(Self {
            root: temporary.path().to_path_buf(),
            temporary: Some(temporary),
        })
    }

    /// Returns the root directory for the test.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `name` below the root.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether the tree is removed when the test ends.
    pub const fn is_temporary(&self) -> bool {
        self.temporary.is_some()
    }
}
