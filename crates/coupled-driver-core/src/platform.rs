// crates/coupled-driver-core/src/platform.rs
// ============================================================================
// Module: Platform Table
// Description: Static scheduler profiles for supported HPC platforms.
// Purpose: Resolve a platform name to launcher, account and node layout.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Platforms are a closed enumeration backed by an immutable lookup table.
//! The only failure path is an unrecognized name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DriverError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Scheduler parameters of one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Module file sourced at the top of every job script.
    pub source_filename: Option<&'static str>,
    /// Whether scheduler nodes are virtual (tasks are not pinned to hosts).
    pub nodes_are_virtual: bool,
    /// Processors available on a single node.
    pub processors_per_node: u32,
    /// Parallel launcher command (empty for local runs).
    pub launcher: &'static str,
    /// Whether jobs are submitted through SLURM.
    pub uses_slurm: bool,
    /// SLURM account charged for jobs.
    pub slurm_account: Option<&'static str>,
    /// Partition used when none is configured.
    pub default_partition: Option<&'static str>,
}

/// Supported HPC platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    /// NOAA RDHPCS Hera.
    Hera,
    /// TACC Stampede2.
    Stampede2,
    /// MSU Orion.
    Orion,
    /// Local workstation without a scheduler.
    Local,
}

// ============================================================================
// SECTION: Lookup Table
// ============================================================================

/// Profile for Hera.
const HERA: PlatformProfile = PlatformProfile {
    source_filename: Some(
        "/scratch2/COASTAL/coastal/save/shared/repositories/ADC-WW3-NWM-NEMS/modulefiles/envmodules_intel.hera",
    ),
    nodes_are_virtual: true,
    processors_per_node: 40,
    launcher: "srun",
    uses_slurm: true,
    slurm_account: Some("coastal"),
    default_partition: None,
};

/// Profile for Stampede2.
const STAMPEDE2: PlatformProfile = PlatformProfile {
    source_filename: Some(
        "/work/07531/zrb/stampede2/builds/ADC-WW3-NWM-NEMS/modulefiles/envmodules_intel.stampede",
    ),
    nodes_are_virtual: true,
    processors_per_node: 68,
    launcher: "ibrun",
    uses_slurm: true,
    slurm_account: Some("coastal"),
    default_partition: Some("development"),
};

/// Profile for Orion.
const ORION: PlatformProfile = PlatformProfile {
    source_filename: None,
    nodes_are_virtual: true,
    processors_per_node: 40,
    launcher: "srun",
    uses_slurm: true,
    slurm_account: Some("coastal"),
    default_partition: None,
};

/// Profile for local runs.
const LOCAL: PlatformProfile = PlatformProfile {
    source_filename: None,
    nodes_are_virtual: false,
    processors_per_node: 1,
    launcher: "",
    uses_slurm: false,
    slurm_account: None,
    default_partition: None,
};

impl Platform {
    /// All platforms in table order.
    pub const ALL: [Self; 4] = [Self::Hera, Self::Stampede2, Self::Orion, Self::Local];

    /// Returns the static scheduler profile.
    #[must_use]
    pub const fn profile(self) -> &'static PlatformProfile {
        match self {
            Self::Hera => &HERA,
            Self::Stampede2 => &STAMPEDE2,
            Self::Orion => &ORION,
            Self::Local => &LOCAL,
        }
    }

    /// Returns the lowercase name used in generated file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hera => "hera",
            Self::Stampede2 => "stampede2",
            Self::Orion => "orion",
            Self::Local => "local",
        }
    }

    /// Returns the parallel launcher, or `None` when commands run directly.
    #[must_use]
    pub const fn launcher(self) -> Option<&'static str> {
        let launcher = self.profile().launcher;
        if launcher.is_empty() { None } else { Some(launcher) }
    }

    /// Returns the number of nodes needed for `tasks` processes.
    ///
    /// Only platforms with virtual nodes that require an explicit node count
    /// (Stampede2) return a value.
    #[must_use]
    pub const fn nodes_for(self, tasks: u32) -> Option<u32> {
        match self {
            Self::Stampede2 => Some(tasks.div_ceil(self.profile().processors_per_node)),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|platform| platform.name() == normalized).ok_or_else(|| {
            DriverError::UnknownPlatform {
                name: value.to_string(),
                valid: Self::ALL.map(Self::name).join(", "),
            }
        })
    }
}

impl TryFrom<String> for Platform {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.name().to_ascii_uppercase()
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
    fn parses_names_case_insensitively() {
        assert_eq!("HERA".parse::<Platform>().unwrap(), Platform::Hera);
        assert_eq!(" stampede2 ".parse::<Platform>().unwrap(), Platform::Stampede2);
        assert_eq!("Local".parse::<Platform>().unwrap(), Platform::Local);
    }

    #[test]
    fn unknown_platform_lists_valid_names() {
        let error = "frontier".parse::<Platform>().unwrap_err().to_string();
        assert!(error.contains("frontier"));
        assert!(error.contains("hera, stampede2, orion, local"));
    }

    #[test]
    fn stampede_rounds_nodes_up() {
        assert_eq!(Platform::Stampede2.nodes_for(68), Some(1));
        assert_eq!(Platform::Stampede2.nodes_for(69), Some(2));
        assert_eq!(Platform::Hera.nodes_for(600), None);
    }

    #[test]
    fn serializes_as_uppercase_name() {
        let json = serde_json::to_string(&Platform::Stampede2).unwrap();
        assert_eq!(json, "\"STAMPEDE2\"");
        let parsed: Platform = serde_json::from_str("\"hera\"").unwrap();
        assert_eq!(parsed, Platform::Hera);
    }

    #[test]
    fn local_has_no_launcher() {
        assert_eq!(Platform::Local.launcher(), None);
        assert_eq!(Platform::Hera.launcher(), Some("srun"));
        assert!(!Platform::Local.profile().uses_slurm);
    }
}
