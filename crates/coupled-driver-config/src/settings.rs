// crates/coupled-driver-config/src/settings.rs
// ============================================================================
// Module: Driver Settings
// Description: Optional TOML settings file with per-platform overrides.
// Purpose: Supply site defaults to `initialize` without repeating flags.
// Dependencies: coupled-driver-core, serde, toml
// ============================================================================

//! ## Overview
//! Settings are loaded from `coupled-driver.toml`, a path given on the command
//! line, or the path in `COUPLED_DRIVER_CONFIG`. Files are bounded in size and
//! must be UTF-8. Platform sections are keyed by platform name.
//!
//! ```toml
//! [defaults]
//! job_duration = "06:00:00"
//! adcirc_processors = 40
//!
//! [platforms.hera]
//! account = "coastal"
//! modulefile = "/path/to/envmodules_intel.hera"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_core::Platform;
use coupled_driver_core::SlurmEmailType;
use coupled_driver_core::timeutil::serde_duration_option;
use serde::Deserialize;
use serde::Serialize;
use time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::error::ConfigResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default settings filename when no path is specified.
pub const DEFAULT_SETTINGS_NAME: &str = "coupled-driver.toml";
/// Environment variable used to override the settings path.
pub const SETTINGS_ENV_VAR: &str = "COUPLED_DRIVER_CONFIG";
/// Maximum settings file size in bytes.
pub(crate) const MAX_SETTINGS_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Settings Model
// ============================================================================

/// Site settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverSettings {
    /// Defaults applied when flags are omitted.
    #[serde(default)]
    pub defaults: DefaultSettings,
    /// Overrides keyed by platform name.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformSettings>,
}

/// Defaults applied when flags are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSettings {
    /// Platform used when `--platform` is omitted.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Job wall-clock limit.
    #[serde(default, with = "serde_duration_option")]
    pub job_duration: Option<Duration>,
    /// ADCIRC processor count.
    #[serde(default)]
    pub adcirc_processors: Option<u32>,
    /// Notification address.
    #[serde(default)]
    pub email_address: Option<String>,
    /// Notification events.
    #[serde(default)]
    pub email_type: Option<SlurmEmailType>,
}

/// Per-platform overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSettings {
    /// SLURM account.
    #[serde(default)]
    pub account: Option<String>,
    /// SLURM partition.
    #[serde(default)]
    pub partition: Option<String>,
    /// Module file sourced by jobs.
    #[serde(default)]
    pub modulefile: Option<PathBuf>,
}

impl DriverSettings {
    /// Loads settings from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let settings: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        settings.validate()?;
        debug!(path = %resolved.display(), "loaded settings");
        Ok(settings)
    }

    /// Loads settings when a file is named or present, defaults otherwise.
    ///
    /// An explicit path or `COUPLED_DRIVER_CONFIG` must exist; only the
    /// implicit `coupled-driver.toml` may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named file fails to load.
    pub fn load_optional(path: Option<&Path>) -> ConfigResult<Self> {
        if path.is_none() && env::var_os(SETTINGS_ENV_VAR).is_none() && !Path::new(DEFAULT_SETTINGS_NAME).exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validates the settings for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.defaults.adcirc_processors == Some(0) {
            return Err(ConfigError::Invalid("defaults.adcirc_processors must be positive".to_string()));
        }
        if let Some(duration) = self.defaults.job_duration
            && duration <= Duration::ZERO
        {
            return Err(ConfigError::Invalid("defaults.job_duration must be positive".to_string()));
        }
        if let Some(address) = &self.defaults.email_address
            && address.trim().is_empty()
        {
            return Err(ConfigError::Invalid("defaults.email_address must be non-empty".to_string()));
        }
        for (name, platform) in &self.platforms {
            name.parse::<Platform>().map_err(|err| ConfigError::Invalid(err.to_string()))?;
            if let Some(modulefile) = &platform.modulefile {
                validate_path_string(&format!("platforms.{name}.modulefile"), &modulefile.to_string_lossy())?;
            }
        }
        Ok(())
    }

    /// Overrides for `platform`, if configured.
    #[must_use]
    pub fn platform(&self, platform: Platform) -> Option<&PlatformSettings> {
        self.platforms.iter().find(|(name, _)| name.eq_ignore_ascii_case(platform.name())).map(|(_, value)| value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the settings path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(SETTINGS_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_SETTINGS_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> ConfigResult<()> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> ConfigResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
