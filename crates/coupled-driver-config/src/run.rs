// crates/coupled-driver-config/src/run.rs
// ============================================================================
// Module: Run Configuration
// Description: Aggregate of every configuration file in a directory.
// Purpose: Read, write, relocate and perturb a complete configuration.
// Dependencies: coupled-driver-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`RunConfiguration`] is read from and written to a configuration
//! directory. Paths are absolute in memory; writing may express them relative
//! to the directory so the configuration can be moved. [`RunConfiguration::perturb`]
//! expands named perturbations into one configuration per run.
//! Invariants:
//! - The model driver and ADCIRC files are required.
//! - Data-component forcings (ATMESH, WW3DATA) require NEMS coupling.
//! - Writing never replaces an existing file unless overwriting is enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use coupled_driver_core::DriverError;
use coupled_driver_core::ForcingKind;
use coupled_driver_core::SlurmEmailType;
use coupled_driver_core::adcirc::JobTemplate;
use coupled_driver_core::fs::absolute_from;
use coupled_driver_core::fs::create_dir_all;
use coupled_driver_core::fs::ensure_writable;
use coupled_driver_core::fs::relative_path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::error::ConfigError;
use crate::error::ConfigResult;
use crate::files::ADCIRC_FILENAME;
use crate::files::AdcircJson;
use crate::files::AtmeshForcingJson;
use crate::files::BestTrackForcingJson;
use crate::files::MODELDRIVER_FILENAME;
use crate::files::ModelDriverJson;
use crate::files::NEMS_FILENAME;
use crate::files::NemsJson;
use crate::files::OwiForcingJson;
use crate::files::SLURM_FILENAME;
use crate::files::SlurmJson;
use crate::files::TidalForcingJson;
use crate::files::Ww3DataForcingJson;
use crate::files::apply_overrides;
use crate::files::read_json;
use crate::files::write_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Run name used when there are no perturbations.
pub const UNPERTURBED: &str = "unperturbed";

// ============================================================================
// SECTION: Run Configuration
// ============================================================================

/// Every configuration file of one directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    /// Platform and perturbations.
    pub modeldriver: ModelDriverJson,
    /// Scheduler settings.
    pub slurm: SlurmJson,
    /// ADCIRC settings.
    pub adcirc: AdcircJson,
    /// NEMS coupling; `None` runs ADCIRC standalone.
    pub nems: Option<NemsJson>,
    /// Tidal forcing.
    pub tidal: Option<TidalForcingJson>,
    /// Atmospheric mesh forcing.
    pub atmesh: Option<AtmeshForcingJson>,
    /// Best track forcing.
    pub besttrack: Option<BestTrackForcingJson>,
    /// OWI forcing.
    pub owi: Option<OwiForcingJson>,
    /// WaveWatch III forcing.
    pub ww3data: Option<Ww3DataForcingJson>,
}

impl RunConfiguration {
    /// Configuration with the required files only.
    #[must_use]
    pub const fn new(modeldriver: ModelDriverJson, slurm: SlurmJson, adcirc: AdcircJson) -> Self {
        Self {
            modeldriver,
            slurm,
            adcirc,
            nems: None,
            tidal: None,
            atmesh: None,
            besttrack: None,
            owi: None,
            ww3data: None,
        }
    }

    // ========================================================================
    // SECTION: Reading and Writing
    // ========================================================================

    /// Reads a configuration directory, resolving paths against it.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingInput`] (wrapped) when the model driver
    /// or ADCIRC file is absent, and parse or validation errors otherwise.
    pub fn read_directory(directory: &Path) -> ConfigResult<Self> {
        let modeldriver = read_required(directory, MODELDRIVER_FILENAME, "model driver configuration")?;
        let adcirc = read_required(directory, ADCIRC_FILENAME, "ADCIRC configuration")?;
        let slurm = read_optional(directory, SLURM_FILENAME)?.unwrap_or_default();
        let configuration = Self {
            modeldriver,
            slurm,
            adcirc,
            nems: read_optional(directory, NEMS_FILENAME)?,
            tidal: read_optional(directory, &ForcingKind::Tidal.configuration_filename())?,
            atmesh: read_optional(directory, &ForcingKind::Atmesh.configuration_filename())?,
            besttrack: read_optional(directory, &ForcingKind::BestTrack.configuration_filename())?,
            owi: read_optional(directory, &ForcingKind::Owi.configuration_filename())?,
            ww3data: read_optional(directory, &ForcingKind::Ww3Data.configuration_filename())?,
        };
        let configuration = configuration.absolute(directory);
        configuration.validate()?;
        debug!(directory = %directory.display(), forcings = ?configuration.forcings(), "read configuration");
        Ok(configuration)
    }

    /// Writes every present file into `directory`.
    ///
    /// All targets are checked before anything is written, so a refusal to
    /// overwrite leaves the directory untouched.
    ///
    /// # Errors
    ///
    /// Returns `FileExists` (wrapped) when `overwrite` is false and a target
    /// exists, or I/O failures.
    pub fn write_directory(&self, directory: &Path, overwrite: bool) -> ConfigResult<Vec<PathBuf>> {
        let documents = self.documents()?;
        for (filename, _) in &documents {
            ensure_writable(&directory.join(filename), overwrite)?;
        }
        create_dir_all(directory)?;
        let mut written = Vec::with_capacity(documents.len());
        for (filename, document) in documents {
            let path = directory.join(filename);
            write_json(&path, &document, overwrite)?;
            written.push(path);
        }
        info!(directory = %directory.display(), files = written.len(), "wrote configuration");
        Ok(written)
    }

    /// File name and JSON document of every present file.
    fn documents(&self) -> ConfigResult<Vec<(String, Value)>> {
        let mut documents = vec![
            (MODELDRIVER_FILENAME.to_string(), to_value(&self.modeldriver)?),
            (SLURM_FILENAME.to_string(), to_value(&self.slurm)?),
            (ADCIRC_FILENAME.to_string(), to_value(&self.adcirc)?),
        ];
        if let Some(nems) = &self.nems {
            documents.push((NEMS_FILENAME.to_string(), to_value(nems)?));
        }
        let forcings: [(ForcingKind, Option<Value>); 5] = [
            (ForcingKind::Tidal, self.tidal.as_ref().map(to_value).transpose()?),
            (ForcingKind::Atmesh, self.atmesh.as_ref().map(to_value).transpose()?),
            (ForcingKind::BestTrack, self.besttrack.as_ref().map(to_value).transpose()?),
            (ForcingKind::Owi, self.owi.as_ref().map(to_value).transpose()?),
            (ForcingKind::Ww3Data, self.ww3data.as_ref().map(to_value).transpose()?),
        ];
        for (kind, document) in forcings {
            if let Some(document) = document {
                documents.push((kind.configuration_filename(), document));
            }
        }
        Ok(documents)
    }

    // ========================================================================
    // SECTION: Validation and Queries
    // ========================================================================

    /// Checks cross-file consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> ConfigResult<()> {
        let adcirc = &self.adcirc;
        if adcirc.modeled_end_time <= adcirc.modeled_start_time {
            return Err(ConfigError::Invalid("modeled end time must follow start time".to_string()));
        }
        if adcirc.modeled_timestep <= time::Duration::ZERO {
            return Err(ConfigError::Invalid("modeled timestep must be positive".to_string()));
        }
        if adcirc.processors == 0 {
            return Err(ConfigError::Invalid("ADCIRC processors must be positive".to_string()));
        }
        if let Some(spinup) = adcirc.tidal_spinup_duration
            && spinup <= time::Duration::ZERO
        {
            return Err(ConfigError::Invalid("tidal spinup duration must be positive".to_string()));
        }
        if self.nems.is_none()
            && let Some(kind) = self.forcings().into_iter().find(|kind| kind.is_nems_cap())
        {
            return Err(ConfigError::Invalid(format!("{kind} forcing requires NEMS coupling")));
        }
        if let Some(besttrack) = &self.besttrack
            && besttrack.storm_id.is_none()
            && besttrack.fort22_filename.is_none()
        {
            return Err(ConfigError::Invalid("best track forcing needs a storm id or fort22 file".to_string()));
        }
        let wind_forcings = [self.atmesh.is_some(), self.besttrack.is_some(), self.owi.is_some()];
        if wind_forcings.iter().filter(|present| **present).count() > 1 {
            return Err(ConfigError::Invalid("at most one wind forcing may be configured".to_string()));
        }
        if self.slurm.email_type.is_some_and(|kind| kind != SlurmEmailType::None)
            && self.slurm.email_address.as_deref().is_none_or(|address| address.trim().is_empty())
        {
            return Err(ConfigError::Invalid("email type requires an email address".to_string()));
        }
        Ok(())
    }

    /// Present forcings in canonical order.
    #[must_use]
    pub fn forcings(&self) -> Vec<ForcingKind> {
        let present = [
            (ForcingKind::Tidal, self.tidal.is_some()),
            (ForcingKind::Atmesh, self.atmesh.is_some()),
            (ForcingKind::BestTrack, self.besttrack.is_some()),
            (ForcingKind::Owi, self.owi.is_some()),
            (ForcingKind::Ww3Data, self.ww3data.is_some()),
        ];
        present.into_iter().filter(|(_, present)| *present).map(|(kind, _)| kind).collect()
    }

    /// Wind `NWS` of the configured wind forcing.
    #[must_use]
    pub fn wind_nws(&self) -> Option<i32> {
        self.atmesh
            .as_ref()
            .map(|forcing| forcing.nws)
            .or_else(|| self.besttrack.as_ref().map(|forcing| forcing.nws))
            .or_else(|| self.owi.as_ref().map(|forcing| forcing.nws))
    }

    /// Job template for this configuration's platform.
    #[must_use]
    pub fn job_template(&self) -> JobTemplate {
        self.slurm.job_template(self.modeldriver.platform, self.adcirc.source_filename.clone())
    }

    // ========================================================================
    // SECTION: Path Rewriting
    // ========================================================================

    /// Copy with every path made absolute against `directory`.
    ///
    /// Bare executable names (a single component such as `adcirc`) are
    /// looked up on `PATH` at run time and stay unchanged.
    #[must_use]
    pub fn absolute(&self, directory: &Path) -> Self {
        self.map_paths(&|path| absolute_from(path, directory), &|path| {
            if is_bare_command(path) { path.to_path_buf() } else { absolute_from(path, directory) }
        })
    }

    /// Copy with every absolute path expressed relative to `directory`.
    #[must_use]
    pub fn relative_to(&self, directory: &Path) -> Self {
        let rewrite = |path: &Path| {
            if path.is_absolute() { relative_path(path, directory) } else { path.to_path_buf() }
        };
        self.map_paths(&rewrite, &rewrite)
    }

    /// Applies `files` to data paths and `executables` to executable paths.
    fn map_paths(&self, files: &dyn Fn(&Path) -> PathBuf, executables: &dyn Fn(&Path) -> PathBuf) -> Self {
        let mut copy = self.clone();
        let map = |path: &mut PathBuf| *path = files(path.as_path());
        let map_option = |path: &mut Option<PathBuf>| {
            if let Some(path) = path {
                *path = files(path.as_path());
            }
        };

        let adcirc = &mut copy.adcirc;
        adcirc.adcirc_executable_path = executables(&adcirc.adcirc_executable_path);
        adcirc.adcprep_executable_path = executables(&adcirc.adcprep_executable_path);
        if let Some(aswip) = &mut adcirc.aswip_executable_path {
            *aswip = executables(aswip);
        }
        map(&mut adcirc.fort_14_path);
        map_option(&mut adcirc.fort_13_path);
        map_option(&mut adcirc.stations_file_path);
        map_option(&mut adcirc.source_filename);
        map_option(&mut copy.slurm.run_directory);
        if let Some(nems) = &mut copy.nems {
            nems.executable_path = executables(&nems.executable_path);
        }
        if let Some(tidal) = &mut copy.tidal {
            map_option(&mut tidal.resource);
        }
        if let Some(atmesh) = &mut copy.atmesh {
            map_option(&mut atmesh.resource);
        }
        if let Some(besttrack) = &mut copy.besttrack {
            map_option(&mut besttrack.fort22_filename);
        }
        if let Some(owi) = &mut copy.owi {
            map_option(&mut owi.resource);
        }
        if let Some(ww3data) = &mut copy.ww3data {
            map_option(&mut ww3data.resource);
        }
        copy
    }

    // ========================================================================
    // SECTION: Perturbations
    // ========================================================================

    /// Expands perturbations into one configuration per run name.
    ///
    /// Without perturbations the single run is named `unperturbed`. Keys of
    /// the `adcirc` section that are not configuration fields become uniform
    /// nodal attribute values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown sections, unknown keys,
    /// perturbations of absent forcings, or values of the wrong type.
    pub fn perturb(&self) -> ConfigResult<BTreeMap<String, Self>> {
        let mut runs = BTreeMap::new();
        if self.modeldriver.perturbations.is_empty() {
            runs.insert(UNPERTURBED.to_string(), self.unperturbed());
            return Ok(runs);
        }
        for (name, perturbation) in &self.modeldriver.perturbations {
            validate_run_name(name)?;
            let mut run = self.unperturbed();
            for (section, overrides) in perturbation {
                run.apply_section(name, section, overrides)?;
            }
            run.validate()?;
            runs.insert(name.clone(), run);
        }
        Ok(runs)
    }

    /// Copy without perturbations.
    fn unperturbed(&self) -> Self {
        let mut copy = self.clone();
        copy.modeldriver.perturbations.clear();
        copy
    }

    /// Applies one section of a perturbation.
    fn apply_section(&mut self, run: &str, section: &str, overrides: &BTreeMap<String, Value>) -> ConfigResult<()> {
        match section {
            "adcirc" => {
                let (mut adcirc, unknown) = apply_overrides(&self.adcirc, section, overrides)?;
                for (key, value) in unknown {
                    let value = value.as_f64().ok_or_else(|| {
                        ConfigError::Invalid(format!("nodal attribute \"{key}\" of run \"{run}\" must be a number"))
                    })?;
                    adcirc.nodal_attributes.insert(key, value);
                }
                self.adcirc = adcirc;
            }
            "slurm" => self.slurm = apply_known(&self.slurm, section, overrides)?,
            "nems" => self.nems = Some(apply_known(present(self.nems.as_ref(), section)?, section, overrides)?),
            "tidalforcing" | "tidal" => {
                self.tidal = Some(apply_known(present(self.tidal.as_ref(), section)?, section, overrides)?);
            }
            "atmesh" => {
                self.atmesh = Some(apply_known(present(self.atmesh.as_ref(), section)?, section, overrides)?);
            }
            "besttrack" => {
                self.besttrack = Some(apply_known(present(self.besttrack.as_ref(), section)?, section, overrides)?);
            }
            "owi" => self.owi = Some(apply_known(present(self.owi.as_ref(), section)?, section, overrides)?),
            "ww3data" => {
                self.ww3data = Some(apply_known(present(self.ww3data.as_ref(), section)?, section, overrides)?);
            }
            other => {
                return Err(ConfigError::Invalid(format!("unknown perturbation section \"{other}\" in run \"{run}\"")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a file model.
fn to_value<T: Serialize>(value: &T) -> ConfigResult<Value> {
    serde_json::to_value(value).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Reads a required file.
fn read_required<T: DeserializeOwned>(directory: &Path, filename: &str, kind: &'static str) -> ConfigResult<T> {
    let path = directory.join(filename);
    if !path.is_file() {
        return Err(DriverError::MissingInput { kind, path }.into());
    }
    read_json(&path)
}

/// Reads an optional file.
fn read_optional<T: DeserializeOwned>(directory: &Path, filename: &str) -> ConfigResult<Option<T>> {
    let path = directory.join(filename);
    if path.is_file() { read_json(&path).map(Some) } else { Ok(None) }
}

/// Applies overrides that must all be known fields.
fn apply_known<T: Serialize + DeserializeOwned>(
    value: &T,
    section: &str,
    overrides: &BTreeMap<String, Value>,
) -> ConfigResult<T> {
    let (updated, unknown) = apply_overrides(value, section, overrides)?;
    if let Some(key) = unknown.keys().next() {
        return Err(ConfigError::Invalid(format!("unknown key \"{key}\" in perturbation section \"{section}\"")));
    }
    Ok(updated)
}

/// Requires a forcing section to exist before perturbing it.
fn present<'a, T>(value: Option<&'a T>, section: &str) -> ConfigResult<&'a T> {
    value.ok_or_else(|| ConfigError::Invalid(format!("perturbation of unconfigured section \"{section}\"")))
}

/// Run names become directory names and job name suffixes.
fn validate_run_name(name: &str) -> ConfigResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid { Ok(()) } else { Err(ConfigError::Invalid(format!("invalid run name \"{name}\""))) }
}

/// Whether `path` is a bare command name.
fn is_bare_command(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute() && !path.starts_with(".")
}
