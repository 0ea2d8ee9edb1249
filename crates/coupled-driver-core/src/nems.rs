// crates/coupled-driver-core/src/nems.rs
// ============================================================================
// Module: NEMS Configuration
// Description: Coupled modeling system description and its run files.
// Purpose: Render `nems.configure`, `model_configure` and `config.rc`.
// Dependencies: serde, time, tracing
// ============================================================================

//! ## Overview
//! A [`ModelingSystem`] lists the coupled components (atmosphere, waves,
//! ocean, hydrology), the connections between them and the run sequence
//! executed every coupling interval. Components receive consecutive ranges of
//! processors in component order.
//!
//! ## Invariants
//! - Components are ordered ATM, WAV, OCN, HYD regardless of insertion order.
//! - Every connection and sequence entry names a present component.

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
use time::PrimitiveDateTime;
use tracing::debug;

use crate::error::DriverError;
use crate::error::DriverResult;
use crate::fs::create_symlink;
use crate::fs::ensure_writable;
use crate::fs::posix;
use crate::fs::write_text;
use crate::timeutil::serde_datetime;
use crate::timeutil::serde_duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Coupling configuration file name.
pub const NEMS_CONFIGURE: &str = "nems.configure";
/// Model run window file name.
pub const MODEL_CONFIGURE: &str = "model_configure";
/// Component data file listing.
pub const CONFIG_RC: &str = "config.rc";
/// Legacy alias of `model_configure`.
pub const ATM_NAMELIST_RC: &str = "atm_namelist.rc";

/// Width of the key column in `model_configure`.
const KEY_WIDTH: usize = 25;

// ============================================================================
// SECTION: Model Types
// ============================================================================

/// Component slot in the coupled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelType {
    /// Atmosphere.
    Atm,
    /// Waves.
    Wav,
    /// Ocean.
    Ocn,
    /// Hydrology.
    Hyd,
}

impl ModelType {
    /// All component slots in run order.
    pub const ALL: [Self; 4] = [Self::Atm, Self::Wav, Self::Ocn, Self::Hyd];

    /// Returns the uppercase component label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atm => "ATM",
            Self::Wav => "WAV",
            Self::Ocn => "OCN",
            Self::Hyd => "HYD",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized).ok_or_else(|| {
            DriverError::InvalidValue {
                kind: "model type",
                value: value.to_string(),
            }
        })
    }
}

impl TryFrom<String> for ModelType {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelType> for String {
    fn from(kind: ModelType) -> Self {
        kind.as_str().to_string()
    }
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// One coupled component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Component slot.
    pub model_type: ModelType,
    /// Cap name (`atmesh`, `ww3data`, `adcirc`, `nwm`).
    pub name: String,
    /// Processors assigned to the component.
    pub processors: u32,
    /// Data file read by data caps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,
    /// Attributes written to the component block.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<(String, String)>,
}

/// Default component attributes.
fn default_attributes() -> Vec<(String, String)> {
    vec![("Verbosity".to_string(), "off".to_string())]
}

impl ModelEntry {
    /// Creates an entry with default attributes.
    #[must_use]
    pub fn new(model_type: ModelType, name: impl Into<String>, processors: u32) -> Self {
        Self {
            model_type,
            name: name.into(),
            processors,
            filename: None,
            attributes: default_attributes(),
        }
    }

    /// ADCIRC ocean component.
    #[must_use]
    pub fn adcirc(processors: u32) -> Self {
        Self::new(ModelType::Ocn, "adcirc", processors)
    }

    /// Atmospheric mesh data component.
    #[must_use]
    pub fn atmesh(filename: impl Into<PathBuf>, processors: u32) -> Self {
        let mut entry = Self::new(ModelType::Atm, "atmesh", processors);
        entry.filename = Some(filename.into());
        entry
    }

    /// WaveWatch III data component.
    #[must_use]
    pub fn ww3data(filename: impl Into<PathBuf>, processors: u32) -> Self {
        let mut entry = Self::new(ModelType::Wav, "ww3data", processors);
        entry.filename = Some(filename.into());
        entry
    }
}

/// Regridding method of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemapMethod {
    /// Redistribution between identical meshes.
    #[default]
    Redist,
    /// Bilinear interpolation.
    Bilinear,
    /// Patch recovery.
    Patch,
    /// Nearest source to destination.
    Nearest,
}

impl RemapMethod {
    /// Returns the ESMF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redist => "redist",
            Self::Bilinear => "bilinear",
            Self::Patch => "patch",
            Self::Nearest => "nearest",
        }
    }
}

/// Field exchange from one component to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Exporting component.
    pub source: ModelType,
    /// Importing component.
    pub target: ModelType,
    /// Regridding method.
    #[serde(default)]
    pub method: RemapMethod,
}

impl Connection {
    /// Creates a redistributing connection.
    #[must_use]
    pub const fn new(source: ModelType, target: ModelType) -> Self {
        Self {
            source,
            target,
            method: RemapMethod::Redist,
        }
    }

    /// Label used in run sequences (`ATM -> OCN`).
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}

// ============================================================================
// SECTION: Modeling System
// ============================================================================

/// Coupled modeling system over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelingSystem {
    /// Start of the modeled window.
    #[serde(with = "serde_datetime")]
    pub start_time: PrimitiveDateTime,
    /// End of the modeled window.
    #[serde(with = "serde_datetime")]
    pub end_time: PrimitiveDateTime,
    /// Coupling interval.
    #[serde(with = "serde_duration")]
    pub interval: Duration,
    /// Components, kept in slot order.
    pub models: Vec<ModelEntry>,
    /// Connections between components.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Run sequence entries; empty means connections then components.
    #[serde(default)]
    pub sequence: Vec<String>,
}

impl ModelingSystem {
    /// Creates a system and sorts components into slot order.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] when the window is empty, the interval
    /// is not positive, or a slot is used twice.
    pub fn new(
        start_time: PrimitiveDateTime,
        end_time: PrimitiveDateTime,
        interval: Duration,
        mut models: Vec<ModelEntry>,
    ) -> DriverResult<Self> {
        models.sort_by_key(|entry| entry.model_type);
        let system = Self {
            start_time,
            end_time,
            interval,
            models,
            connections: Vec::new(),
            sequence: Vec::new(),
        };
        system.validate()?;
        Ok(system)
    }

    /// Checks window, interval, slots, connections and sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] describing the first problem.
    pub fn validate(&self) -> DriverResult<()> {
        if self.end_time <= self.start_time {
            return Err(DriverError::Invalid("NEMS end time must follow start time".to_string()));
        }
        if self.interval <= Duration::ZERO {
            return Err(DriverError::Invalid("NEMS interval must be positive".to_string()));
        }
        for (index, entry) in self.models.iter().enumerate() {
            if self.models[..index].iter().any(|other| other.model_type == entry.model_type) {
                return Err(DriverError::Invalid(format!("duplicate {} component", entry.model_type)));
            }
        }
        for connection in &self.connections {
            self.require(connection.source)?;
            self.require(connection.target)?;
        }
        for entry in &self.sequence {
            self.sequence_line(entry)?;
        }
        Ok(())
    }

    /// Fails when `model_type` has no component.
    fn require(&self, model_type: ModelType) -> DriverResult<&ModelEntry> {
        self.get(model_type).ok_or_else(|| {
            DriverError::Invalid(format!("no {model_type} component in modeling system"))
        })
    }

    /// Returns the component in `model_type`, if any.
    #[must_use]
    pub fn get(&self, model_type: ModelType) -> Option<&ModelEntry> {
        self.models.iter().find(|entry| entry.model_type == model_type)
    }

    /// Adds a connection between two present components.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] when either side is missing.
    pub fn connect(&mut self, source: ModelType, target: ModelType) -> DriverResult<()> {
        self.require(source)?;
        self.require(target)?;
        let connection = Connection::new(source, target);
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
        Ok(())
    }

    /// Replaces the run sequence after validating each entry.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] for entries naming missing components.
    pub fn set_sequence(&mut self, sequence: Vec<String>) -> DriverResult<()> {
        for entry in &sequence {
            self.sequence_line(entry)?;
        }
        self.sequence = sequence;
        Ok(())
    }

    /// Total processors across components.
    #[must_use]
    pub fn processors(&self) -> u32 {
        self.models.iter().map(|entry| entry.processors).sum()
    }

    /// Whole hours in the modeled window.
    #[must_use]
    pub fn forecast_hours(&self) -> i64 {
        (self.end_time - self.start_time).whole_hours()
    }

    /// Ocean-only system covering `[start - duration, start]`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] when there is no ocean component or
    /// the duration is not positive.
    pub fn spinup(&self, duration: Duration) -> DriverResult<Self> {
        let ocean = self.require(ModelType::Ocn)?.clone();
        if duration <= Duration::ZERO {
            return Err(DriverError::Invalid("spinup duration must be positive".to_string()));
        }
        Self::new(self.start_time - duration, self.start_time, self.interval, vec![ocean])
    }

    /// Renders one run-sequence entry.
    fn sequence_line(&self, entry: &str) -> DriverResult<String> {
        if let Some((source, target)) = entry.split_once("->") {
            let source: ModelType = source.parse()?;
            let target: ModelType = target.parse()?;
            let method = self
                .connections
                .iter()
                .find(|connection| connection.source == source && connection.target == target)
                .map_or(RemapMethod::Redist, |connection| connection.method);
            self.require(source)?;
            self.require(target)?;
            return Ok(format!("{source} -> {target}   :remapMethod={}", method.as_str()));
        }
        let model_type: ModelType = entry.parse()?;
        self.require(model_type)?;
        Ok(model_type.to_string())
    }

    /// Effective run sequence.
    fn effective_sequence(&self) -> Vec<String> {
        if !self.sequence.is_empty() {
            return self.sequence.clone();
        }
        self.connections
            .iter()
            .map(Connection::label)
            .chain(self.models.iter().map(|entry| entry.model_type.to_string()))
            .collect()
    }

    /// Renders `nems.configure`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] for inconsistent sequences.
    pub fn render_nems_configure(&self, header: &str) -> DriverResult<String> {
        let component_list: Vec<&str> =
            self.models.iter().map(|entry| entry.model_type.as_str()).collect();
        let mut lines = vec![
            format!("# `{NEMS_CONFIGURE}` generated with {header}"),
            "# EARTH #".to_string(),
            format!("EARTH_component_list: {}", component_list.join(" ")),
            "EARTH_attributes::".to_string(),
            "  Verbosity = off".to_string(),
            "::".to_string(),
        ];
        let mut next_processor = 0_u32;
        for entry in &self.models {
            let first = next_processor;
            let last = first + entry.processors.saturating_sub(1);
            next_processor = first + entry.processors;
            let label = entry.model_type.as_str();
            lines.push(String::new());
            lines.push(format!("# {label} #"));
            lines.push(format!("{:<32}{}", format!("{label}_model:"), entry.name));
            lines.push(format!("{:<32}{first} {last}", format!("{label}_petlist_bounds:")));
            lines.push(format!("{label}_attributes::"));
            for (key, value) in &entry.attributes {
                lines.push(format!("  {key} = {value}"));
            }
            lines.push("::".to_string());
        }
        lines.push(String::new());
        lines.push("# Run Sequence #".to_string());
        lines.push("runSeq::".to_string());
        lines.push(format!("  @{}", self.interval.whole_seconds()));
        for entry in self.effective_sequence() {
            lines.push(format!("    {}", self.sequence_line(&entry)?));
        }
        lines.push("  @".to_string());
        lines.push("::".to_string());
        Ok(lines.join("\n"))
    }

    /// Renders `model_configure`.
    #[must_use]
    pub fn render_model_configure(&self, header: &str) -> String {
        let start = self.start_time;
        let entries: [(&str, String); 14] = [
            ("total_member:", "1".to_string()),
            ("print_esmf:", ".true.".to_string()),
            ("namelist:", "atm_namelist".to_string()),
            ("PE_MEMBER01:", self.processors().to_string()),
            ("start_year:", start.year().to_string()),
            ("start_month:", u8::from(start.month()).to_string()),
            ("start_day:", start.day().to_string()),
            ("start_hour:", start.hour().to_string()),
            ("start_minute:", start.minute().to_string()),
            ("start_second:", start.second().to_string()),
            ("nhours_fcst:", self.forecast_hours().to_string()),
            ("RUN_CONTINUE:", ".false.".to_string()),
            ("ENS_SPS:", ".false.".to_string()),
            ("print_inline:", ".false.".to_string()),
        ];
        let mut lines = vec![format!("# `{MODEL_CONFIGURE}` generated with {header}")];
        lines.extend(entries.iter().map(|(key, value)| format!("{key:<KEY_WIDTH$}{value}")));
        lines.join("\n")
    }

    /// Renders `config.rc` listing data-component files.
    #[must_use]
    pub fn render_config_rc(&self, header: &str) -> String {
        let mut lines = vec![format!("# `{CONFIG_RC}` generated with {header}")];
        for entry in &self.models {
            let Some(filename) = &entry.filename else {
                continue;
            };
            let prefix = entry.model_type.as_str().to_ascii_lowercase();
            let directory = filename.parent().map_or_else(|| ".".to_string(), posix);
            let directory = if directory.is_empty() { ".".to_string() } else { directory };
            let name = filename.file_name().map_or_else(String::new, |name| name.to_string_lossy().into_owned());
            lines.push(format!(" {prefix}_dir: {directory}"));
            lines.push(format!(" {prefix}_nam: {name}"));
        }
        lines.join("\n")
    }

    /// Writes the NEMS run files into `directory` and links
    /// `atm_namelist.rc` to `model_configure`.
    ///
    /// # Errors
    ///
    /// Returns render or write failures.
    pub fn write(&self, directory: &Path, header: &str, overwrite: bool) -> DriverResult<Vec<PathBuf>> {
        let nems_configure = directory.join(NEMS_CONFIGURE);
        let model_configure = directory.join(MODEL_CONFIGURE);
        let config_rc = directory.join(CONFIG_RC);
        let atm_namelist = directory.join(ATM_NAMELIST_RC);

        write_text(&nems_configure, &format!("{}\n", self.render_nems_configure(header)?), overwrite)?;
        write_text(&model_configure, &format!("{}\n", self.render_model_configure(header)), overwrite)?;
        write_text(&config_rc, &format!("{}\n", self.render_config_rc(header)), overwrite)?;
        ensure_writable(&atm_namelist, overwrite)?;
        create_symlink(&model_configure, &atm_namelist, true)?;
        debug!(directory = %directory.display(), "wrote NEMS configuration");
        Ok(vec![nems_configure, model_configure, config_rc, atm_namelist])
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
