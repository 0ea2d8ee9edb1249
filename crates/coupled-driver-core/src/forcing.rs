// crates/coupled-driver-core/src/forcing.rs
// ============================================================================
// Module: Forcing Kinds
// Description: Closed set of external forcings and their defaults.
// Purpose: Validate forcing names before anything is written to disk.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A forcing is tidal, wind (ATMESH, best track, OWI) or wave (WW3DATA).
//! Names are validated up front so an unrecognized forcing aborts the command
//! before any configuration file exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DriverError;
use crate::error::DriverResult;

// ============================================================================
// SECTION: Forcing Kinds
// ============================================================================

/// Physical category of a forcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcingCategory {
    /// Astronomical tides.
    Tidal,
    /// Atmospheric wind and pressure.
    Wind,
    /// Wave radiation stress.
    Wave,
}

/// Supported forcing sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForcingKind {
    /// Tidal potential and boundary forcing.
    Tidal,
    /// Atmospheric mesh (NEMS ATM component).
    Atmesh,
    /// Best track storm parameters.
    BestTrack,
    /// Oceanweather basin and region files.
    Owi,
    /// WaveWatch III data (NEMS WAV component).
    Ww3Data,
}

impl ForcingKind {
    /// All forcing kinds.
    pub const ALL: [Self; 5] = [Self::Tidal, Self::Atmesh, Self::BestTrack, Self::Owi, Self::Ww3Data];

    /// Returns the lowercase name used on the command line and in file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tidal => "tidal",
            Self::Atmesh => "atmesh",
            Self::BestTrack => "besttrack",
            Self::Owi => "owi",
            Self::Ww3Data => "ww3data",
        }
    }

    /// Returns the configuration file name for this forcing.
    #[must_use]
    pub fn configuration_filename(self) -> String {
        match self {
            Self::Tidal => "configure_tidalforcing.json".to_string(),
            other => format!("configure_{}.json", other.name()),
        }
    }

    /// Returns the physical category.
    #[must_use]
    pub const fn category(self) -> ForcingCategory {
        match self {
            Self::Tidal => ForcingCategory::Tidal,
            Self::Atmesh | Self::BestTrack | Self::Owi => ForcingCategory::Wind,
            Self::Ww3Data => ForcingCategory::Wave,
        }
    }

    /// Default ADCIRC `NWS` for wind forcings.
    #[must_use]
    pub const fn default_nws(self) -> Option<i32> {
        match self {
            Self::Atmesh => Some(17),
            Self::BestTrack => Some(20),
            Self::Owi => Some(12),
            Self::Tidal | Self::Ww3Data => None,
        }
    }

    /// Default ADCIRC `NRS` for wave forcings.
    #[must_use]
    pub const fn default_nrs(self) -> Option<i32> {
        match self {
            Self::Ww3Data => Some(5),
            _ => None,
        }
    }

    /// Whether the forcing runs as a NEMS cap (component model).
    #[must_use]
    pub const fn is_nems_cap(self) -> bool {
        matches!(self, Self::Atmesh | Self::Ww3Data)
    }
}

impl fmt::Display for ForcingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ForcingKind {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == normalized).ok_or_else(|| {
            DriverError::UnknownForcing {
                name: value.trim().to_string(),
                valid: Self::ALL.map(Self::name).join(", "),
            }
        })
    }
}

/// Parses a comma-separated forcing list, dropping empty entries and
/// duplicates while preserving order.
///
/// # Errors
///
/// Returns [`DriverError::UnknownForcing`] for the first unrecognized name.
pub fn parse_forcing_list(value: &str) -> DriverResult<Vec<ForcingKind>> {
    let mut kinds = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let kind: ForcingKind = entry.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Combines wind and wave settings into the ADCIRC `NWS` value.
///
/// Wave radiation stress adds 300 to the wind code.
#[must_use]
pub const fn effective_nws(wind_nws: Option<i32>, has_waves: bool) -> i32 {
    let base = match wind_nws {
        Some(nws) => nws,
        None => 0,
    };
    if has_waves { base + 300 } else { base }
}

// ============================================================================
// SECTION: Tidal Options
// ============================================================================

/// Tidal database providing boundary constituents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum TidalSource {
    /// TPXO global inverse model.
    #[default]
    Tpxo,
    /// HAMTIDE.
    Hamtide,
}

impl TidalSource {
    /// Returns the canonical uppercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tpxo => "TPXO",
            Self::Hamtide => "HAMTIDE",
        }
    }
}

impl fmt::Display for TidalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TidalSource {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TPXO" => Ok(Self::Tpxo),
            "HAMTIDE" => Ok(Self::Hamtide),
            _ => Err(DriverError::InvalidValue {
                kind: "tidal source",
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TidalSource {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TidalSource> for String {
    fn from(source: TidalSource) -> Self {
        source.as_str().to_string()
    }
}

/// Which tidal constituents to force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "ConstituentsRepr", into = "ConstituentsRepr")]
pub enum ConstituentSelection {
    /// Every constituent the source provides.
    #[default]
    All,
    /// The eight major constituents.
    Major,
    /// An explicit list of constituent names.
    List(Vec<String>),
}

/// Serialized form of [`ConstituentSelection`]: a keyword or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ConstituentsRepr {
    /// `"all"` / `"major"`.
    Keyword(String),
    /// Explicit names.
    List(Vec<String>),
}

impl TryFrom<ConstituentsRepr> for ConstituentSelection {
    type Error = DriverError;

    fn try_from(value: ConstituentsRepr) -> Result<Self, Self::Error> {
        match value {
            ConstituentsRepr::Keyword(keyword) => keyword.parse(),
            ConstituentsRepr::List(names) => Ok(Self::from_names(&names)),
        }
    }
}

impl From<ConstituentSelection> for ConstituentsRepr {
    fn from(value: ConstituentSelection) -> Self {
        match value {
            ConstituentSelection::All => Self::Keyword("all".to_string()),
            ConstituentSelection::Major => Self::Keyword("major".to_string()),
            ConstituentSelection::List(names) => Self::List(names),
        }
    }
}

impl ConstituentSelection {
    /// Builds a selection from names, recognizing the `all`/`major` keywords.
    #[must_use]
    pub fn from_names(names: &[String]) -> Self {
        let names: Vec<String> =
            names.iter().map(|name| name.trim().to_string()).filter(|name| !name.is_empty()).collect();
        if names.iter().any(|name| name.eq_ignore_ascii_case("all")) {
            return Self::All;
        }
        if names.len() == 1 && names[0].eq_ignore_ascii_case("major") {
            return Self::Major;
        }
        Self::List(names)
    }
}

impl FromStr for ConstituentSelection {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let names: Vec<String> = value.split(',').map(str::to_string).collect();
        let selection = Self::from_names(&names);
        if matches!(&selection, Self::List(names) if names.is_empty()) {
            return Err(DriverError::InvalidValue {
                kind: "tidal constituents",
                value: value.to_string(),
            });
        }
        Ok(selection)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
