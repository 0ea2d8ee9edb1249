// crates/coupled-driver-core/src/adcirc/fort15.rs
// ============================================================================
// Module: Model Parameter File
// Description: `fort.15` rendering for coldstart and hotstart phases.
// Purpose: Translate run parameters into the ADCIRC control namelist.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every line is `value ! NAME` padded to a fixed column. The coldstart phase
//! ramps tidal forcing over the spinup window and writes a hotstart file at
//! its end; the hotstart phase resumes from that file and produces output.
//! Boundary tidal forcing is written with zero constituents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use time::Duration;
use time::PrimitiveDateTime;

use crate::adcirc::attributes::NodalAttributes;
use crate::adcirc::attributes::TAU0_ATTRIBUTE;
use crate::adcirc::mesh::Mesh;
use crate::adcirc::tides::Constituent;
use crate::adcirc::tides::tidal_terms;
use crate::error::DriverError;
use crate::error::DriverResult;
use crate::fs::read_text;
use crate::fs::write_text;
use crate::timeutil::format_datetime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional parameter file name.
pub const FORT15: &str = "fort.15";

/// Column where the `!` comment starts.
const COMMENT_COLUMN: usize = 40;

/// Interval between global surface outputs.
pub const SURFACE_OUTPUT_INTERVAL: Duration = Duration::hours(1);
/// Interval between station outputs.
pub const STATION_OUTPUT_INTERVAL: Duration = Duration::minutes(6);

/// Hotstart file format: netCDF `fort.67.nc` / `fort.68.nc`.
const NETCDF_HOTSTART: i32 = 5;
/// `IHOT` value reading `fort.67.nc`.
const IHOT_NETCDF: i32 = 567;
/// netCDF output format code.
const NETCDF_OUTPUT: i32 = -5;

// ============================================================================
// SECTION: GWCE Scheme
// ============================================================================

/// Generalized wave continuity equation solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GwceScheme {
    /// Explicit mass matrix.
    #[default]
    Explicit,
    /// Consistent mass matrix, implicit.
    SemiImplicit,
    /// Legacy three-level implicit scheme.
    SemiImplicitLegacy,
}

impl GwceScheme {
    /// Returns the configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::SemiImplicit => "semi-implicit",
            Self::SemiImplicitLegacy => "semi-implicit-legacy",
        }
    }

    /// ADCIRC `IM` code, with the Smagorinsky lateral viscosity flag.
    #[must_use]
    pub const fn im(self, smagorinsky: bool) -> u32 {
        let lateral = if smagorinsky { 5 } else { 1 };
        let solver = match self {
            Self::SemiImplicitLegacy => 1,
            Self::Explicit => 2,
            Self::SemiImplicit => 3,
        };
        lateral * 100_000 + 11_110 + solver
    }

    /// Time weighting factors `A00 B00 C00`.
    #[must_use]
    pub const fn weights(self) -> &'static str {
        match self {
            Self::SemiImplicitLegacy => "0.35 0.3 0.35",
            Self::Explicit => "0 1 0",
            Self::SemiImplicit => "0.5 0.5 0",
        }
    }
}

impl fmt::Display for GwceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GwceScheme {
    type Err = DriverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "explicit" => Ok(Self::Explicit),
            "semi-implicit" => Ok(Self::SemiImplicit),
            "semi-implicit-legacy" => Ok(Self::SemiImplicitLegacy),
            _ => Err(DriverError::InvalidValue {
                kind: "GWCE solution scheme",
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for GwceScheme {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GwceScheme> for String {
    fn from(scheme: GwceScheme) -> Self {
        scheme.as_str().to_string()
    }
}

// ============================================================================
// SECTION: Stations
// ============================================================================

/// Output station.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
    /// Optional label.
    pub name: Option<String>,
}

/// Reads a stations file: `x y [name]` per line, `#` comments allowed.
///
/// # Errors
///
/// Returns [`DriverError::MissingInput`] when absent and
/// [`DriverError::Parse`] on malformed lines.
pub fn read_stations(path: &Path) -> DriverResult<Vec<Station>> {
    if !path.is_file() {
        return Err(DriverError::MissingInput {
            kind: "stations file",
            path: path.to_path_buf(),
        });
    }
    let text = read_text(path)?;
    parse_stations(&text).map_err(|message| DriverError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses stations text.
///
/// # Errors
///
/// Returns the first malformed line.
pub fn parse_stations(text: &str) -> Result<Vec<Station>, String> {
    let mut stations = Vec::new();
    for line in text.lines() {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let mut fields = content.split_whitespace();
        let mut coordinate = || -> Result<f64, String> {
            let field = fields.next().ok_or_else(|| format!("expected coordinates in \"{line}\""))?;
            field.parse().map_err(|_| format!("invalid coordinate \"{field}\""))
        };
        let x = coordinate()?;
        let y = coordinate()?;
        let rest: Vec<&str> = fields.collect();
        let name = if rest.is_empty() { None } else { Some(rest.join(" ")) };
        stations.push(Station { x, y, name });
    }
    Ok(stations)
}

// ============================================================================
// SECTION: Parameter File
// ============================================================================

/// Simulation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Starts from rest.
    Coldstart,
    /// Resumes from a spinup hotstart file.
    Hotstart,
}

impl RunPhase {
    /// Uppercase label used in job names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Coldstart => "COLDSTART",
            Self::Hotstart => "HOTSTART",
        }
    }
}

/// Wind or wave forcing timing for `fort.15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteorologicalForcing {
    /// ADCIRC `NWS`, including the +300 wave offset.
    pub nws: i32,
    /// Wind input interval (`WTIMINC`).
    pub wind_interval: Duration,
    /// Wave input interval (`RSTIMINC`) when waves are coupled.
    pub wave_interval: Option<Duration>,
    /// First record time of best track input.
    pub best_track_start: Option<PrimitiveDateTime>,
}

/// Inputs for one `fort.15`.
#[derive(Debug, Clone)]
pub struct Fort15<'a> {
    /// Run description (`RUNDES`).
    pub description: String,
    /// Run identifier (`RUNID`).
    pub run_id: String,
    /// Mesh the run uses.
    pub mesh: &'a Mesh,
    /// Nodal attributes activated by the run.
    pub attributes: &'a NodalAttributes,
    /// Phase written.
    pub phase: RunPhase,
    /// Coldstart reference time (`BASE_DATE`).
    pub coldstart_time: PrimitiveDateTime,
    /// End of this phase.
    pub end_time: PrimitiveDateTime,
    /// Model timestep.
    pub timestep: Duration,
    /// Forcing ramp duration.
    pub ramp: Duration,
    /// GWCE solver.
    pub gwce: GwceScheme,
    /// Smagorinsky lateral viscosity.
    pub smagorinsky: bool,
    /// Tidal potential constituents.
    pub constituents: Vec<&'static Constituent>,
    /// Wind and wave forcing.
    pub meteorological: Option<MeteorologicalForcing>,
    /// Output stations.
    pub stations: &'a [Station],
    /// Write global elevation and velocity.
    pub write_surface_output: bool,
    /// Write station elevation and velocity.
    pub write_station_output: bool,
    /// Start of output (usually the modeled start time).
    pub output_start: PrimitiveDateTime,
}

impl Fort15<'_> {
    /// Days from coldstart to `time`.
    fn days_since_coldstart(&self, time: PrimitiveDateTime) -> f64 {
        (time - self.coldstart_time).as_seconds_f64() / 86_400.0
    }

    /// Timesteps per `interval`, at least one.
    fn steps(&self, interval: Duration) -> i64 {
        let step = self.timestep.as_seconds_f64();
        if step <= 0.0 {
            return 1;
        }
        #[allow(clippy::cast_possible_truncation, reason = "Step counts fit in i64.")]
        let steps = (interval.as_seconds_f64() / step).round() as i64;
        steps.max(1)
    }

    /// Renders the file with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Invalid`] when the window or timestep is empty.
    pub fn render(&self) -> DriverResult<String> {
        if self.timestep <= Duration::ZERO {
            return Err(DriverError::Invalid("ADCIRC timestep must be positive".to_string()));
        }
        if self.end_time <= self.coldstart_time {
            return Err(DriverError::Invalid("ADCIRC run must end after coldstart".to_string()));
        }

        let mut out = Lines::default();
        let nws = self.meteorological.map_or(0, |forcing| forcing.nws);
        let ihot = match self.phase {
            RunPhase::Coldstart => 0,
            RunPhase::Hotstart => IHOT_NETCDF,
        };

        out.line(&self.description, "RUNDES");
        out.line(&self.run_id, "RUNID");
        out.line("1", "NFOVER");
        out.line("1", "NABOUT");
        out.line("100", "NSCREEN");
        out.line(&ihot.to_string(), "IHOT");
        out.line("2", "ICS");
        out.line(&self.gwce.im(self.smagorinsky).to_string(), "IM");
        out.line("2", "NOLIBF");
        out.line("2", "NOLIFA");
        out.line("1", "NOLICA");
        out.line("1", "NOLICAT");

        let names = self.attributes.names();
        out.line(&names.len().to_string(), "NWP");
        for name in &names {
            out.raw(name);
        }

        out.line("1", "NCOR");
        out.line(if self.constituents.iter().any(|c| c.potential_amplitude > 0.0) { "1" } else { "0" }, "NTIP");
        out.line(&nws.to_string(), "NWS");
        out.line(if self.ramp > Duration::ZERO { "1" } else { "0" }, "NRAMP");
        out.line("9.81", "G");
        let tau0 = if names.contains(&TAU0_ATTRIBUTE) { "-3" } else { "0.005" };
        out.line(tau0, "TAU0");
        out.line(&format_number(self.timestep.as_seconds_f64()), "DTDP");
        out.line("0", "STATIM");
        out.line("0", "REFTIM");

        if let Some(forcing) = self.meteorological {
            out.line(&self.wind_timing(forcing), "WTIMINC");
            if let Some(interval) = forcing.wave_interval {
                out.line(&format_number(interval.as_seconds_f64()), "RSTIMINC");
            }
        }

        out.line(&format_number(self.days_since_coldstart(self.end_time)), "RNDAY");
        out.line(&format_number(self.ramp.as_seconds_f64() / 86_400.0), "DRAMP");
        out.line(self.gwce.weights(), "A00 B00 C00");
        out.line("0.01 0 0 0.01", "H0 NODEDRYMIN NODEWETMIN VELMIN");
        let (slam0, sfea0) = self.mesh.center();
        out.line(&format!("{} {}", format_number(slam0), format_number(sfea0)), "SLAM0 SFEA0");
        out.line("0.0025 1 10 0.3333333", "CF HBREAK FTHETA FGAMMA");
        out.line(if self.smagorinsky { "-0.2" } else { "50" }, "ESLM");
        out.line("0", "CORI");

        self.write_tidal_potential(&mut out);
        out.line("0", "NBFR");
        out.line("110", "ANGINN");

        self.write_station_block(&mut out, "NOUTE TOUTSE TOUTFE NSPOOLE", "NSTAE");
        self.write_station_block(&mut out, "NOUTV TOUTSV TOUTFV NSPOOLV", "NSTAV");
        if nws != 0 {
            self.write_station_block(&mut out, "NOUTM TOUTSM TOUTFM NSPOOLM", "NSTAM");
        }

        let global = self.output_window(self.write_surface_output, SURFACE_OUTPUT_INTERVAL);
        out.line(&global, "NOUTGE TOUTSGE TOUTFGE NSPOOLGE");
        out.line(&global, "NOUTGV TOUTSGV TOUTFGV NSPOOLGV");
        if nws != 0 {
            out.line(&global, "NOUTGW TOUTSGW TOUTFGW NSPOOLGW");
        }

        out.line("0", "NFREQ");
        out.line("0 0 0 0", "THAS THAF NHAINC FMV");
        out.line("0 0 0 0", "NHASE NHASV NHAGE NHAGV");

        match self.phase {
            RunPhase::Coldstart => {
                let steps = self.steps(self.end_time - self.coldstart_time);
                out.line(&format!("{NETCDF_HOTSTART} {steps}"), "NHSTAR NHSINC");
            }
            RunPhase::Hotstart => out.line("0 0", "NHSTAR NHSINC"),
        }

        out.line("1 0 1e-10 25", "ITITER ISLDIA CONVCR ITMAX");
        out.line("UTM", "NCPROJ");
        out.line("ADCIRC", "NCINST");
        out.line("ADCIRC", "NCSOUR");
        out.line("None", "NCHIST");
        out.line("None", "NCREF");
        out.line("None", "NCCOM");
        out.line("None", "NCHOST");
        out.line("CF", "NCCONV");
        out.line("None", "NCCONT");
        out.line(&format!("{} UTC", format_datetime(self.coldstart_time)), "NCDATE");
        out.raw("&metControl WindDragLimit=0.0025, DragLawString='default', outputWindDrag=F /");

        let mut output = out.0.join("\n");
        output.push('\n');
        Ok(output)
    }

    /// Writes the file to `path`.
    ///
    /// # Errors
    ///
    /// Returns rendering or write failures.
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &self.render()?, overwrite)
    }

    /// `WTIMINC` value; best track adds its start date and storm fields.
    fn wind_timing(&self, forcing: MeteorologicalForcing) -> String {
        let seconds = format_number(forcing.wind_interval.as_seconds_f64());
        match forcing.best_track_start {
            Some(start) if matches!(forcing.nws % 100, 8 | 19 | 20 | 21) => format!(
                "{} {} {} {} 1 0.9 1",
                start.year(),
                u8::from(start.month()),
                start.day(),
                start.hour()
            ),
            _ => seconds,
        }
    }

    /// Tidal potential section.
    fn write_tidal_potential(&self, out: &mut Lines) {
        let potential: Vec<&'static Constituent> =
            self.constituents.iter().copied().filter(|c| c.potential_amplitude > 0.0).collect();
        out.line(&potential.len().to_string(), "NTIF");
        let window = self.end_time - self.coldstart_time;
        for term in tidal_terms(&potential, self.coldstart_time, window) {
            let constituent = term.constituent;
            out.line(constituent.name, "TIPOTAG");
            out.line(
                &format!(
                    "{} {} {} {:.6} {:.2}",
                    constituent.potential_amplitude,
                    constituent.frequency,
                    constituent.earth_tide_factor,
                    term.nodal_factor,
                    term.equilibrium_argument
                ),
                "TPK AMIGT ETRF FFT FACET",
            );
        }
    }

    /// Station output block for one variable.
    fn write_station_block(&self, out: &mut Lines, label: &str, count_label: &str) {
        let enabled = self.write_station_output && !self.stations.is_empty();
        out.line(&self.output_window(enabled, STATION_OUTPUT_INTERVAL), label);
        let stations: &[Station] = if enabled { self.stations } else { &[] };
        out.line(&stations.len().to_string(), count_label);
        for station in stations {
            let coordinates = format!("{} {}", format_number(station.x), format_number(station.y));
            match &station.name {
                Some(name) => out.line(&coordinates, name),
                None => out.raw(&coordinates),
            }
        }
    }

    /// `NOUT TOUTS TOUTF NSPOOL` for the output window.
    fn output_window(&self, enabled: bool, interval: Duration) -> String {
        if !enabled || (self.phase == RunPhase::Coldstart && self.output_start > self.coldstart_time) {
            return "0 0 0 0".to_string();
        }
        format!(
            "{NETCDF_OUTPUT} {} {} {}",
            format_number(self.days_since_coldstart(self.output_start)),
            format_number(self.days_since_coldstart(self.end_time)),
            self.steps(interval)
        )
    }
}

/// Formats a float without trailing noise.
fn format_number(value: f64) -> String {
    let rounded = (value * 1e9).round() / 1e9;
    if rounded == 0.0 { "0".to_string() } else { rounded.to_string() }
}

/// Accumulates padded lines.
#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    /// Adds `value ! label` with the comment at a fixed column.
    fn line(&mut self, value: &str, label: &str) {
        self.0.push(format!("{value:<COMMENT_COLUMN$} ! {label}"));
    }

    /// Adds a line verbatim.
    fn raw(&mut self, value: &str) {
        self.0.push(value.to_string());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
