// crates/coupled-driver-core/src/adcirc/tides.rs
// ============================================================================
// Module: Tidal Constituents
// Description: Constituent table, nodal factors and equilibrium arguments.
// Purpose: Supply the tidal potential terms written to `fort.15`.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Nodal factors and equilibrium arguments follow Schureman's formulation:
//! orbital elements are evaluated from the reference date, nodal factors at
//! the middle of the forcing window and equilibrium arguments at its start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::PrimitiveDateTime;

use crate::error::DriverError;
use crate::error::DriverResult;
use crate::forcing::ConstituentSelection;
use crate::forcing::TidalSource;

// ============================================================================
// SECTION: Constituent Table
// ============================================================================

/// Static description of one constituent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constituent {
    /// Constituent name.
    pub name: &'static str,
    /// Tidal potential amplitude; zero for boundary-only constituents.
    pub potential_amplitude: f64,
    /// Angular frequency in rad/s.
    pub frequency: f64,
    /// Earth tide reduction factor.
    pub earth_tide_factor: f64,
}

/// Shorthand for table rows.
const fn constituent(name: &'static str, potential_amplitude: f64, frequency: f64, earth_tide_factor: f64) -> Constituent {
    Constituent {
        name,
        potential_amplitude,
        frequency,
        earth_tide_factor,
    }
}

/// Every known constituent.
pub const CONSTITUENTS: [Constituent; 15] = [
    constituent("Q1", 0.019256, 6.4958541129e-5, 0.695),
    constituent("O1", 0.100514, 6.7597744151e-5, 0.695),
    constituent("P1", 0.046843, 7.2522945975e-5, 0.706),
    constituent("K1", 0.141565, 7.2921158358e-5, 0.736),
    constituent("N2", 0.046398, 1.37879699487e-4, 0.693),
    constituent("M2", 0.242334, 1.40518902509e-4, 0.693),
    constituent("S2", 0.112841, 1.45444104333e-4, 0.693),
    constituent("K2", 0.030704, 1.45842317201e-4, 0.693),
    constituent("Mm", 0.0, 2.639203022e-6, 0.0),
    constituent("Mf", 0.0, 5.3234146919e-6, 0.0),
    constituent("M4", 0.0, 2.81037805018e-4, 0.0),
    constituent("MN4", 0.0, 2.78398601996e-4, 0.0),
    constituent("MS4", 0.0, 2.85963006842e-4, 0.0),
    constituent("2N2", 0.0, 1.352404965e-4, 0.0),
    constituent("S1", 0.0, 7.2722052166e-5, 0.0),
];

/// Names of the major constituents.
pub const MAJOR: [&str; 8] = ["Q1", "O1", "P1", "K1", "N2", "M2", "S2", "K2"];

/// Looks up a constituent case-insensitively.
#[must_use]
pub fn find_constituent(name: &str) -> Option<&'static Constituent> {
    CONSTITUENTS.iter().find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
}

/// Constituents a tidal database provides.
#[must_use]
pub fn available_constituents(source: TidalSource) -> Vec<&'static Constituent> {
    match source {
        TidalSource::Tpxo => CONSTITUENTS.iter().collect(),
        TidalSource::Hamtide => CONSTITUENTS.iter().filter(|entry| MAJOR.contains(&entry.name)).collect(),
    }
}

/// Resolves a selection against what `source` provides.
///
/// # Errors
///
/// Returns [`DriverError::InvalidValue`] for names the source does not
/// provide.
pub fn select_constituents(
    source: TidalSource,
    selection: &ConstituentSelection,
) -> DriverResult<Vec<&'static Constituent>> {
    let available = available_constituents(source);
    match selection {
        ConstituentSelection::All => Ok(available),
        ConstituentSelection::Major => {
            Ok(available.into_iter().filter(|entry| MAJOR.contains(&entry.name)).collect())
        }
        ConstituentSelection::List(names) => {
            let mut selected: Vec<&'static Constituent> = Vec::new();
            for name in names {
                let entry = available
                    .iter()
                    .copied()
                    .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
                    .ok_or_else(|| DriverError::InvalidValue {
                        kind: "tidal constituent",
                        value: format!("{name} ({source})"),
                    })?;
                if !selected.contains(&entry) {
                    selected.push(entry);
                }
            }
            Ok(selected)
        }
    }
}

// ============================================================================
// SECTION: Orbital Elements
// ============================================================================

/// Orbital state at a reference time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Orbit {
    /// Longitude of the lunar node (degrees).
    node: f64,
    /// Mean longitude of lunar perigee.
    perigee: f64,
    /// Mean longitude of the moon.
    moon: f64,
    /// Mean longitude of the sun.
    sun: f64,
    /// Hour angle of the mean sun.
    hour_angle: f64,
}

impl Orbit {
    /// Evaluates elements at `hours` past midnight of `date`.
    fn at(date: PrimitiveDateTime, hours: f64) -> Self {
        let year = f64::from(date.year());
        let day_of_year = f64::from(date.ordinal());
        let leap_days = ((year - 1901.0) / 4.0).floor();
        let dyr = year - 1900.0;
        let dday = day_of_year + leap_days - 1.0;
        Self {
            node: 259.156_056_4 - 19.328_185_764 * dyr - 0.052_953_933_6 * dday - 0.002_206_413_9 * hours,
            perigee: 334.383_721_4 + 40.662_465_84 * dyr + 0.111_404_016 * dday + 0.004_641_834 * hours,
            moon: 277.025_620_6 + 129.384_820_32 * dyr + 13.176_396_768 * dday + 0.549_016_532 * hours,
            sun: 280.189_501_4 - 0.238_724_988 * dyr + 0.985_647_328_8 * dday + 0.041_068_638_7 * hours,
            hour_angle: 180.0 + hours * 15.0,
        }
    }
}

/// Derived lunar angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
struct LunarAngles {
    /// Obliquity of the lunar orbit.
    inclination: f64,
    /// Nu.
    nu: f64,
    /// Xi.
    xi: f64,
    /// Nu prime.
    nu_prime: f64,
    /// Nu double prime.
    nu_double_prime: f64,
}

impl LunarAngles {
    /// Derives the angles from the lunar node longitude.
    fn from_node(node_degrees: f64) -> Self {
        let node = node_degrees.rem_euclid(360.0).to_radians();
        let inclination = (0.913_694_9 - 0.035_692_6 * node.cos()).acos();
        let nu = (0.089_705_6 * node.sin() / inclination.sin()).asin();
        let xi = node - 2.0 * (0.644_12 * (node / 2.0).tan()).atan() - nu;
        let nu_prime = nu.sin().atan2(nu.cos() + 0.334_766 / (2.0 * inclination).sin());
        let nu_double_prime =
            (2.0 * nu).sin().atan2((2.0 * nu).cos() + 0.072_618_4 / inclination.sin().powi(2)) / 2.0;
        Self {
            inclination: inclination.to_degrees(),
            nu: nu.to_degrees(),
            xi: xi.to_degrees(),
            nu_prime: nu_prime.to_degrees(),
            nu_double_prime: nu_double_prime.to_degrees(),
        }
    }
}

// ============================================================================
// SECTION: Tidal Potential Terms
// ============================================================================

/// Constituent evaluated over a forcing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidalTerm {
    /// Static constituent data.
    pub constituent: &'static Constituent,
    /// Nodal factor at the window midpoint.
    pub nodal_factor: f64,
    /// Equilibrium argument in degrees, within `[0, 360)`.
    pub equilibrium_argument: f64,
}

/// Evaluates `constituents` for a window starting at `start` and lasting
/// `duration`.
#[must_use]
pub fn tidal_terms(
    constituents: &[&'static Constituent],
    start: PrimitiveDateTime,
    duration: Duration,
) -> Vec<TidalTerm> {
    let start_hours = f64::from(start.hour())
        + f64::from(start.minute()) / 60.0
        + f64::from(start.second()) / 3600.0;
    let middle_hours = start_hours + duration.as_seconds_f64() / 3600.0 / 2.0;
    let middle = LunarAngles::from_node(Orbit::at(start, middle_hours).node);
    let orbit = Orbit::at(start, start_hours);
    let angles = LunarAngles::from_node(orbit.node);
    constituents
        .iter()
        .map(|&constituent| TidalTerm {
            constituent,
            nodal_factor: nodal_factor(constituent.name, &middle),
            equilibrium_argument: equilibrium_argument(constituent.name, &orbit, &angles).rem_euclid(360.0),
        })
        .collect()
}

/// Nodal factor `f` for `name`.
fn nodal_factor(name: &str, angles: &LunarAngles) -> f64 {
    let inclination = angles.inclination.to_radians();
    let nu = angles.nu.to_radians();
    let half = inclination / 2.0;
    let eq78 = half.cos().powi(4) / 0.915_44;
    match name {
        "M2" | "N2" | "2N2" | "MS4" => eq78,
        "M4" | "MN4" => eq78.powi(2),
        "O1" | "Q1" => inclination.sin() * half.cos().powi(2) / 0.379_88,
        "K1" => (0.896_5 * (2.0 * inclination).sin().powi(2)
            + 0.600_1 * (2.0 * inclination).sin() * nu.cos()
            + 0.100_6)
            .sqrt(),
        "K2" => {
            0.001
                + (19.044_4 * inclination.sin().powi(4)
                    + 2.770_2 * inclination.sin().powi(2) * (2.0 * nu).cos()
                    + 0.098_1)
                    .sqrt()
        }
        "Mm" => (2.0 / 3.0 - inclination.sin().powi(2)) / 0.502_1,
        "Mf" => inclination.sin().powi(2) / 0.157_8,
        _ => 1.0,
    }
}

/// Equilibrium argument `V0 + u` for `name`, unnormalized.
fn equilibrium_argument(name: &str, orbit: &Orbit, angles: &LunarAngles) -> f64 {
    let t = orbit.hour_angle;
    let (s, h, p) = (orbit.moon, orbit.sun, orbit.perigee);
    let (nu, xi) = (angles.nu, angles.xi);
    let m2 = 2.0 * t - 2.0 * s + 2.0 * h + 2.0 * xi - 2.0 * nu;
    let s2 = 2.0 * t;
    let n2 = 2.0 * t - 3.0 * s + 2.0 * h + p + 2.0 * xi - 2.0 * nu;
    match name {
        "M2" => m2,
        "S2" => s2,
        "N2" => n2,
        "K2" => 2.0 * t + 2.0 * h - 2.0 * angles.nu_double_prime,
        "K1" => t + h - 90.0 - angles.nu_prime,
        "O1" => t - 2.0 * s + h + 90.0 + 2.0 * xi - nu,
        "P1" => t - h + 90.0,
        "Q1" => t - 3.0 * s + h + p + 90.0 + 2.0 * xi - nu,
        "M4" => 2.0 * m2,
        "MS4" => m2 + s2,
        "MN4" => m2 + n2,
        "Mm" => s - p,
        "Mf" => 2.0 * s - 2.0 * xi,
        "2N2" => 2.0 * t - 4.0 * s + 2.0 * h + 2.0 * p + 2.0 * xi - 2.0 * nu,
        "S1" => t,
        _ => 0.0,
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
        clippy::use_debug,
        reason = "Test-only assertions are permitted."
    )]

    use time::macros::datetime;

    use super::*;

    #[test]
    fn hamtide_offers_major_only() {
        let names: Vec<&str> = available_constituents(TidalSource::Hamtide).iter().map(|c| c.name).collect();
        assert_eq!(names, MAJOR.to_vec());
        assert_eq!(available_constituents(TidalSource::Tpxo).len(), 15);
    }

    #[test]
    fn list_selection_rejects_unavailable() {
        let selection = ConstituentSelection::List(vec!["m2".to_string(), "Mf".to_string()]);
        assert!(select_constituents(TidalSource::Hamtide, &selection).is_err());
        let selected = select_constituents(TidalSource::Tpxo, &selection).unwrap();
        assert_eq!(selected.iter().map(|c| c.name).collect::<Vec<_>>(), vec!["M2", "Mf"]);
    }

    #[test]
    fn terms_are_normalized_and_plausible() {
        let constituents = select_constituents(TidalSource::Tpxo, &ConstituentSelection::All).unwrap();
        let terms = tidal_terms(&constituents, datetime!(2008-08-10 12:00:00), Duration::days(12));
        assert_eq!(terms.len(), 15);
        for term in &terms {
            assert!((0.0..360.0).contains(&term.equilibrium_argument), "{term:?}");
            assert!(term.nodal_factor > 0.5 && term.nodal_factor < 1.6, "{term:?}");
        }
        let s2 = terms.iter().find(|term| term.constituent.name == "S2").unwrap();
        assert!((s2.nodal_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn solar_argument_tracks_hour() {
        let s2 = [find_constituent("S2").unwrap()];
        let terms = tidal_terms(&s2, datetime!(2020-01-01 00:00:00), Duration::days(1));
        assert!((terms[0].equilibrium_argument - 0.0).abs() < 1e-9);
        let terms = tidal_terms(&s2, datetime!(2020-01-01 06:00:00), Duration::days(1));
        assert!((terms[0].equilibrium_argument - 180.0).abs() < 1e-9);
    }
}
