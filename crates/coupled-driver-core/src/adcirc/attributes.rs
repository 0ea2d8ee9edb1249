// crates/coupled-driver-core/src/adcirc/attributes.rs
// ============================================================================
// Module: Nodal Attributes
// Description: `fort.13` reader, writer and editors.
// Purpose: Carry spatially varying parameters such as Manning's n and tau0.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A nodal attribute has a default value per node and a sparse table of
//! nodes that differ from it. Perturbations replace an attribute with a
//! uniform value; tau0 is derived from mesh depths when the file lacks it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use crate::adcirc::mesh::Mesh;
use crate::error::DriverError;
use crate::error::DriverResult;
use crate::fs::read_text;
use crate::fs::write_text;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional nodal attribute file name.
pub const FORT13: &str = "fort.13";

/// Attribute holding the GWCE primitive weighting (tau0).
pub const TAU0_ATTRIBUTE: &str = "primitive_weighting_in_continuity_equation";

/// tau0 at nodes deeper than [`TAU0_DEPTH_THRESHOLD`].
pub const TAU0_DEEP: f64 = 0.005;
/// tau0 at shallow nodes.
pub const TAU0_SHALLOW: f64 = 0.02;
/// Depth in meters separating deep from shallow nodes.
pub const TAU0_DEPTH_THRESHOLD: f64 = 10.0;

/// Units of well-known attributes.
const KNOWN_UNITS: &[(&str, &str)] = &[
    ("mannings_n_at_sea_floor", "s/m^(1/3)"),
    ("quadratic_friction_coefficient_at_sea_floor", "unitless"),
    (TAU0_ATTRIBUTE, "unitless"),
    ("surface_directional_effective_roughness_length", "m"),
    ("surface_canopy_coefficient", "unitless"),
    ("elemental_slope_limiter", "unitless"),
    ("average_horizontal_eddy_viscosity_in_sea_water_wrt_depth", "m^2/s"),
    ("sea_surface_height_above_geoid", "m"),
    ("bridge_pilings_friction_parameters", "unitless"),
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// One attribute: defaults plus nodes that differ from them.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalAttribute {
    /// Attribute name.
    pub name: String,
    /// Units label.
    pub units: String,
    /// Default value per node, one entry per component.
    pub defaults: Vec<f64>,
    /// Non-default nodes keyed by node number.
    pub values: BTreeMap<u64, Vec<f64>>,
}

impl NodalAttribute {
    /// Creates an attribute with uniform `defaults` and no overrides.
    #[must_use]
    pub fn uniform(name: impl Into<String>, defaults: Vec<f64>) -> Self {
        let name = name.into();
        let units = units_for(&name).to_string();
        Self {
            name,
            units,
            defaults,
            values: BTreeMap::new(),
        }
    }
}

/// Returns the units label for `name`.
#[must_use]
pub fn units_for(name: &str) -> &'static str {
    KNOWN_UNITS.iter().find(|(known, _)| *known == name).map_or("unitless", |(_, units)| units)
}

/// Parsed `fort.13`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalAttributes {
    /// Description line (`AGRID`).
    pub description: String,
    /// Node count the file applies to.
    pub node_count: usize,
    /// Attributes in file order.
    pub attributes: Vec<NodalAttribute>,
}

// ============================================================================
// SECTION: Construction
// ============================================================================

impl NodalAttributes {
    /// Creates an empty attribute set for `mesh`.
    #[must_use]
    pub fn for_mesh(mesh: &Mesh) -> Self {
        Self {
            description: mesh.description.clone(),
            node_count: mesh.node_count(),
            attributes: Vec::new(),
        }
    }

    /// Reads `fort.13`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Io`] or [`DriverError::Parse`].
    pub fn read(path: &Path) -> DriverResult<Self> {
        let text = read_text(path)?;
        Self::parse(&text).map_err(|message| DriverError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses `fort.13` text.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed entry.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut tokens = Tokens::new(text);
        let description = tokens.line("description")?.to_string();
        let node_count = tokens.count("node count")?;
        let attribute_count = tokens.count("attribute count")?;

        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            let name = tokens.line("attribute name")?.to_string();
            let units = tokens.line("attribute units")?.to_string();
            let width = tokens.count("values per node")?;
            let defaults = tokens.numbers(width, "default values")?;
            attributes.push(NodalAttribute {
                name,
                units,
                defaults,
                values: BTreeMap::new(),
            });
        }

        for _ in 0..attribute_count {
            let name = tokens.line("attribute name")?.to_string();
            let position = attributes
                .iter()
                .position(|attribute| attribute.name == name)
                .ok_or_else(|| format!("values for undeclared attribute \"{name}\""))?;
            let width = attributes[position].defaults.len();
            let count = tokens.count("non-default node count")?;
            for _ in 0..count {
                let line = tokens.line("node values")?;
                let mut fields = line.split_whitespace();
                let node = fields
                    .next()
                    .and_then(|field| field.parse::<u64>().ok())
                    .ok_or_else(|| format!("invalid node values \"{line}\""))?;
                let values = fields
                    .map(|field| field.parse::<f64>().map_err(|_| format!("invalid value \"{field}\"")))
                    .collect::<Result<Vec<f64>, String>>()?;
                if values.len() != width {
                    return Err(format!("expected {width} values for node {node} of \"{name}\""));
                }
                attributes[position].values.insert(node, values);
            }
        }

        Ok(Self {
            description,
            node_count,
            attributes,
        })
    }

    // ========================================================================
    // SECTION: Editing
    // ========================================================================

    /// Returns the attribute named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NodalAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Attribute names in file order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|attribute| attribute.name.as_str()).collect()
    }

    /// Sets `name` to `value` at every node, adding the attribute if absent.
    pub fn set_uniform(&mut self, name: &str, value: f64) {
        if let Some(attribute) = self.attributes.iter_mut().find(|attribute| attribute.name == name) {
            attribute.defaults = vec![value; attribute.defaults.len().max(1)];
            attribute.values.clear();
        } else {
            self.attributes.push(NodalAttribute::uniform(name, vec![value]));
        }
    }

    /// Adds tau0 derived from depths unless it already exists.
    ///
    /// Returns whether the attribute was generated.
    pub fn generate_tau0(&mut self, mesh: &Mesh) -> bool {
        if self.get(TAU0_ATTRIBUTE).is_some() {
            return false;
        }
        let mut attribute = NodalAttribute::uniform(TAU0_ATTRIBUTE, vec![TAU0_SHALLOW]);
        for node in mesh.nodes.iter().filter(|node| node.depth > TAU0_DEPTH_THRESHOLD) {
            attribute.values.insert(node.id, vec![TAU0_DEEP]);
        }
        self.attributes.push(attribute);
        true
    }

    // ========================================================================
    // SECTION: Writing
    // ========================================================================

    /// Renders the file with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            self.description.clone(),
            self.node_count.to_string(),
            self.attributes.len().to_string(),
        ];
        for attribute in &self.attributes {
            lines.push(attribute.name.clone());
            lines.push(attribute.units.clone());
            lines.push(attribute.defaults.len().to_string());
            lines.push(join_values(&attribute.defaults));
        }
        for attribute in &self.attributes {
            lines.push(attribute.name.clone());
            lines.push(attribute.values.len().to_string());
            for (node, values) in &attribute.values {
                lines.push(format!("{node} {}", join_values(values)));
            }
        }
        let mut output = lines.join("\n");
        output.push('\n');
        output
    }

    /// Writes the file to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::FileExists`] or [`DriverError::Io`].
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &self.render(), overwrite)
    }
}

/// Joins values with single spaces.
fn join_values(values: &[f64]) -> String {
    values.iter().map(f64::to_string).collect::<Vec<_>>().join(" ")
}

// ============================================================================
// SECTION: Tokenizer
// ============================================================================

/// Line cursor skipping blank lines.
struct Tokens<'a> {
    /// Remaining lines.
    lines: std::iter::Filter<std::str::Lines<'a>, fn(&&str) -> bool>,
}

impl<'a> Tokens<'a> {
    /// Wraps `text`.
    fn new(text: &'a str) -> Self {
        let non_blank: fn(&&str) -> bool = |line| !line.trim().is_empty();
        Self {
            lines: text.lines().filter(non_blank),
        }
    }

    /// Next trimmed line.
    fn line(&mut self, label: &str) -> Result<&'a str, String> {
        self.lines.next().map(str::trim).ok_or_else(|| format!("missing {label}"))
    }

    /// Next line as a count (first token).
    fn count(&mut self, label: &str) -> Result<usize, String> {
        let line = self.line(label)?;
        let token = line.split_whitespace().next().unwrap_or_default();
        token.parse().map_err(|_| format!("invalid {label} \"{line}\""))
    }

    /// Next line as exactly `width` numbers.
    fn numbers(&mut self, width: usize, label: &str) -> Result<Vec<f64>, String> {
        let line = self.line(label)?;
        let values = line
            .split_whitespace()
            .take(width)
            .map(|field| field.parse::<f64>().map_err(|_| format!("invalid value \"{field}\"")))
            .collect::<Result<Vec<f64>, String>>()?;
        if values.len() == width {
            Ok(values)
        } else {
            Err(format!("expected {width} {label}, found \"{line}\""))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
