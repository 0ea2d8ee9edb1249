// crates/coupled-driver-core/src/adcirc/mesh.rs
// ============================================================================
// Module: ADCIRC Mesh
// Description: `fort.14` reader and writer.
// Purpose: Expose node coordinates and depths while preserving file content.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The mesh file is carried through generation unchanged. Only the header
//! counts and node table are interpreted; element and boundary sections are
//! kept as the original lines.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::error::DriverError;
use crate::error::DriverResult;
use crate::fs::read_text;
use crate::fs::write_text;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Conventional mesh file name.
pub const FORT14: &str = "fort.14";

/// One mesh node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Node number.
    pub id: u64,
    /// Longitude or easting.
    pub x: f64,
    /// Latitude or northing.
    pub y: f64,
    /// Depth below datum (positive down).
    pub depth: f64,
}

/// Parsed `fort.14`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Description line.
    pub description: String,
    /// Element count.
    pub element_count: usize,
    /// Node table.
    pub nodes: Vec<Node>,
    /// Every line after the description, verbatim.
    body: Vec<String>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

impl Mesh {
    /// Reads a mesh from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingInput`] when the file does not exist and
    /// [`DriverError::Parse`] when it is malformed.
    pub fn read(path: &Path) -> DriverResult<Self> {
        if !path.is_file() {
            return Err(DriverError::MissingInput {
                kind: "mesh (fort.14)",
                path: path.to_path_buf(),
            });
        }
        let text = read_text(path)?;
        Self::parse(&text).map_err(|message| DriverError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses mesh text.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed line.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text.lines();
        let description = lines.next().ok_or("empty mesh file")?.trim_end().to_string();
        let body: Vec<String> = lines.map(|line| line.trim_end().to_string()).collect();

        let counts = body.first().ok_or("missing element and node counts")?;
        let mut tokens = counts.split_whitespace();
        let element_count = parse_count(tokens.next(), "element count")?;
        let node_count = parse_count(tokens.next(), "node count")?;

        let expected_lines = node_count
            .checked_add(element_count)
            .and_then(|count| count.checked_add(1))
            .ok_or_else(|| format!("node count {node_count} and element count {element_count} overflow"))?;
        if body.len() < expected_lines {
            return Err(format!(
                "expected {node_count} nodes and {element_count} elements, found {} lines",
                body.len().saturating_sub(1)
            ));
        }

        let mut nodes = Vec::with_capacity(node_count);
        for (offset, line) in body[1..=node_count].iter().enumerate() {
            nodes.push(parse_node(line).map_err(|err| format!("line {}: {err}", offset + 3))?);
        }

        Ok(Self {
            description,
            element_count,
            nodes,
            body,
        })
    }

    // ========================================================================
    // SECTION: Queries
    // ========================================================================

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Mean node coordinate, used for `SLAM0` / `SFEA0`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        if self.nodes.is_empty() {
            return (0.0, 0.0);
        }
        #[allow(clippy::cast_precision_loss, reason = "Node counts stay far below 2^52.")]
        let count = self.nodes.len() as f64;
        let x = self.nodes.iter().map(|node| node.x).sum::<f64>() / count;
        let y = self.nodes.iter().map(|node| node.y).sum::<f64>() / count;
        (x, y)
    }

    // ========================================================================
    // SECTION: Writing
    // ========================================================================

    /// Renders the mesh with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::with_capacity(self.body.iter().map(|line| line.len() + 1).sum());
        output.push_str(&self.description);
        output.push('\n');
        for line in &self.body {
            output.push_str(line);
            output.push('\n');
        }
        output
    }

    /// Writes the mesh to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::FileExists`] or [`DriverError::Io`].
    pub fn write(&self, path: &Path, overwrite: bool) -> DriverResult<()> {
        write_text(path, &self.render(), overwrite)
    }
}

/// Parses a header count.
fn parse_count(token: Option<&str>, label: &str) -> Result<usize, String> {
    let token = token.ok_or_else(|| format!("missing {label}"))?;
    token.parse().map_err(|_| format!("invalid {label} \"{token}\""))
}

/// Parses `id x y depth`.
fn parse_node(line: &str) -> Result<Node, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(format!("expected node record, found \"{line}\""));
    }
    let number = |index: usize| -> Result<f64, String> {
        tokens[index].parse().map_err(|_| format!("invalid number \"{}\"", tokens[index]))
    };
    Ok(Node {
        id: tokens[0].parse().map_err(|_| format!("invalid node id \"{}\"", tokens[0]))?,
        x: number(1)?,
        y: number(2)?,
        depth: number(3)?,
    })
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

    const SAMPLE: &str = "test mesh\n2 4\n1 -72.0 40.0 5.0\n2 -71.0 40.0 12.0\n3 -71.0 41.0 \
                          20.0\n4 -72.0 41.0 1.5\n1 3 1 2 3\n2 3 1 3 4\n0 ! open boundaries\n";

    #[test]
    fn parses_nodes_and_center() {
        let mesh = Mesh::parse(SAMPLE).unwrap();
        assert_eq!(mesh.node_count(), 4);
        assert_eq!(mesh.element_count, 2);
        assert_eq!(mesh.nodes[1].depth, 12.0);
        let (x, y) = mesh.center();
        assert!((x + 71.5).abs() < 1e-9);
        assert!((y - 40.5).abs() < 1e-9);
    }

    #[test]
    fn render_preserves_content() {
        let mesh = Mesh::parse(SAMPLE).unwrap();
        assert_eq!(mesh.render(), SAMPLE);
    }

    #[test]
    fn truncated_mesh_fails() {
        assert!(Mesh::parse("mesh\n2 4\n1 0 0 1\n").is_err());
        assert!(Mesh::parse("").is_err());
    }

    #[test]
    fn oversized_counts_fail_without_overflow() {
        let error = Mesh::parse(&format!("mesh\n{} {}\n", usize::MAX, usize::MAX)).unwrap_err();
        assert!(error.contains("overflow"), "{error}");
    }

    #[test]
    fn missing_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let error = Mesh::read(&dir.path().join(FORT14)).unwrap_err();
        assert!(matches!(error, DriverError::MissingInput { .. }));
    }
}
