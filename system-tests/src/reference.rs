// system-tests/src/reference.rs
// ============================================================================
// Module: Reference Directories
// Description: Recursive comparison of generated files with stored copies.
// Purpose: Detect any change in generated output.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every file under a reference directory must exist at the same relative
//! path in the generated tree and match it line for line, except for the
//! first line, which carries generator and version stamps. Files present only
//! in the generated tree are not checked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares `output` against every file under `reference`.
///
/// Symlinks in `output` are followed.
///
/// # Errors
///
/// Returns a description of the first missing file or differing line.
pub fn check_reference_directory(output: &Path, reference: &Path) -> Result<(), String> {
    let files = reference_files(reference)?;
    if files.is_empty() {
        return Err(format!("reference directory {} holds no files", reference.display()));
    }
    for relative in files {
        compare_file(&output.join(&relative), &reference.join(&relative))
            .map_err(|message| format!("{}: {message}", relative.display()))?;
    }
    Ok(())
}

/// Relative paths of all files below `reference`, sorted.
///
/// # Errors
///
/// Returns directory read failures.
pub fn reference_files(reference: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    collect(reference, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

/// Walks `root/relative` depth first.
fn collect(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> Result<(), String> {
    let directory = root.join(relative);
    let entries = fs::read_dir(&directory).map_err(|err| format!("{}: {err}", directory.display()))?;
    for entry in entries {
        let entry = entry.map_err(|err| format!("{}: {err}", directory.display()))?;
        let path = relative.join(entry.file_name());
        if entry.path().is_dir() {
            collect(root, &path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Compares two files, ignoring their first lines.
fn compare_file(generated: &Path, reference: &Path) -> Result<(), String> {
    if !generated.exists() {
        return Err("not generated".to_string());
    }
    let generated = fs::read_to_string(generated).map_err(|err| err.to_string())?;
    let reference = fs::read_to_string(reference).map_err(|err| err.to_string())?;
    compare_text(&generated, &reference)
}

/// Compares two texts line by line after the first line.
///
/// # Errors
///
/// Returns the first differing line number (1-based) and both lines.
pub fn compare_text(generated: &str, reference: &str) -> Result<(), String> {
    let generated: Vec<&str> = generated.lines().skip(1).collect();
    let reference: Vec<&str> = reference.lines().skip(1).collect();
    for (index, (left, right)) in generated.iter().zip(reference.iter()).enumerate() {
        if left != right {
            return Err(format!("line {} differs:\n  generated: {left}\n  reference: {right}", index + 2));
        }
    }
    if generated.len() != reference.len() {
        return Err(format!("{} lines generated, {} expected", generated.len() + 1, reference.len() + 1));
    }
    Ok(())
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
    fn first_line_is_ignored() {
        assert!(compare_text("coupled-driver 0.2.0\nIHOT 0\n", "coupled-driver 0.1.0\nIHOT 0\n").is_ok());
    }

    #[test]
    fn differing_line_is_reported() {
        let error = compare_text("header\nNWS 0\nNRAMP 1\n", "header\nNWS 0\nNRAMP 0\n").unwrap_err();
        assert!(error.contains("line 3"));
        assert!(error.contains("NRAMP 1"));
    }

    #[test]
    fn truncated_output_fails() {
        assert!(compare_text("header\nNWS 0\n", "header\nNWS 0\nNRAMP 0\n").is_err());
    }

    #[test]
    fn nested_reference_files_are_checked() {
        let reference = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let (reference, output) = (reference.path(), output.path());
        fs::create_dir_all(reference.join("runs/unperturbed")).unwrap();
        fs::write(reference.join("runs/unperturbed/fort.15"), "a\nb\n").unwrap();
        fs::write(reference.join("cleanup.sh"), "a\nc\n").unwrap();
        assert_eq!(
            reference_files(reference).unwrap(),
            vec![PathBuf::from("cleanup.sh"), PathBuf::from("runs/unperturbed/fort.15")]
        );

        fs::write(output.join("cleanup.sh"), "x\nc\n").unwrap();
        let error = check_reference_directory(output, reference).unwrap_err();
        assert!(error.contains("not generated"), "{error}");

        fs::create_dir_all(output.join("runs/unperturbed")).unwrap();
        fs::write(output.join("runs/unperturbed/fort.15"), "y\nb\n").unwrap();
        fs::write(output.join("extra.txt"), "ignored\n").unwrap();
        assert!(check_reference_directory(output, reference).is_ok());
    }
}
