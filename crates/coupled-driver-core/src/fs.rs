// crates/coupled-driver-core/src/fs.rs
// ============================================================================
// Module: Output File Helpers
// Description: Overwrite-aware writes, symlinks and executable bits.
// Purpose: Give every generated artifact the same write semantics.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every generated text file goes through [`write_text`], which refuses to
//! replace an existing file unless overwriting is enabled. Links between run
//! directories are relative symlinks where the platform supports them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::error::DriverError;
use crate::error::DriverResult;

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Writes `contents` to `path`, failing if the file exists and `overwrite`
/// is false. Parent directories are created as needed. An existing symlink
/// at `path` is removed first, so the link target is never written.
///
/// # Errors
///
/// Returns [`DriverError::FileExists`] or [`DriverError::Io`].
pub fn write_text(path: &Path, contents: &str, overwrite: bool) -> DriverResult<()> {
    ensure_writable(path, overwrite)?;
    if path.is_symlink() {
        fs::remove_file(path).map_err(|err| DriverError::io(path, &err))?;
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| DriverError::io(parent, &err))?;
    }
    fs::write(path, contents).map_err(|err| DriverError::io(path, &err))
}

/// Fails when `path` exists (as a file or link) and `overwrite` is false.
///
/// # Errors
///
/// Returns [`DriverError::FileExists`] when the target is present.
pub fn ensure_writable(path: &Path, overwrite: bool) -> DriverResult<()> {
    if !overwrite && (path.exists() || path.is_symlink()) {
        return Err(DriverError::FileExists(path.to_path_buf()));
    }
    Ok(())
}

/// Creates `directory` and all parents.
///
/// # Errors
///
/// Returns [`DriverError::Io`] on failure.
pub fn create_dir_all(directory: &Path) -> DriverResult<()> {
    fs::create_dir_all(directory).map_err(|err| DriverError::io(directory, &err))
}

/// Reads a UTF-8 text file.
///
/// # Errors
///
/// Returns [`DriverError::Io`] when the file cannot be read.
pub fn read_text(path: &Path) -> DriverResult<String> {
    fs::read_to_string(path).map_err(|err| DriverError::io(path, &err))
}

// ============================================================================
// SECTION: Links
// ============================================================================

/// Links `link` to `source`, replacing any existing entry at `link`.
///
/// With `relative`, the stored target is expressed relative to the link's
/// directory. On platforms without symlinks the source is copied instead.
///
/// # Errors
///
/// Returns [`DriverError::Io`] when the link cannot be created.
pub fn create_symlink(source: &Path, link: &Path, relative: bool) -> DriverResult<()> {
    if link.exists() || link.is_symlink() {
        fs::remove_file(link).map_err(|err| DriverError::io(link, &err))?;
    }
    let target = if relative {
        let base = link.parent().unwrap_or_else(|| Path::new("."));
        relative_path(source, base)
    } else {
        source.to_path_buf()
    };
    link_or_copy(source, &target, link)
}

#[cfg(unix)]
/// Creates a symlink on Unix.
fn link_or_copy(_source: &Path, target: &Path, link: &Path) -> DriverResult<()> {
    std::os::unix::fs::symlink(target, link).map_err(|err| DriverError::io(link, &err))
}

#[cfg(not(unix))]
/// Copies the source where symlinks are unavailable.
fn link_or_copy(source: &Path, _target: &Path, link: &Path) -> DriverResult<()> {
    fs::copy(source, link).map(|_| ()).map_err(|err| DriverError::io(link, &err))
}

/// Marks `path` executable for user, group and other.
///
/// # Errors
///
/// Returns [`DriverError::Io`] when permissions cannot be changed.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> DriverResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|err| DriverError::io(path, &err))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(|err| DriverError::io(path, &err))
}

/// Executable bits do not exist on this platform.
///
/// # Errors
///
/// Never fails.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> DriverResult<()> {
    Ok(())
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Lexically normalizes a path, folding `.` and `..` components.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Returns `path` relative to `base` (both lexically normalized).
///
/// Relative inputs are compared component-wise, so both arguments should be
/// either absolute or relative to the same directory.
#[must_use]
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let path_parts: Vec<Component<'_>> =
        path.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    let base_parts: Vec<Component<'_>> =
        base.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    let shared = path_parts.iter().zip(base_parts.iter()).take_while(|(a, b)| a == b).count();
    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[shared..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() { PathBuf::from(".") } else { relative }
}

/// Makes `path` absolute against `base` when it is relative.
#[must_use]
pub fn absolute_from(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() { normalize(path) } else { normalize(&base.join(path)) }
}

/// Formats a path with forward slashes for shell scripts.
#[must_use]
pub fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
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
    fn write_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.txt");
        write_text(&path, "first\n", false).unwrap();
        let error = write_text(&path, "second\n", false).unwrap_err();
        assert!(matches!(error, DriverError::FileExists(_)));
        write_text(&path, "second\n", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[test]
    fn relative_path_walks_up() {
        assert_eq!(
            relative_path(Path::new("/out/spinup/fort.67.nc"), Path::new("/out/runs/a")),
            PathBuf::from("../../spinup/fort.67.nc")
        );
        assert_eq!(relative_path(Path::new("/out/fort.14"), Path::new("/out")), PathBuf::from("fort.14"));
        assert_eq!(relative_path(Path::new("/out"), Path::new("/out")), PathBuf::from("."));
    }

    #[test]
    fn normalize_folds_parent_components() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_relative_and_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("fort.14");
        fs::write(&source, "mesh").unwrap();
        let run = dir.path().join("runs").join("a");
        fs::create_dir_all(&run).unwrap();
        let link = run.join("fort.14");
        create_symlink(&source, &link, true).unwrap();
        create_symlink(&source, &link, true).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("../../fort.14"));
        assert_eq!(fs::read_to_string(&link).unwrap(), "mesh");
    }

    #[cfg(unix)]
    #[test]
    fn overwrite_replaces_link_without_touching_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("fort.13");
        fs::write(&source, "original\n").unwrap();
        let link = dir.path().join("run").join("fort.13");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        create_symlink(&source, &link, true).unwrap();
        write_text(&link, "perturbed\n", true).unwrap();
        assert!(!link.is_symlink());
        assert_eq!(fs::read_to_string(&link).unwrap(), "perturbed\n");
        assert_eq!(fs::read_to_string(&source).unwrap(), "original\n");
    }
}
