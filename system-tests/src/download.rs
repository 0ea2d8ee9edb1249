// system-tests/src/download.rs
// ============================================================================
// Module: Mesh Download
// Description: Fetch and unpack a bzip2-compressed mesh archive.
// Purpose: Provide real-world meshes to network-enabled system tests.
// Dependencies: bzip2, reqwest, tar
// ============================================================================

//! ## Overview
//! The archive is downloaded in one blocking request, decompressed in memory
//! and scanned for `fort.13` and `fort.14`. Only those two files are written;
//! their location inside the archive is ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use bzip2::read::BzDecoder;
use reqwest::blocking::Client;
use tar::Archive;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mesh files extracted from an archive.
pub const MESH_FILES: [&str; 2] = ["fort.13", "fort.14"];

/// Timeout applied when the caller passes none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// SECTION: Download
// ============================================================================

/// Downloads the archive at `url` and writes its mesh files into `directory`.
///
/// Returns the paths written, in [`MESH_FILES`] order.
///
/// # Errors
///
/// Returns a description of the failed request, a malformed archive, or an
/// archive lacking `fort.14`.
pub fn download_mesh(url: &str, directory: &Path, timeout: Option<Duration>) -> Result<Vec<PathBuf>, String> {
    let client = Client::builder()
        .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
        .build()
        .map_err(|err| format!("http client: {err}"))?;
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|err| format!("download {url}: {err}"))?;
    let body = response.bytes().map_err(|err| format!("download {url}: {err}"))?;
    fs::create_dir_all(directory).map_err(|err| format!("{}: {err}", directory.display()))?;
    unpack_mesh(Cursor::new(body), directory)
}

/// Extracts [`MESH_FILES`] from a bzip2 tarball.
fn unpack_mesh<R: std::io::Read>(compressed: R, directory: &Path) -> Result<Vec<PathBuf>, String> {
    let mut archive = Archive::new(BzDecoder::new(compressed));
    let entries = archive.entries().map_err(|err| format!("archive: {err}"))?;
    let mut written = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|err| format!("archive: {err}"))?;
        let name = entry
            .path()
            .map_err(|err| format!("archive: {err}"))?
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        let Some(name) = name.filter(|name| MESH_FILES.contains(&name.as_str())) else {
            continue;
        };
        let target = directory.join(&name);
        entry.unpack(&target).map_err(|err| format!("{}: {err}", target.display()))?;
        written.push(target);
    }
    written.sort();
    if !written.iter().any(|path| path.ends_with("fort.14")) {
        return Err("archive holds no fort.14".to_string());
    }
    Ok(written)
}
