//! Shared snapshot persistence helpers.
//!
//! Writes are atomic: temp file with a random name in the destination
//! directory, fsync, then rename. Readers never observe a partially
//! written snapshot. Loads are bounded: oversized files are rejected
//! before reading.

use std::fs;
use std::io::Write;
use std::path::Path;

/// Writes bytes atomically via `NamedTempFile` + fsync + rename.
///
/// Errors are returned as detail strings for the caller to wrap into its
/// module error type.
pub(crate) fn atomic_write(final_path: &Path, bytes: &[u8]) -> Result<(), String> {
    let dir = final_path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)
            .map_err(|e| format!("cannot create directory {}: {e}", dir.display()))?;
    }
    let dir = dir.unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| format!("cannot create temp file in {}: {e}", dir.display()))?;
    temp.as_file_mut()
        .write_all(bytes)
        .map_err(|e| format!("cannot write temp file: {e}"))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| format!("cannot sync temp file: {e}"))?;
    temp.persist(final_path)
        .map_err(|e| format!("cannot persist temp file -> {}: {e}", final_path.display()))?;
    Ok(())
}

/// Loads a JSON document, rejecting files larger than `max_size` before
/// reading.
pub(crate) fn load_bounded_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    max_size: u64,
) -> Result<T, String> {
    let metadata =
        fs::metadata(path).map_err(|e| format!("cannot stat {}: {e}", path.display()))?;
    if metadata.len() > max_size {
        return Err(format!(
            "snapshot {} exceeds {max_size} bytes",
            path.display()
        ));
    }
    let content = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_slice(&content).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}
