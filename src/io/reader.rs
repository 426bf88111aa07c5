//! File reading and atomic replacement.
//!
//! The snapshot backend reads its whole document at once and replaces it
//! wholesale on save; these helpers keep both sides free of partial states.

use crate::error::{IoError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads a file to string, or `None` if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not UTF-8.
///
/// # Examples
///
/// ```no_run
/// use hbnb_store::io::read_file_if_exists;
///
/// let content = read_file_if_exists("file.json").unwrap();
/// ```
pub fn read_file_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Ok(None);
    }

    std::fs::read_to_string(path_ref)
        .map(Some)
        .map_err(|e| {
            IoError::ReadFailed {
                path: path_ref.to_string_lossy().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

/// Replaces a file's content atomically.
///
/// Writes to a temporary file in the target's directory, syncs it, then
/// renames it over the target. Parent directories are created if needed.
/// On failure the previous content is left in place.
///
/// # Errors
///
/// Returns an error if directory creation, writing, or the rename fails.
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy().to_string();
    let write_failed = |e: std::io::Error| IoError::WriteFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    };

    let parent = match path_ref.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
            path: parent.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(content.as_bytes()).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path_ref).map_err(|e| write_failed(e.error))?;

    Ok(())
}
