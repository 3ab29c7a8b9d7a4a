//! File-backed state for the collector: the cross-run seen-id set, per-keyword
//! buckets and their three renderings, and the summary log.

pub mod bucket;
pub mod filename;
pub mod output;
pub mod seen_ids;
pub mod summary;

pub use bucket::Bucket;
pub use filename::sanitize_filename;
pub use output::{write_outputs, OutputPaths, CSV_HEADER};
pub use seen_ids::SeenIdSet;
pub use summary::{SummaryLog, SUMMARY_HEADER};

use harvester_core::StorageError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Replaces `path` with `bytes` without ever exposing a partial file: the
/// content goes to a sibling temp file first and is renamed into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp_path = temp_sibling(path);
    fs::write(&tmp_path, bytes).map_err(write_err)?;
    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(source));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/file.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("nested/out/file.json.tmp").exists());
    }
}
