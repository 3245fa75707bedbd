//! Raster input/output

pub mod geotiff;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecoveryError;

/// All regular files in `dir` whose name ends with `suffix`, sorted by name.
///
/// # Errors
/// Returns [`RecoveryError::Io`] when the directory cannot be read.
pub fn list_files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, RecoveryError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| RecoveryError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    files.sort();
    Ok(files)
}
