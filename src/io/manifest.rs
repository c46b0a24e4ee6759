//! Batch manifest parsing.
//!
//! The manifest is a plain text file with one record-file path per line;
//! blank lines are skipped. Line order defines the job enumeration order, so
//! every worker derives the identical assignment from the same file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Read the manifest. Unreadable manifests are process-fatal: the batch must
/// not start with an ambiguous job enumeration.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to read manifest '{}': {e}", path.display()),
        )
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Dataset identifier for a record path: the file stem.
pub fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}
