//! Filesystem helpers for staging generator resources and run directories.

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Create `dir` (and parents) if it does not already exist.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        tracing::info!("Created output directory {}", dir.display());
    }
    Ok(())
}

/// Copy `names` from `from` into `to`, keeping file names (and permissions).
pub fn copy_files<S: AsRef<str>>(from: &Path, to: &Path, names: &[S]) -> Result<()> {
    for name in names {
        let source = from.join(name.as_ref());
        let destination = to.join(name.as_ref());
        if !source.is_file() {
            return Err(PipelineError::SourceNotFound { path: source });
        }
        std::fs::copy(&source, &destination).map_err(|e| PipelineError::write(&destination, e))?;
    }
    Ok(())
}

/// Remove `names` from `dir`. Every file must exist.
pub fn remove_files<S: AsRef<str>>(dir: &Path, names: &[S]) -> Result<()> {
    for name in names {
        let path = dir.join(name.as_ref());
        std::fs::remove_file(&path).map_err(|e| PipelineError::open_source(&path, e))?;
    }
    Ok(())
}

/// Create a fresh run directory named after the current time in milliseconds.
///
/// Fails if the directory already exists, so two runs never share one.
pub fn create_run_dir(parent: &Path) -> Result<PathBuf> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let dir = parent.join(millis.to_string());
    std::fs::create_dir(&dir).map_err(|e| PipelineError::io(&dir, e))?;
    Ok(dir)
}
