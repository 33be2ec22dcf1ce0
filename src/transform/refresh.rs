//! Splitting of the multi-statement query 15 text into executable fragments.

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};

/// Blank-line separator between the statements of a query template.
const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Fragments of a multi-statement query, preamble excluded.
pub fn refresh_fragments(text: &str) -> Vec<&str> {
    text.split(FRAGMENT_SEPARATOR).skip(1).collect()
}

/// Split `source` into `<stem>.1.sql`, `<stem>.2.sql`, ... inside `output_dir`.
///
/// Returns the written fragment paths in document order. Empty fragments still
/// produce (empty) files. The source file is left untouched.
pub fn split_refresh_query(source: &Path, output_dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(source).map_err(|e| PipelineError::open_source(source, e))?;

    refresh_fragments(&text)
        .into_iter()
        .enumerate()
        .map(|(i, fragment)| {
            let path = output_dir.join(format!("{}.{}.sql", stem, i + 1));
            std::fs::write(&path, fragment).map_err(|e| PipelineError::write(&path, e))?;
            Ok(path)
        })
        .collect()
}
