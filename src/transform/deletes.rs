//! `delete.<n>` → paired LINEITEM/ORDERS DELETE scripts.

use super::{remove_source, DelimitedReader, StatementWriter, WriteMode};
use crate::error::Result;
use std::path::Path;

/// How delete keys are rendered into the WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteKeyFormat {
    /// Keys concatenated as-is: `= 42`.
    #[default]
    Raw,
    /// Each key wrapped in single quotes before concatenation: `= '42'`.
    Quoted,
}

impl DeleteKeyFormat {
    fn render<S: AsRef<str>>(self, keys: &[S]) -> String {
        match self {
            DeleteKeyFormat::Raw => keys.iter().map(|k| k.as_ref()).collect(),
            DeleteKeyFormat::Quoted => keys.iter().map(|k| format!("'{}'", k.as_ref())).collect(),
        }
    }
}

/// The two statements for one delete record, LINEITEM first.
pub fn delete_statements<S: AsRef<str>>(keys: &[S], format: DeleteKeyFormat) -> [String; 2] {
    let key = format.render(keys);
    [
        format!("DELETE FROM LINEITEM WHERE L_ORDERKEY = {}", key),
        format!("DELETE FROM ORDERS WHERE O_ORDERKEY = {}", key),
    ]
}

/// Convert a delete-key file into a DELETE script.
///
/// Returns the number of delete records converted (half the statement count).
pub fn convert_deletes(
    source: &Path,
    destination: &Path,
    mode: WriteMode,
    format: DeleteKeyFormat,
) -> Result<u64> {
    let records = DelimitedReader::open(source)?;
    let mut writer = StatementWriter::open(destination, mode)?;

    let mut converted = 0u64;
    for record in records {
        for statement in delete_statements(&record?, format) {
            writer.write_statement(&statement)?;
        }
        converted += 1;
    }

    writer.finish()?;
    remove_source(source)?;

    tracing::debug!("Converted {} delete keys from {}", converted, source.display());
    Ok(converted)
}
