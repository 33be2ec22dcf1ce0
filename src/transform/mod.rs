//! Conversion of generator output into executable statement streams.
//!
//! Each converter reads one `|`-delimited file produced by dbgen and writes one
//! statement per line to a destination script. The source is a transient artifact:
//! it is removed only once the destination has been flushed and closed.

mod deletes;
mod records;
mod refresh;

pub use deletes::{convert_deletes, delete_statements, DeleteKeyFormat};
pub use records::{convert_records, insert_statement};
pub use refresh::{refresh_fragments, split_refresh_query};

use crate::error::{PipelineError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// Field separator used by dbgen.
pub const FIELD_DELIMITER: char = '|';

/// How a destination script is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate any existing content.
    Overwrite,
    /// Keep existing content and append after it.
    Append,
}

/// Iterator over the records of a delimited file.
///
/// Every line yields its fields with the trailing terminator field removed.
/// Blank lines are skipped. Field counts are not checked.
pub struct DelimitedReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl DelimitedReader {
    /// Open a delimited file, mapping a missing file to `SourceNotFound`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::open_source(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for DelimitedReader {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(PipelineError::io(&self.path, e))),
            };
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.is_empty() {
                continue;
            }
            return Some(Ok(split_record(line)));
        }
    }
}

/// Split one record line and drop the generator's terminator field.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields: Vec<String> = line.split(FIELD_DELIMITER).map(str::to_string).collect();
    fields.pop();
    fields
}

/// Buffered statement sink that counts what it writes.
pub(crate) struct StatementWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl StatementWriter {
    pub(crate) fn open(path: &Path, mode: WriteMode) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Overwrite => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let file = options.open(path).map_err(|e| PipelineError::write(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Write one statement followed by a line break.
    pub(crate) fn write_statement(&mut self, statement: &str) -> Result<()> {
        self.writer
            .write_all(statement.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| PipelineError::write(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    /// Flush and close the destination, returning the number of statements written.
    pub(crate) fn finish(self) -> Result<u64> {
        let path = self.path;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| PipelineError::write(&path, e.into_error()))?;
        file.sync_all().map_err(|e| PipelineError::write(&path, e))?;
        Ok(self.written)
    }
}

/// Remove a consumed source file.
pub(crate) fn remove_source(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_record_drops_terminator() {
        assert_eq!(split_record("1|2|x"), vec!["1", "2"]);
        assert_eq!(split_record("0|AFRICA|lar deposits|"), vec!["0", "AFRICA", "lar deposits"]);
        assert!(split_record("only").is_empty());
    }

    #[test]
    fn test_reader_skips_blank_lines_and_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nation.tbl");
        std::fs::write(&path, "0|ALGERIA|0|\r\n\n1|ARGENTINA|1|\n").unwrap();

        let records: Vec<Vec<String>> = DelimitedReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["0", "ALGERIA", "0"]);
        assert_eq!(records[1], vec!["1", "ARGENTINA", "1"]);
    }

    #[test]
    fn test_reader_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = DelimitedReader::open(&dir.path().join("missing.tbl"));
        assert!(matches!(result, Err(PipelineError::SourceNotFound { .. })));
    }

    #[test]
    fn test_writer_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.sql");

        let mut writer = StatementWriter::open(&path, WriteMode::Overwrite).unwrap();
        writer.write_statement("A").unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        let mut writer = StatementWriter::open(&path, WriteMode::Append).unwrap();
        writer.write_statement("B").unwrap();
        writer.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nB\n");

        let mut writer = StatementWriter::open(&path, WriteMode::Overwrite).unwrap();
        writer.write_statement("C").unwrap();
        writer.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "C\n");
    }
}
