//! `<table>.tbl` → `INSERT INTO <TABLE> VALUES (...)` scripts.

use super::{remove_source, DelimitedReader, StatementWriter, WriteMode};
use crate::error::Result;
use crate::table::TableName;
use std::path::Path;

/// Build the INSERT statement for one record.
///
/// Every field is wrapped in single quotes and fields are joined with `", "`.
/// Field content is emitted verbatim.
pub fn insert_statement<S: AsRef<str>>(table: TableName, fields: &[S]) -> String {
    let values = fields
        .iter()
        .map(|f| format!("'{}'", f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} VALUES ({})", table.sql_name(), values)
}

/// Convert a delimited record file into an INSERT script.
///
/// Returns the number of statements written. The source file is removed once the
/// destination has been closed; if writing fails the source is left in place.
pub fn convert_records(
    table: TableName,
    source: &Path,
    destination: &Path,
    mode: WriteMode,
) -> Result<u64> {
    let records = DelimitedReader::open(source)?;
    let mut writer = StatementWriter::open(destination, mode)?;

    for record in records {
        writer.write_statement(&insert_statement(table, &record?))?;
    }

    let written = writer.finish()?;
    remove_source(source)?;

    tracing::debug!(
        "Converted {} {} rows from {} into {}",
        written,
        table,
        source.display(),
        destination.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tempfile::TempDir;

    #[test]
    fn test_insert_statement_quotes_fields() {
        let fields = crate::transform::split_record("1|2|x");
        assert_eq!(
            insert_statement(TableName::Region, &fields),
            "INSERT INTO REGION VALUES ('1', '2')"
        );
    }

    #[test]
    fn test_convert_records_one_statement_per_line() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("region.tbl");
        let destination = dir.path().join("region.sql");
        std::fs::write(
            &source,
            "0|AFRICA|lar deposits|\n1|AMERICA|hs use ironic|\n2|ASIA|ges. thinly|\n",
        )
        .unwrap();

        let written =
            convert_records(TableName::Region, &source, &destination, WriteMode::Overwrite).unwrap();

        assert_eq!(written, 3);
        let output = std::fs::read_to_string(&destination).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.starts_with("INSERT INTO REGION VALUES (")));
        assert_eq!(lines[1], "INSERT INTO REGION VALUES ('1', 'AMERICA', 'hs use ironic')");
        assert!(!source.exists());
    }

    #[test]
    fn test_convert_records_append() {
        let dir = TempDir::new().unwrap();
        let orders = dir.path().join("orders.tbl.u1");
        let lineitem = dir.path().join("lineitem.tbl.u1");
        let rf1 = dir.path().join("RF1.sql");
        std::fs::write(&orders, "7|39136|O|\n").unwrap();
        std::fs::write(&lineitem, "7|1|2|\n7|2|5|\n").unwrap();

        convert_records(TableName::Orders, &orders, &rf1, WriteMode::Overwrite).unwrap();
        convert_records(TableName::Lineitem, &lineitem, &rf1, WriteMode::Append).unwrap();

        let output = std::fs::read_to_string(&rf1).unwrap();
        assert_eq!(
            output,
            "INSERT INTO ORDERS VALUES ('7', '39136', 'O')\n\
             INSERT INTO LINEITEM VALUES ('7', '1', '2')\n\
             INSERT INTO LINEITEM VALUES ('7', '2', '5')\n"
        );
    }

    #[test]
    fn test_convert_records_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = convert_records(
            TableName::Part,
            &dir.path().join("part.tbl"),
            &dir.path().join("part.sql"),
            WriteMode::Overwrite,
        );
        assert!(matches!(result, Err(PipelineError::SourceNotFound { .. })));
    }

    #[test]
    fn test_convert_records_keeps_source_when_destination_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("nation.tbl");
        std::fs::write(&source, "0|ALGERIA|0|\n").unwrap();
        // Parent directory does not exist
        let destination = dir.path().join("nowhere").join("nation.sql");

        let result = convert_records(TableName::Nation, &source, &destination, WriteMode::Overwrite);

        assert!(matches!(result, Err(PipelineError::DestinationWriteError { .. })));
        assert!(source.exists());
    }
}
