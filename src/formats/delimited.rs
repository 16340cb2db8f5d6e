use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::formats::reader::DelimitedConfig;
use crate::formats::value::Row;

/// A fully materialized delimited file: header names plus data rows
#[derive(Debug, Clone)]
pub struct DelimitedFile {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl DelimitedFile {
    /// Values of a single column across all rows, in source order
    pub fn column_values(&self, col_idx: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(col_idx).and_then(|cell| cell.as_deref()))
    }
}

/// Read a delimited file with a header row into memory
///
/// Rows shorter than the header are padded with null cells; rows longer than
/// the header are rejected. Cells are returned raw, null detection is left to
/// the caller.
pub fn read_delimited(path: &Path, config: &DelimitedConfig) -> LoadResult<DelimitedFile> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .quote(config.quote)
        .has_headers(false) // The header is taken from the first record below
        .flexible(true)
        .from_path(path)?;

    let mut records = csv_reader.records();

    let headers: Vec<String> = match records.next() {
        Some(header) => header?.iter().map(|s| s.to_string()).collect(),
        None => {
            return Err(LoadError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
    };

    let mut rows = Vec::new();

    for result in records {
        let record = result?;

        if record.len() > headers.len() {
            return Err(LoadError::RaggedRow {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: headers.len(),
                found: record.len(),
            });
        }

        let mut row: Row = record.iter().map(|s| Some(s.to_string())).collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }

    Ok(DelimitedFile { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_read_headers_and_rows() {
        let temp_file = write_csv(&[
            "id,name,email",
            "1,Alice,alice@example.com",
            "2,\"Bob, Jr.\",bob@example.com",
        ]);

        let file = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap();

        assert_eq!(file.headers, vec!["id", "name", "email"]);
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.rows[1][1].as_deref(), Some("Bob, Jr."));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let temp_file = write_csv(&["a,b,c", "1,2"]);

        let file = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap();

        assert_eq!(
            file.rows[0],
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let temp_file = write_csv(&["a,b", "1,2", "1,2,3"]);

        let err = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap_err();

        match err {
            LoadError::RaggedRow {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("Expected RaggedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let temp_file = NamedTempFile::new().unwrap();

        let err = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap_err();

        assert!(matches!(err, LoadError::EmptyInput { .. }));
    }

    #[test]
    fn test_header_only_file() {
        let temp_file = write_csv(&["id,name"]);

        let file = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap();

        assert_eq!(file.headers.len(), 2);
        assert!(file.rows.is_empty());
    }

    #[test]
    fn test_column_values() {
        let temp_file = write_csv(&["a,b", "1,x", "2"]);

        let file = read_delimited(temp_file.path(), &DelimitedConfig::csv()).unwrap();
        let values: Vec<_> = file.column_values(1).collect();

        assert_eq!(values, vec![Some("x"), None]);
    }
}
