use std::path::PathBuf;

use thiserror::Error;

use crate::db::schema::SemanticType;

/// Convenience result type for per-pair load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Reason a single (input, table) pair could not be loaded.
///
/// Every variant is contained to its pair: the run logs it and moves on to
/// the next pair.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file does not exist.
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    /// The input file has no header row.
    #[error("input file has no header row: {}", path.display())]
    EmptyInput { path: PathBuf },

    /// Underlying I/O error while reading the input.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited input.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A data row has more fields than the header names.
    #[error("line {line} has {found} fields but the header names {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Two header names collapse to the same identifier once sanitized.
    #[error("columns '{first}' and '{second}' both sanitize to '{name}'")]
    DuplicateColumn {
        name: String,
        first: String,
        second: String,
    },

    /// The destination table already exists without some inferred columns.
    #[error("table '{table}' exists but has no column(s) {}", missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    /// A cell could not be converted to its column's type at bind time.
    #[error("value '{raw}' in column '{column}' is not a valid {expected:?}")]
    InvalidValue {
        column: String,
        raw: String,
        expected: SemanticType,
    },

    /// Database error while creating the table or inserting a batch.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
