//! Destination seam: the operations the loader needs from a database, plus
//! INSERT statement construction shared by every backend.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::schema::{ColumnDescriptor, SemanticType, TableSchema, quote_identifier};
use crate::config::MAX_BIND_PARAMS;
use crate::error::{LoadError, LoadResult};
use crate::formats::value::{Cell, Row, parse_bool, parse_float, parse_timestamp};

/// Destination for loaded tables
#[async_trait]
pub trait TableSink: Send {
    /// Create the table if it is absent, then return the column names the
    /// table actually has. An existing table is never altered.
    async fn ensure_table(&mut self, table: &str, schema: &TableSchema)
    -> LoadResult<Vec<String>>;

    /// Insert one batch of rows and commit it. Returns the number of rows
    /// inserted.
    async fn insert_batch(
        &mut self,
        table: &str,
        schema: &TableSchema,
        rows: &[Row],
    ) -> LoadResult<u64>;
}

/// A cell converted to the Rust type bound for its column
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl SqlValue {
    /// Convert a normalized cell according to its column's semantic type
    pub fn from_cell(cell: &Cell, column: &ColumnDescriptor) -> LoadResult<Self> {
        let Some(raw) = cell else {
            return Ok(SqlValue::Null);
        };

        let invalid = || LoadError::InvalidValue {
            column: column.name.clone(),
            raw: raw.clone(),
            expected: column.semantic_type,
        };

        Ok(match column.semantic_type {
            SemanticType::Integer => {
                SqlValue::Integer(raw.trim().parse::<i64>().map_err(|_| invalid())?)
            }
            SemanticType::Float => SqlValue::Float(parse_float(raw).ok_or_else(invalid)?),
            SemanticType::Boolean => SqlValue::Boolean(parse_bool(raw).ok_or_else(invalid)?),
            SemanticType::Timestamp => {
                SqlValue::Timestamp(parse_timestamp(raw).ok_or_else(invalid)?)
            }
            SemanticType::Text => SqlValue::Text(raw.clone()),
        })
    }
}

/// A single multi-row INSERT with its bind values in placeholder order
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
    pub row_count: usize,
}

/// Build the INSERT statements for one batch
///
/// A batch normally produces a single statement:
/// `INSERT INTO t (c1, c2) VALUES (?, ?), (?, ?), ...`. Wide tables are split
/// so no statement binds more than `MAX_BIND_PARAMS` values.
pub fn build_insert_statements(
    table: &str,
    schema: &TableSchema,
    rows: &[Row],
) -> LoadResult<Vec<InsertStatement>> {
    let num_columns = schema.columns.len().max(1);
    let rows_per_statement = (MAX_BIND_PARAMS / num_columns).max(1);

    let column_list = schema
        .columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let row_placeholders = format!("({})", vec!["?"; num_columns].join(", "));

    rows.chunks(rows_per_statement)
        .map(|chunk| {
            let values_clause = vec![row_placeholders.as_str(); chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                quote_identifier(table),
                column_list,
                values_clause
            );

            let mut values = Vec::with_capacity(chunk.len() * num_columns);
            for row in chunk {
                for (cell, column) in row.iter().zip(&schema.columns) {
                    values.push(SqlValue::from_cell(cell, column)?);
                }
            }

            Ok(InsertStatement {
                sql,
                values,
                row_count: chunk.len(),
            })
        })
        .collect()
}
