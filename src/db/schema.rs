use std::collections::HashMap;

use crate::error::{LoadError, LoadResult};
use crate::formats::DelimitedFile;
use crate::formats::value::{ValueKind, classify};

/// Semantic column type inferred from a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

impl SemanticType {
    /// Returns the SQL type name used in CREATE TABLE
    pub fn to_sql(&self) -> &'static str {
        match self {
            SemanticType::Integer => "INT",
            SemanticType::Float => "FLOAT",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Timestamp => "DATETIME",
            SemanticType::Text => "TEXT",
        }
    }

    /// Semantic type of a single classified value, `None` for nulls
    fn from_kind(kind: ValueKind) -> Option<SemanticType> {
        match kind {
            ValueKind::Null => None,
            ValueKind::Integer => Some(SemanticType::Integer),
            ValueKind::Float => Some(SemanticType::Float),
            ValueKind::Boolean => Some(SemanticType::Boolean),
            ValueKind::Timestamp => Some(SemanticType::Timestamp),
            ValueKind::Text => Some(SemanticType::Text),
        }
    }

    /// Find the most specific type that accommodates both types
    ///
    /// Integers widen to floats; every other disagreement falls back to text.
    pub fn common_type(&self, other: &SemanticType) -> SemanticType {
        use SemanticType::*;
        match (self, other) {
            (a, b) if a == b => *a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }
}

/// A column of the destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Sanitized identifier used in SQL
    pub name: String,
    /// Header name as it appears in the input file
    pub source_name: String,
    pub semantic_type: SemanticType,
    /// Number of null cells seen in this column
    pub null_count: usize,
}

/// Inferred schema of one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Infer the schema of a materialized file
    ///
    /// Header names are first made unique with [`normalize_header_names`].
    /// Fails if two remaining names sanitize to the same identifier, compared
    /// case-insensitively as MySQL compares column names.
    pub fn infer(file: &DelimitedFile) -> LoadResult<Self> {
        let headers = normalize_header_names(&file.headers);
        let mut seen: HashMap<String, &str> = HashMap::with_capacity(headers.len());
        let mut columns = Vec::with_capacity(headers.len());

        for (col_idx, source_name) in headers.iter().enumerate() {
            let name = sanitize_column_name(source_name);

            if let Some(first) = seen.insert(name.to_ascii_lowercase(), source_name) {
                return Err(LoadError::DuplicateColumn {
                    name,
                    first: first.to_string(),
                    second: source_name.clone(),
                });
            }

            let (semantic_type, null_count) = infer_column(file.column_values(col_idx));

            columns.push(ColumnDescriptor {
                name,
                source_name: source_name.clone(),
                semantic_type,
                null_count,
            });
        }

        Ok(TableSchema { columns })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total number of null cells across all columns
    pub fn null_count(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }
}

/// Name blank headers and number repeated ones
///
/// A blank header at position `i` becomes `Unnamed: i`. The second occurrence
/// of a name `a` becomes `a.1`, the third `a.2`. A suffixed name that is
/// itself taken is suffixed again (`a.1.1`). Names that differ only after
/// sanitizing are left alone.
pub fn normalize_header_names(headers: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(headers.len());

    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let mut name = if header.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                header.clone()
            };

            let mut cur_count = counts.get(&name).copied().unwrap_or(0);
            while cur_count > 0 {
                counts.insert(name.clone(), cur_count + 1);
                name = format!("{}.{}", name, cur_count);
                cur_count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), cur_count + 1);

            name
        })
        .collect()
}

/// Replace spaces, hyphens and periods with underscores
pub fn sanitize_column_name(raw: &str) -> String {
    raw.replace([' ', '-', '.'], "_")
}

/// Quote an identifier with backticks, doubling any embedded backtick
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Infer the semantic type of a column from its values
///
/// Null cells do not take part in inference. A column with no non-null value
/// is text.
pub fn infer_type<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> SemanticType {
    infer_column(values).0
}

/// Infer a column's type and count its nulls in a single pass
fn infer_column<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> (SemanticType, usize) {
    let mut inferred_type: Option<SemanticType> = None;
    let mut null_count = 0;

    for value in values {
        let kind = value.map(classify).unwrap_or(ValueKind::Null);
        match SemanticType::from_kind(kind) {
            Some(val_type) => {
                inferred_type = Some(match inferred_type {
                    None => val_type,
                    Some(current) => current.common_type(&val_type),
                });
            }
            None => null_count += 1,
        }
    }

    (inferred_type.unwrap_or(SemanticType::Text), null_count)
}

/// Generate an idempotent DDL statement for the destination table
pub fn generate_ddl(table_name: &str, schema: &TableSchema) -> String {
    let column_defs: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            format!(
                "  {} {}",
                quote_identifier(&col.name),
                col.semantic_type.to_sql()
            )
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_identifier(table_name),
        column_defs.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(headers: &[&str], rows: &[&[&str]]) -> DelimitedFile {
        DelimitedFile {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        }
    }

    #[test]
    fn test_infer_type_priority() {
        assert_eq!(infer_type([Some("1"), Some("2")]), SemanticType::Integer);
        assert_eq!(infer_type([Some("1"), Some("2.5")]), SemanticType::Float);
        assert_eq!(
            infer_type([Some("true"), Some("False")]),
            SemanticType::Boolean
        );
        assert_eq!(
            infer_type([Some("2025-01-01"), Some("2025-01-02 10:00:00")]),
            SemanticType::Timestamp
        );
        assert_eq!(infer_type([Some("1"), Some("abc")]), SemanticType::Text);
    }

    #[test]
    fn test_mixed_types_fall_back_to_text() {
        assert_eq!(infer_type([Some("true"), Some("1")]), SemanticType::Text);
        assert_eq!(
            infer_type([Some("2025-01-01"), Some("3.5")]),
            SemanticType::Text
        );
    }

    #[test]
    fn test_nulls_are_ignored() {
        assert_eq!(
            infer_type([Some("1"), None, Some(""), Some("NaN")]),
            SemanticType::Integer
        );
        assert_eq!(infer_type([None, Some("")]), SemanticType::Text);
        assert_eq!(infer_type(std::iter::empty::<Option<&str>>()), SemanticType::Text);
    }

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("Order ID"), "Order_ID");
        assert_eq!(sanitize_column_name("Amount-USD"), "Amount_USD");
        assert_eq!(sanitize_column_name("v1.2 - final"), "v1_2___final");
        assert_eq!(sanitize_column_name("plain"), "plain");
    }

    #[test]
    fn test_infer_schema() {
        let file = file(
            &["Order ID", "Amount-USD", "Note"],
            &[&["1", "10.5", "first"], &["2", "3.25", ""]],
        );

        let schema = TableSchema::infer(&file).unwrap();

        assert_eq!(schema.column_names(), vec!["Order_ID", "Amount_USD", "Note"]);
        assert_eq!(schema.columns[0].semantic_type, SemanticType::Integer);
        assert_eq!(schema.columns[1].semantic_type, SemanticType::Float);
        assert_eq!(schema.columns[2].semantic_type, SemanticType::Text);
        assert_eq!(schema.columns[2].source_name, "Note");
        assert_eq!(schema.columns[2].null_count, 1);
        assert_eq!(schema.null_count(), 1);
    }

    #[test]
    fn test_duplicate_sanitized_names_rejected() {
        let file = file(&["Order.ID", "Order ID"], &[&["1", "2"]]);

        let err = TableSchema::infer(&file).unwrap_err();

        match err {
            LoadError::DuplicateColumn {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "Order_ID");
                assert_eq!(first, "Order.ID");
                assert_eq!(second, "Order ID");
            }
            other => panic!("Expected DuplicateColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_check_ignores_case() {
        let file = file(&["Order ID", "order_id"], &[&["1", "2"]]);

        let err = TableSchema::infer(&file).unwrap_err();

        assert!(matches!(
            err,
            LoadError::DuplicateColumn { ref name, .. } if name == "order_id"
        ));
    }

    #[test]
    fn test_blank_headers_are_named_by_position() {
        let file = file(&["", "a"], &[&["0", "1"], &["1", "3"]]);

        let schema = TableSchema::infer(&file).unwrap();

        assert_eq!(schema.column_names(), vec!["Unnamed:_0", "a"]);
        assert_eq!(schema.columns[0].source_name, "Unnamed: 0");
        assert_eq!(schema.columns[0].semantic_type, SemanticType::Integer);
    }

    #[test]
    fn test_repeated_headers_are_numbered() {
        let file = file(&["", "a", "a", "a"], &[&["0", "1", "x", "2.5"]]);

        let schema = TableSchema::infer(&file).unwrap();

        assert_eq!(schema.column_names(), vec!["Unnamed:_0", "a", "a_1", "a_2"]);
        assert_eq!(schema.columns[2].semantic_type, SemanticType::Text);
        assert_eq!(schema.columns[3].semantic_type, SemanticType::Float);
    }

    #[test]
    fn test_normalize_header_names_resuffixes_taken_names() {
        let headers: Vec<String> = ["a", "a.1", "a", ""]
            .iter()
            .map(|h| h.to_string())
            .collect();

        assert_eq!(
            normalize_header_names(&headers),
            vec!["a", "a.1", "a.1.1", "Unnamed: 3"]
        );
    }

    #[test]
    fn test_generate_ddl() {
        let file = file(
            &["Order ID", "Amount-USD", "Note"],
            &[&["1", "10.5", "first"], &["2", "3.25", ""]],
        );
        let schema = TableSchema::infer(&file).unwrap();

        let ddl = generate_ddl("orders", &schema);

        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `orders` ("));
        assert!(ddl.contains("`Order_ID` INT"));
        assert!(ddl.contains("`Amount_USD` FLOAT"));
        assert!(ddl.contains("`Note` TEXT"));
        assert!(!ddl.contains("NOT NULL"));
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("a`b"), "`a``b`");
    }
}
