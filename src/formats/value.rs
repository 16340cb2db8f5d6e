//! Cell-level value handling: null detection and value-kind classification

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single cell of a row. `None` is the null marker.
pub type Cell = Option<String>;

/// A row of cells aligned positionally to the column descriptors
pub type Row = Vec<Cell>;

/// Tokens treated as "no data" when they make up an entire cell
///
/// This mirrors the NA token set recognized by common dataframe CSV readers,
/// so a file exported from one round-trips its missing values as SQL NULL.
const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Date-time formats recognized as timestamps
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",    // 2025-01-01 12:34:56
    "%Y-%m-%dT%H:%M:%S",    // 2025-01-01T12:34:56 (ISO 8601)
    "%Y-%m-%d %H:%M:%S%.f", // With fractional seconds
    "%Y-%m-%dT%H:%M:%S%.f", // ISO 8601 with fractional seconds
    "%Y-%m-%d %H:%M",       // Without seconds
    "%Y-%m-%dT%H:%M",       // ISO 8601 without seconds
];

/// The kind of a single cell value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

/// Check whether a raw cell is a missing/NaN-equivalent value
pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw.trim())
}

/// Classify a single raw cell
///
/// Kinds are tried from most to least specific: Integer, Float, Boolean,
/// Timestamp, then Text.
pub fn classify(raw: &str) -> ValueKind {
    if is_null_token(raw) {
        return ValueKind::Null;
    }
    let trimmed = raw.trim();

    if trimmed.parse::<i64>().is_ok() {
        return ValueKind::Integer;
    }
    if parse_float(trimmed).is_some() {
        return ValueKind::Float;
    }
    if parse_bool(trimmed).is_some() {
        return ValueKind::Boolean;
    }
    if parse_timestamp(trimmed).is_some() {
        return ValueKind::Timestamp;
    }

    ValueKind::Text
}

/// Parse a finite float. Words like `inf` are rejected so they stay text.
pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a timestamp; a bare ISO date is taken as midnight
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Replace missing/NaN-equivalent cells with the null marker
///
/// Other cells pass through unchanged, surrounding whitespace included.
pub fn normalize_row(row: Row) -> Row {
    row.into_iter()
        .map(|cell| cell.filter(|raw| !is_null_token(raw)))
        .collect()
}
