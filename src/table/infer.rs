//! Column-kind inference over untyped cell values.
//!
//! Classification is a pure function of a column's name and its cells and
//! knows nothing about the table that holds them.

use crate::models::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Naive date-time layouts accepted for textual timestamps.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Numbers at or above this magnitude are read as Unix milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Inferred kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Temporal,
    Numeric,
    Opaque,
}

/// Whether a column name follows the time-axis naming convention.
pub fn is_time_column(name: &str, time_token: &str) -> bool {
    name.to_lowercase().contains(&time_token.to_lowercase())
}

/// Parse a cell as a number. Booleans and timestamps are not numbers.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(x) if x.is_finite() => Some(*x),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

/// Parse a cell as a timestamp.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Text(s) => parse_timestamp_str(s),
        Value::Integer(i) => from_epoch(*i as f64),
        Value::Float(x) => from_epoch(*x),
        Value::Null | Value::Bool(_) => None,
    }
}

/// Parse a textual timestamp (RFC 3339, ISO-like or German date formats).
pub fn parse_timestamp_str(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    ["%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn from_epoch(raw: f64) -> Option<NaiveDateTime> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() < EPOCH_MILLIS_THRESHOLD {
        raw * 1000.0
    } else {
        raw
    };
    DateTime::from_timestamp_millis(millis as i64).map(|ts| ts.naive_utc())
}

/// Classify a column. Temporal wins over numeric, numeric over opaque.
///
/// A column is temporal when its name carries the time token and every
/// non-null cell parses as a timestamp; numeric when every non-null cell
/// parses as a number. Columns without any non-null cell are opaque.
pub fn classify_column<'a, I>(name: &str, cells: I, time_token: &str) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let cells: Vec<&Value> = cells.into_iter().filter(|v| !v.is_null()).collect();
    if cells.is_empty() {
        return ColumnKind::Opaque;
    }

    if is_time_column(name, time_token) && cells.iter().all(|v| parse_timestamp(v).is_some()) {
        return ColumnKind::Temporal;
    }

    if cells.iter().all(|v| parse_number(v).is_some()) {
        return ColumnKind::Numeric;
    }

    ColumnKind::Opaque
}
