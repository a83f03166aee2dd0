//! Tabular normalization of heterogeneous records.
//!
//! Records fetched from the store rarely share one shape. [`Table::from_records`]
//! coerces them into a rectangle whose columns are the ordered union of all
//! keys; the inference helpers pick the time axis and numeric columns.

mod infer;

pub use infer::{
    classify_column, is_time_column, parse_number, parse_timestamp, parse_timestamp_str,
    ColumnKind,
};

use crate::models::{Record, Value};

/// Rectangular view over a record sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Identifier columns; never numeric, whatever their cells hold.
    key_columns: Vec<String>,
}

impl Table {
    /// Build a table from records. Columns follow first-seen key order and a
    /// record missing a key contributes a null cell. No records, no columns.
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self {
            columns,
            rows,
            key_columns: Vec::new(),
        }
    }

    /// Mark identifier columns such as the subject field or document id.
    pub fn with_key_columns<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns.extend(keys.into_iter().map(Into::into));
        self
    }

    fn is_key_column(&self, name: &str) -> bool {
        self.key_columns.iter().any(|k| k == name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True for the zero-row table downstream code short-circuits on.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Inferred kind of every column, in column order. Key columns are
    /// always opaque.
    pub fn column_kinds(&self, time_token: &str) -> Vec<(&str, ColumnKind)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                if self.is_key_column(name) {
                    return (name.as_str(), ColumnKind::Opaque);
                }
                let cells = self.rows.iter().map(|row| &row[index]);
                (name.as_str(), classify_column(name, cells, time_token))
            })
            .collect()
    }

    /// First column whose name contains the time token, case-insensitive.
    pub fn time_axis(&self, time_token: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|name| is_time_column(name, time_token))
            .map(String::as_str)
    }

    /// Columns whose non-null cells all parse as numbers, in column order,
    /// key columns excluded.
    pub fn numeric_columns(&self, time_token: &str) -> Vec<&str> {
        self.column_kinds(time_token)
            .into_iter()
            .filter(|(_, kind)| *kind == ColumnKind::Numeric)
            .map(|(name, _)| name)
            .collect()
    }

    /// Default value axis: the first numeric column.
    pub fn value_axis(&self, time_token: &str) -> Option<&str> {
        self.numeric_columns(time_token).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new()
                .with("userId", text("Larissa"))
                .with("zeitpunkt", text("2024-05-01 08:00"))
                .with("bristol", Value::Integer(4)),
            Record::new()
                .with("userId", text("Larissa"))
                .with("bristol", Value::Integer(6))
                .with("schmerz", Value::Float(2.5)),
            Record::new()
                .with("notiz", text("nach dem Essen"))
                .with("zeitpunkt", text("2024-05-02 09:15")),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        let table = Table::from_records(&[]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert_eq!(table.time_axis("zeit"), None);
        assert!(table.numeric_columns("zeit").is_empty());
    }

    #[test]
    fn test_columns_are_ordered_union() {
        let table = Table::from_records(&sample_records());
        assert_eq!(
            table.columns(),
            &["userId", "zeitpunkt", "bristol", "schmerz", "notiz"]
        );
        assert_eq!(table.row_count(), 3);
        for row in table.rows() {
            assert_eq!(row.len(), table.columns().len());
        }
    }

    #[test]
    fn test_missing_fields_become_null() {
        let table = Table::from_records(&sample_records());
        let schmerz = table.column("schmerz").unwrap();
        assert_eq!(schmerz, vec![&Value::Null, &Value::Float(2.5), &Value::Null]);
        assert!(table.column("unbekannt").is_none());
    }

    #[test]
    fn test_time_axis_is_first_matching_column() {
        let records = vec![Record::new()
            .with("wert", Value::Integer(3))
            .with("Erfasszeit", text("2024-05-01 08:00"))
            .with("zeitpunkt", text("2024-05-01 08:00"))];
        let table = Table::from_records(&records);
        assert_eq!(table.time_axis("zeit"), Some("Erfasszeit"));
        assert_eq!(table.time_axis("datum"), None);
    }

    #[test]
    fn test_numeric_columns_in_column_order() {
        let table = Table::from_records(&sample_records());
        assert_eq!(table.numeric_columns("zeit"), vec!["bristol", "schmerz"]);
        assert_eq!(table.value_axis("zeit"), Some("bristol"));
    }

    #[test]
    fn test_single_bad_cell_disqualifies_column() {
        let records = vec![
            Record::new().with("bristol", Value::Integer(4)),
            Record::new().with("bristol", text("weich")),
        ];
        let table = Table::from_records(&records);
        assert!(table.numeric_columns("zeit").is_empty());
        assert_eq!(table.value_axis("zeit"), None);
    }

    #[test]
    fn test_numeric_looking_keys_are_not_values() {
        let records: Vec<Record> = [(4, "101"), (6, "102")]
            .into_iter()
            .map(|(bristol, id)| {
                Record::new()
                    .with("userId", text("1042"))
                    .with("zeitpunkt", text("2024-05-01 08:00"))
                    .with("bristol", Value::Integer(bristol))
                    .with("id", text(id))
            })
            .collect();

        let plain = Table::from_records(&records);
        assert_eq!(plain.value_axis("zeit"), Some("userId"));

        let table = plain.with_key_columns(["userId", "id"]);
        assert_eq!(table.numeric_columns("zeit"), vec!["bristol"]);
        assert_eq!(table.value_axis("zeit"), Some("bristol"));
        assert_eq!(table.column_kinds("zeit")[0], ("userId", ColumnKind::Opaque));
    }

    #[test]
    fn test_column_kinds() {
        let table = Table::from_records(&sample_records());
        let kinds = table.column_kinds("zeit");
        assert_eq!(
            kinds,
            vec![
                ("userId", ColumnKind::Opaque),
                ("zeitpunkt", ColumnKind::Temporal),
                ("bristol", ColumnKind::Numeric),
                ("schmerz", ColumnKind::Numeric),
                ("notiz", ColumnKind::Opaque),
            ]
        );
    }
}
