//! Target table schema and strict row decoding.
//!
//! Backends are prompted to return a JSON object with a `table_data` array
//! of row objects. [`TableSchema::decode_rows`] is the single place that
//! payload is validated: anything that does not match the expected shape is
//! a decode error (which the backend adapters convert to a failure outcome),
//! and columns outside the schema are silently dropped.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// JSON key under which backends report extracted rows.
pub const TABLE_KEY: &str = "table_data";

/// A single extracted table row: schema column name to cell value.
///
/// Missing columns are simply absent; `None` is an explicitly empty cell.
pub type Row = BTreeMap<String, Option<String>>;

/// Errors constructing a [`TableSchema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema must contain at least one column")]
    Empty,
    #[error("schema column names must not be empty")]
    EmptyColumn,
    #[error("duplicate schema column: {0}")]
    DuplicateColumn(String),
}

/// Errors decoding a backend payload against the schema.
#[derive(Debug, Error)]
pub enum RowDecodeError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload is missing the `{TABLE_KEY}` key")]
    MissingTableKey,
    #[error("`{TABLE_KEY}` is not an array")]
    TableNotAnArray,
    #[error("row {index} is not an object")]
    RowNotAnObject { index: usize },
}

/// Ordered set of expected table column names, fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<String>,
}

impl TableSchema {
    /// Build a schema from an ordered list of column names.
    ///
    /// Columns must be non-empty and unique; an empty list is rejected.
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(SchemaError::EmptyColumn);
            }
            if columns[..i].contains(column) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// The deployment default: columns of the scanned financial records
    /// this service was built for.
    pub fn financial() -> Self {
        Self {
            columns: [
                "Customer Name",
                "Transaction Number",
                "Invoice Number",
                "Original/Bal Amount",
                "WHT Amount",
                "Paid Amount (NET)",
                "Description",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Column names in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Strictly decode a backend payload into rows.
    ///
    /// The payload must be `{ "table_data": [ {col: value, ...}, ... ] }`.
    /// Unknown columns are dropped; string values are kept as-is, nulls
    /// become empty cells, and other scalars are stringified. A row with no
    /// recognized columns left after filtering is discarded.
    pub fn decode_rows(&self, payload: &Value) -> Result<Vec<Row>, RowDecodeError> {
        let object = payload.as_object().ok_or(RowDecodeError::NotAnObject)?;
        let table = object.get(TABLE_KEY).ok_or(RowDecodeError::MissingTableKey)?;
        let items = table.as_array().ok_or(RowDecodeError::TableNotAnArray)?;

        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let fields = item
                .as_object()
                .ok_or(RowDecodeError::RowNotAnObject { index })?;

            let mut row = Row::new();
            for (key, value) in fields {
                if !self.contains(key) {
                    continue;
                }
                let cell = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                row.insert(key.clone(), cell);
            }

            if !row.is_empty() {
                rows.push(row);
            }
        }

        Ok(rows)
    }
}
