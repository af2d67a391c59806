//! Uploaded contact table: an ordered column list plus rows validated against it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TableError;

/// One contact row. Keys and values are trimmed on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: BTreeMap<String, String>,
}

impl Row {
    /// Build a row from `(column, value)` pairs, trimming both sides.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let cells = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
            .collect();
        Self { cells }
    }

    /// Value for an exact column name, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Value for a column, empty when the column is missing.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A parsed upload. Every row only uses columns from `columns`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Validate `rows` against `columns`.
    ///
    /// Column names are trimmed; empty or duplicate names are rejected, as is
    /// any row carrying a key outside the declared set.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let columns = normalize_columns(columns)?;
        let declared: HashSet<&str> = columns.iter().map(String::as_str).collect();

        for (index, row) in rows.iter().enumerate() {
            if let Some(column) = row.columns().find(|c| !declared.contains(c)) {
                return Err(TableError::UnknownColumn {
                    row: index,
                    column: column.to_string(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    /// Build a table from JSON records as produced by the spreadsheet parser.
    ///
    /// `null` cells become empty strings; numbers and booleans are stringified.
    pub fn from_records(columns: Vec<String>, records: Vec<Value>) -> Result<Self, TableError> {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| match record {
                Value::Object(map) => Ok(Row::from_pairs(
                    map.into_iter().map(|(k, v)| (k, cell_to_string(v))),
                )),
                _ => Err(TableError::NotAnObject(index)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Wire shape of an uploaded table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInput {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Value>,
}

impl TryFrom<TableInput> for Table {
    type Error = TableError;

    fn try_from(input: TableInput) -> Result<Self, Self::Error> {
        Table::from_records(input.columns, input.rows)
    }
}

fn normalize_columns(columns: Vec<String>) -> Result<Vec<String>, TableError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(columns.len());
    for column in columns {
        let column = column.trim().to_string();
        if column.is_empty() {
            return Err(TableError::EmptyColumnName);
        }
        if !seen.insert(column.clone()) {
            return Err(TableError::DuplicateColumn(column));
        }
        out.push(column);
    }
    Ok(out)
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
