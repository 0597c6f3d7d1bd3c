//! Tabular rows that feed a certificate batch

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MailMergeError, Result};

/// A loaded table of recipients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Identifier, usually the file stem
    pub id: String,
    /// Columns in sheet order
    pub columns: Vec<Column>,
    pub rows: Vec<DataRow>,
}

impl Dataset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn push_row(&mut self, row: DataRow) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }

    /// First `limit` rows, for showing a sample before a batch runs
    pub fn preview(&self, limit: usize) -> &[DataRow] {
        &self.rows[..limit.min(self.rows.len())]
    }

    /// Build a dataset from a JSON array of flat objects.
    ///
    /// Columns are the union of keys, each row's keys taken in sorted order.
    /// Nested values are kept as their JSON text.
    pub fn from_json_rows(id: impl Into<String>, json: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        let items = parsed
            .as_array()
            .ok_or_else(|| MailMergeError::InvalidDataset("expected a JSON array of objects".to_string()))?;

        let mut dataset = Dataset::new(id);
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                MailMergeError::InvalidDataset(format!("row {} is not a JSON object", index + 1))
            })?;
            let mut row = DataRow::new();
            for (key, value) in object {
                let value = Value::from_json(value);
                if seen.insert(key.clone()) {
                    dataset.push_column(Column::new(key.clone(), value.data_type().unwrap_or(DataType::Text)));
                }
                row.insert(key.clone(), value);
            }
            dataset.push_row(row);
        }
        Ok(dataset)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Data type detected for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Number,
    Date,
    Boolean,
}

/// One recipient, keyed by column name
pub type DataRow = HashMap<String, Value>;

/// A cell value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Boolean(bool),
    #[default]
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Text(_) => Some(DataType::Text),
            Value::Number(_) => Some(DataType::Number),
            Value::Date(_) => Some(DataType::Date),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Null => None,
        }
    }

    /// Text written into the certificate
    pub fn display_string(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => String::new(),
        }
    }

    fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Integers print without a decimal point; certificate numbers are often numeric cells
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
