//! Provider-agnostic tabular response

use chrono::NaiveDate;
use std::fmt::Display;

/// A single cell as returned by a provider, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// Seconds since the unix epoch
    Timestamp(i64),
}

impl RawValue {
    pub fn is_temporal(&self) -> bool {
        matches!(self, RawValue::Date(_) | RawValue::Timestamp(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawValue::Null, RawValue::Number)
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(RawValue::Null, RawValue::Number),
            serde_json::Value::String(s) => RawValue::Text(s.clone()),
            // Arrays carry no scalar meaning for a cell
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => RawValue::Null,
        }
    }
}

/// Possibly hierarchical field name, e.g. `["indicators", "quote", "close"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldName(Vec<String>);

impl FieldName {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldName(components.into_iter().map(Into::into).collect())
    }

    /// Joins the components with an underscore.
    pub fn flatten(&self) -> String {
        self.0.join("_")
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        FieldName(vec![name.to_string()])
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: FieldName,
    pub values: Vec<RawValue>,
}

/// Column-oriented table. Every column holds the same number of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    row_count: usize,
}

impl RawTable {
    pub fn new(columns: Vec<RawColumn>) -> Result<Self, RaggedTable> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(column) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(RaggedTable {
                column: column.name.flatten(),
                expected: row_count,
                found: column.values.len(),
            });
        }
        Ok(RawTable { columns, row_count })
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column {column} has {found} values, expected {expected}")]
pub struct RaggedTable {
    pub column: String,
    pub expected: usize,
    pub found: usize,
}
