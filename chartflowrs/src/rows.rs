//! Row and column primitives shared by the transformation pipeline.
//!
//! Query results arrive as flat JSON objects with no declared schema; column
//! semantics are inferred per batch. When the execution layer does know its
//! column types, it can pass them along as [`TypeHints`] and the heuristics
//! are skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name to scalar value, in column order.
pub type Row = Map<String, Value>;

/// Chart-semantic classification of a column, derived per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Datetime,
    Numeric,
    Categorical,
}

/// Column metadata as reported by a query executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Driver-reported SQL type name, when available.
    pub data_type: Option<String>,
}

/// Driver-declared column roles. Detection heuristics are the fallback for
/// columns without a hint.
#[derive(Debug, Clone, Default)]
pub struct TypeHints {
    roles: HashMap<String, ColumnRole>,
}

impl TypeHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, role: ColumnRole) {
        self.roles.insert(column.into(), role);
    }

    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        self.roles.get(column).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Map driver column metadata to roles by SQL type name.
    pub fn from_columns(columns: &[ColumnMeta]) -> Self {
        let mut hints = Self::new();
        for col in columns {
            let Some(data_type) = &col.data_type else {
                continue;
            };
            let ty = data_type.to_ascii_lowercase();
            let role = if ty.contains("date") || ty.contains("time") {
                ColumnRole::Datetime
            } else if ty.contains("int")
                || ty.contains("decimal")
                || ty.contains("numeric")
                || ty.contains("float")
                || ty.contains("double")
                || ty.contains("real")
            {
                ColumnRole::Numeric
            } else {
                ColumnRole::Categorical
            };
            hints.insert(col.name.clone(), role);
        }
        hints
    }
}

/// Coerce a value to f64 the way chart accumulation does: numbers pass
/// through, numeric strings parse, booleans map to 0/1, everything else
/// (including null and absent) counts as 0.
pub(crate) fn numeric_or_zero(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Store an accumulated sum, keeping whole values as JSON integers.
pub(crate) fn number_from_f64(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Render a grouping value as a row key / column label. Null and absent
/// values yield `None` so callers can substitute their own placeholder.
pub(crate) fn value_label(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    }
}
