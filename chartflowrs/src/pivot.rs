//! Heuristic wide-pivot of an aggregate result set.
//!
//! Unlike the sparse series pivot in [`crate::chart`], the output here is
//! rectangular: every row carries every pivot column, zero-filled.

use serde_json::Value;

use crate::datetime::{parse_datetime_loose, Granularity};
use crate::rows::{number_from_f64, numeric_or_zero, value_label, Row};

const MISSING_PIVOT: &str = "Unset";

/// Column roles detected from a sample row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotKeys {
    pub row_key: String,
    pub pivot_key: String,
    pub value_key: String,
}

/// Wide pivot table plus the detected key columns it was built from. Only
/// valid for the batch it came from.
#[derive(Debug, Clone, Default)]
pub struct PivotResult {
    pub pivot_data: Vec<Row>,
    pub pivot_columns: Vec<String>,
    pub row_key: String,
    pub pivot_key: String,
    pub value_key: String,
}

/// Guess row/pivot/value columns from a sample row.
///
/// The value column prefers a numeric key named like a count; the row column
/// prefers a key named like a floor, then the first date-parsing string key;
/// the pivot column is the first remaining string key.
pub fn detect_keys(sample: &Row) -> PivotKeys {
    let keys: Vec<&String> = sample.keys().collect();
    let numeric_keys: Vec<&String> = keys
        .iter()
        .filter(|k| matches!(sample.get(k.as_str()), Some(Value::Number(_))))
        .copied()
        .collect();
    let string_keys: Vec<&String> = keys
        .iter()
        .filter(|k| matches!(sample.get(k.as_str()), Some(Value::String(_))))
        .copied()
        .collect();

    let value_key = numeric_keys
        .iter()
        .find(|k| k.to_lowercase().contains("count"))
        .or_else(|| numeric_keys.first())
        .map(|k| k.to_string())
        .unwrap_or_default();

    let row_key = keys
        .iter()
        .find(|k| k.to_lowercase().contains("floor"))
        .copied()
        .or_else(|| {
            string_keys.iter().copied().find(|k| {
                matches!(sample.get(k.as_str()), Some(Value::String(s)) if parse_datetime_loose(s).is_some())
            })
        })
        .or_else(|| keys.first().copied())
        .map(|k| k.to_string())
        .unwrap_or_default();

    let pivot_key = string_keys
        .iter()
        .find(|k| k.as_str() != row_key && k.as_str() != value_key)
        .or_else(|| string_keys.iter().find(|k| k.as_str() != row_key))
        .map(|k| k.to_string())
        .or_else(|| {
            if keys.len() >= 2 {
                Some(keys[1].to_string())
            } else {
                None
            }
        })
        .unwrap_or_default();

    PivotKeys {
        row_key,
        pivot_key,
        value_key,
    }
}

/// Reshape long rows into one wide row per row-key value, one column per
/// distinct pivot-key value, accumulating the value column. Missing
/// categories are zero-filled so every output row is rectangular.
pub fn auto_pivot(data: &[Row], granularity: Option<Granularity>) -> PivotResult {
    let Some(sample) = data.first() else {
        return PivotResult::default();
    };
    let keys = detect_keys(sample);

    let mut pivot_columns: Vec<String> = Vec::new();
    for row in data {
        let label =
            value_label(row.get(&keys.pivot_key)).unwrap_or_else(|| MISSING_PIVOT.to_string());
        if !pivot_columns.iter().any(|c| c == &label) {
            pivot_columns.push(label);
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut grouped: std::collections::HashMap<String, Row> = std::collections::HashMap::new();
    for row in data {
        let raw_label =
            value_label(row.get(&keys.row_key)).unwrap_or_else(|| MISSING_PIVOT.to_string());
        let label = match (granularity, parse_datetime_loose(&raw_label)) {
            (Some(g), Some(dt)) => g.format_label(dt),
            _ => raw_label,
        };

        let entry = grouped.entry(label.clone()).or_insert_with(|| {
            order.push(label.clone());
            let mut out = Row::new();
            out.insert(keys.row_key.clone(), Value::String(label.clone()));
            for col in &pivot_columns {
                out.insert(col.clone(), Value::from(0));
            }
            out
        });

        let col =
            value_label(row.get(&keys.pivot_key)).unwrap_or_else(|| MISSING_PIVOT.to_string());
        let current = numeric_or_zero(entry.get(&col));
        entry.insert(
            col,
            number_from_f64(current + numeric_or_zero(row.get(&keys.value_key))),
        );
    }

    PivotResult {
        pivot_data: order.into_iter().filter_map(|x| grouped.remove(&x)).collect(),
        pivot_columns,
        row_key: keys.row_key,
        pivot_key: keys.pivot_key,
        value_key: keys.value_key,
    }
}
