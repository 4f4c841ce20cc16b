//! Per-row normalization: datetime columns become formatted labels, numeric
//! strings become numbers, everything else passes through untouched.

use chrono::Datelike;
use serde_json::Value;

use crate::datetime::{
    parse_datetime_loose, Granularity, RE_PLAIN_NUMBER, RE_YEAR_MONTH, RE_YEAR_ONLY,
};
use crate::rows::Row;

pub const DEFAULT_MIN_YEAR: i32 = 1900;
pub const DEFAULT_MAX_YEAR: i32 = 2100;

/// Normalize one row with the default year guard.
pub fn format_row(row: &Row, datetime_columns: &[String], granularity: Option<Granularity>) -> Row {
    format_row_with(
        row,
        datetime_columns,
        granularity,
        DEFAULT_MIN_YEAR,
        DEFAULT_MAX_YEAR,
    )
}

/// Normalize one row. The output carries exactly the input's keys.
///
/// Datetime columns only reformat when the value actually parses and its year
/// falls inside `[min_year, max_year]`; anything else keeps the raw value so a
/// misclassified column cannot corrupt the dataset.
pub fn format_row_with(
    row: &Row,
    datetime_columns: &[String],
    granularity: Option<Granularity>,
    min_year: i32,
    max_year: i32,
) -> Row {
    let mut out = Row::new();
    for (key, value) in row {
        if datetime_columns.iter().any(|c| c == key) {
            if let Some(label) = format_datetime_value(key, value, granularity, min_year, max_year)
            {
                out.insert(key.clone(), Value::String(label));
                continue;
            }
        }
        out.insert(key.clone(), coerce_numeric(value));
    }
    out
}

fn format_datetime_value(
    key: &str,
    value: &Value,
    granularity: Option<Granularity>,
    min_year: i32,
    max_year: i32,
) -> Option<String> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // Plain numbers in a datetime column stay numeric, except bare 4-digit
    // strings, which read as years.
    if RE_PLAIN_NUMBER.is_match(s) && !RE_YEAR_ONLY.is_match(s) {
        return None;
    }

    let Some(dt) = parse_datetime_loose(s) else {
        tracing::debug!(column = %key, value = %s, "datetime column value failed to parse, keeping raw");
        return None;
    };
    if dt.year() < min_year || dt.year() > max_year {
        tracing::debug!(column = %key, year = dt.year(), "parsed year out of range, keeping raw");
        return None;
    }

    Some(match granularity {
        Some(g) => g.format_label(dt),
        // No granularity: match the precision of the source string.
        None => {
            if RE_YEAR_ONLY.is_match(s) {
                dt.format("%Y").to_string()
            } else if RE_YEAR_MONTH.is_match(s) {
                dt.format("%B %Y").to_string()
            } else {
                dt.format("%B %-d, %Y, %-I:%M %p").to_string()
            }
        }
    })
}

fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => rounded_number(f),
            _ => value.clone(),
        },
        Value::String(s) => {
            let t = s.trim();
            if !t.is_empty() && RE_PLAIN_NUMBER.is_match(t) {
                match t.parse::<f64>() {
                    Ok(f) => rounded_number(f),
                    Err(_) => value.clone(),
                }
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

/// Integers stay integers; non-integers round to 4 decimal places.
fn rounded_number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from((f * 10_000.0).round() / 10_000.0)
    }
}
