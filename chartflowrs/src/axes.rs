//! Axis-role inference over a formatted batch.

use serde_json::Value;

use crate::rows::Row;

/// Chart-role assignment for a batch's columns. Never persisted; recomputed
/// for every batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AxesSpec {
    pub x_axis: String,
    pub series_axis: String,
    pub measure: String,
    pub y_axis: Vec<String>,
}

/// Guess natural axis roles from column value types.
///
/// A column is numeric when every row holds a JSON number under it, and
/// string-like when at least one row holds a string. The x axis prefers the
/// first string column; the series axis needs a second one.
pub fn infer_axes(data: &[Row]) -> AxesSpec {
    let Some(first) = data.first() else {
        return AxesSpec::default();
    };

    let mut string_columns = Vec::new();
    let mut numeric_columns = Vec::new();
    for key in first.keys() {
        let all_numeric = data
            .iter()
            .all(|row| matches!(row.get(key), Some(Value::Number(_))));
        let any_string = data
            .iter()
            .any(|row| matches!(row.get(key), Some(Value::String(_))));
        if all_numeric {
            numeric_columns.push(key.clone());
        }
        if any_string {
            string_columns.push(key.clone());
        }
    }

    let x_axis = string_columns
        .first()
        .or_else(|| numeric_columns.first())
        .cloned()
        .unwrap_or_default();
    let series_axis = if string_columns.len() >= 2 {
        string_columns[1].clone()
    } else {
        String::new()
    };
    let measure = numeric_columns.first().cloned().unwrap_or_default();

    AxesSpec {
        x_axis,
        series_axis,
        measure,
        y_axis: numeric_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn infers_string_x_and_numeric_measures() {
        let data = vec![
            row(&[
                ("region", json!("East")),
                ("channel", json!("web")),
                ("sales", json!(10)),
                ("units", json!(2)),
            ]),
            row(&[
                ("region", json!("West")),
                ("channel", json!("store")),
                ("sales", json!(7)),
                ("units", json!(1)),
            ]),
        ];
        let axes = infer_axes(&data);
        assert_eq!(axes.x_axis, "region");
        assert_eq!(axes.series_axis, "channel");
        assert_eq!(axes.measure, "sales");
        assert_eq!(axes.y_axis, vec!["sales", "units"]);
    }

    #[test]
    fn all_numeric_falls_back_to_numeric_x() {
        let data = vec![row(&[("a", json!(1)), ("b", json!(2))])];
        let axes = infer_axes(&data);
        assert_eq!(axes.x_axis, "a");
        assert_eq!(axes.series_axis, "");
        assert_eq!(axes.y_axis, vec!["a", "b"]);
    }

    #[test]
    fn mixed_column_is_not_numeric() {
        let data = vec![
            row(&[("v", json!(1)), ("k", json!("x"))]),
            row(&[("v", json!("oops")), ("k", json!("y"))]),
        ];
        let axes = infer_axes(&data);
        // "v" held a string in one row, so it is string-like, not numeric.
        assert_eq!(axes.x_axis, "v");
        assert_eq!(axes.series_axis, "k");
        assert_eq!(axes.measure, "");
        assert!(axes.y_axis.is_empty());
    }

    #[test]
    fn empty_input_is_all_empty() {
        let axes = infer_axes(&[]);
        assert_eq!(axes, AxesSpec::default());
    }
}
