//! Aggregation of flat rows into chart-ready series.
//!
//! Two shapes come out of here: a sparse pivot (one column per series value
//! actually seen for an x value) and a dense flat aggregate (every tracked
//! numeric column zero-filled on every row). Downstream consumers rely on
//! each shape as-is; do not unify the fill semantics.

use serde::Deserialize;
use serde_json::Value;

use crate::rows::{number_from_f64, numeric_or_zero, value_label, Row};

const MISSING_X: &str = "Unknown";
const MISSING_SERIES: &str = "Default";

/// Axis-role selection for [`transform_for_chart`]. `series_axis` and
/// `measure` together switch on pivot mode; `selected_y_axis` narrows the
/// flat-aggregate columns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartRequest {
    pub x_axis: String,
    pub series_axis: Option<String>,
    pub measure: Option<String>,
    pub selected_y_axis: Option<Vec<String>>,
}

impl ChartRequest {
    pub fn flat(x_axis: impl Into<String>) -> Self {
        Self {
            x_axis: x_axis.into(),
            ..Self::default()
        }
    }

    pub fn pivot(
        x_axis: impl Into<String>,
        series_axis: impl Into<String>,
        measure: impl Into<String>,
    ) -> Self {
        Self {
            x_axis: x_axis.into(),
            series_axis: Some(series_axis.into()),
            measure: Some(measure.into()),
            selected_y_axis: None,
        }
    }
}

/// Aggregate rows into one output row per distinct x value, in first-seen
/// order. Empty data or an empty x axis yields an empty result.
pub fn transform_for_chart(data: &[Row], request: &ChartRequest) -> Vec<Row> {
    if data.is_empty() || request.x_axis.is_empty() {
        return Vec::new();
    }

    let series_axis = request.series_axis.as_deref().filter(|s| !s.is_empty());
    let measure = request.measure.as_deref().filter(|s| !s.is_empty());
    match (series_axis, measure) {
        (Some(series_axis), Some(measure)) => {
            pivot_series(data, &request.x_axis, series_axis, measure)
        }
        _ => flat_aggregate(data, &request.x_axis, request.selected_y_axis.as_deref()),
    }
}

/// One column per series value seen for that x value; columns never seen for
/// an x value are simply absent (sparse).
fn pivot_series(data: &[Row], x_axis: &str, series_axis: &str, measure: &str) -> Vec<Row> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: std::collections::HashMap<String, Row> = std::collections::HashMap::new();

    for row in data {
        let x = value_label(row.get(x_axis)).unwrap_or_else(|| MISSING_X.to_string());
        let series = value_label(row.get(series_axis)).unwrap_or_else(|| MISSING_SERIES.to_string());
        let amount = numeric_or_zero(row.get(measure));

        let entry = grouped.entry(x.clone()).or_insert_with(|| {
            order.push(x.clone());
            let mut out = Row::new();
            out.insert(x_axis.to_string(), Value::String(x.clone()));
            out
        });
        let current = numeric_or_zero(entry.get(&series));
        entry.insert(series, number_from_f64(current + amount));
    }

    order
        .into_iter()
        .filter_map(|x| grouped.remove(&x))
        .collect()
}

/// Every tracked numeric column is zero-initialized on every output row
/// (dense), then summed across the group.
fn flat_aggregate(data: &[Row], x_axis: &str, selected_y_axis: Option<&[String]>) -> Vec<Row> {
    let mut numeric_columns: Vec<String> = Vec::new();
    for row in data {
        for (key, value) in row {
            if key != x_axis
                && matches!(value, Value::Number(_))
                && !numeric_columns.iter().any(|c| c == key)
            {
                numeric_columns.push(key.clone());
            }
        }
    }
    if let Some(selected) = selected_y_axis {
        if !selected.is_empty() {
            numeric_columns.retain(|c| selected.iter().any(|s| s == c));
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut grouped: std::collections::HashMap<String, Row> = std::collections::HashMap::new();

    for row in data {
        let x = value_label(row.get(x_axis)).unwrap_or_else(|| MISSING_X.to_string());
        let entry = grouped.entry(x.clone()).or_insert_with(|| {
            order.push(x.clone());
            let mut out = Row::new();
            out.insert(x_axis.to_string(), Value::String(x.clone()));
            for col in &numeric_columns {
                out.insert(col.clone(), Value::from(0));
            }
            out
        });
        for col in &numeric_columns {
            let current = numeric_or_zero(entry.get(col));
            entry.insert(col.clone(), number_from_f64(current + numeric_or_zero(row.get(col))));
        }
    }

    order
        .into_iter()
        .filter_map(|x| grouped.remove(&x))
        .collect()
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
    fn flat_mode_sums_by_x_in_first_seen_order() {
        let data = vec![
            row(&[("region", json!("East")), ("sales", json!(10))]),
            row(&[("region", json!("East")), ("sales", json!(5))]),
            row(&[("region", json!("West")), ("sales", json!(7))]),
        ];
        let out = transform_for_chart(&data, &ChartRequest::flat("region"));
        assert_eq!(
            out,
            vec![
                row(&[("region", json!("East")), ("sales", json!(15))]),
                row(&[("region", json!("West")), ("sales", json!(7))]),
            ]
        );
    }

    #[test]
    fn pivot_mode_is_sparse() {
        let data = vec![
            row(&[("day", json!("Mon")), ("cat", json!("A")), ("n", json!(3))]),
            row(&[("day", json!("Mon")), ("cat", json!("B")), ("n", json!(2))]),
            row(&[("day", json!("Tue")), ("cat", json!("A")), ("n", json!(1))]),
        ];
        let out = transform_for_chart(&data, &ChartRequest::pivot("day", "cat", "n"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["A"], json!(3));
        assert_eq!(out[0]["B"], json!(2));
        assert_eq!(out[1]["A"], json!(1));
        // Sparse: Tuesday never saw category B.
        assert!(!out[1].contains_key("B"));
    }

    #[test]
    fn missing_values_use_placeholders() {
        let data = vec![
            row(&[("cat", json!("A")), ("n", json!(4))]),
            row(&[("day", json!("Mon")), ("n", json!(2))]),
        ];
        let out = transform_for_chart(&data, &ChartRequest::pivot("day", "cat", "n"));
        assert_eq!(out[0]["day"], json!("Unknown"));
        assert_eq!(out[0]["A"], json!(4));
        assert_eq!(out[1]["Default"], json!(2));
    }

    #[test]
    fn non_numeric_measures_coerce_to_zero() {
        let data = vec![row(&[
            ("day", json!("Mon")),
            ("cat", json!("A")),
            ("n", json!("oops")),
        ])];
        let out = transform_for_chart(&data, &ChartRequest::pivot("day", "cat", "n"));
        assert_eq!(out[0]["A"], json!(0));
    }

    #[test]
    fn selected_y_axis_filters_flat_columns() {
        let data = vec![row(&[
            ("region", json!("East")),
            ("sales", json!(10)),
            ("units", json!(3)),
        ])];
        let mut request = ChartRequest::flat("region");
        request.selected_y_axis = Some(vec!["units".to_string()]);
        let out = transform_for_chart(&data, &request);
        assert_eq!(out[0]["units"], json!(3));
        assert!(!out[0].contains_key("sales"));
    }

    #[test]
    fn empty_inputs_yield_empty() {
        assert!(transform_for_chart(&[], &ChartRequest::flat("x")).is_empty());
        let data = vec![row(&[("a", json!(1))])];
        assert!(transform_for_chart(&data, &ChartRequest::flat("")).is_empty());
    }
}
