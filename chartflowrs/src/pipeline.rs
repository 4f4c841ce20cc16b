//! The dataset transformation pipeline: detection, row formatting, axis
//! inference, and the two-column auto-pivot special case.

use crate::axes::{infer_axes, AxesSpec};
use crate::cache::{batch_signature, RoleCache};
use crate::config::ChartflowConfig;
use crate::datetime::{detect_datetime_columns_with, Granularity, DEFAULT_PARSE_THRESHOLD};
use crate::format::{format_row_with, DEFAULT_MAX_YEAR, DEFAULT_MIN_YEAR};
use crate::pivot::{auto_pivot, PivotKeys};
use crate::rows::{Row, TypeHints};

#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Granularity for datetime label formatting and pivot row labels.
    pub date_by: Option<Granularity>,
    /// Grouping columns as selected in the dashboard. Exactly two switch the
    /// result to the dense auto-pivot; any other count leaves the flat rows.
    pub group_by: Vec<String>,
    /// Driver-declared column roles, when the execution layer has them.
    pub hints: Option<TypeHints>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub rows: Vec<Row>,
    pub axes: AxesSpec,
    /// Set when the result came out of the auto-pivot.
    pub pivot: Option<PivotKeys>,
}

/// One-shot transformation of a raw result batch into chart-ready rows plus
/// axis roles. Pure; no caching.
pub fn transform_dataset(rows: &[Row], options: &TransformOptions) -> TransformResult {
    let datetime_columns = detect_datetime_columns_with(
        rows,
        options.hints.as_ref(),
        DEFAULT_PARSE_THRESHOLD,
    );
    transform_with(
        rows,
        options,
        &datetime_columns,
        DEFAULT_MIN_YEAR,
        DEFAULT_MAX_YEAR,
    )
}

fn transform_with(
    rows: &[Row],
    options: &TransformOptions,
    datetime_columns: &[String],
    min_year: i32,
    max_year: i32,
) -> TransformResult {
    let formatted: Vec<Row> = rows
        .iter()
        .map(|row| format_row_with(row, datetime_columns, options.date_by, min_year, max_year))
        .collect();
    let mut axes = infer_axes(&formatted);

    // Two grouping columns means a row category and a pivot category; the
    // dense pivot replaces the flat rows wholesale. The pivot formats its own
    // row labels, so it works from the raw batch.
    if options.group_by.len() == 2 {
        let pivot = auto_pivot(rows, options.date_by);
        axes.x_axis = pivot.row_key.clone();
        axes.y_axis = pivot.pivot_columns.clone();
        return TransformResult {
            rows: pivot.pivot_data,
            axes,
            pivot: Some(PivotKeys {
                row_key: pivot.row_key,
                pivot_key: pivot.pivot_key,
                value_key: pivot.value_key,
            }),
        };
    }

    TransformResult {
        rows: formatted,
        axes,
        pivot: None,
    }
}

/// Reusable pipeline carrying configuration and a detection cache, for
/// callers that re-transform the same batch repeatedly (debounced UI input).
#[derive(Debug)]
pub struct TransformPipeline {
    config: ChartflowConfig,
    cache: RoleCache,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::with_config(ChartflowConfig::default())
    }

    pub fn with_config(config: ChartflowConfig) -> Self {
        let cache = RoleCache::with_config(&config.role_cache);
        Self { config, cache }
    }

    pub fn config(&self) -> &ChartflowConfig {
        &self.config
    }

    /// Transform a batch, memoizing datetime detection by batch signature.
    pub fn transform(&mut self, rows: &[Row], options: &TransformOptions) -> TransformResult {
        let signature = batch_signature(rows);
        let datetime_columns = match self.cache.get(signature) {
            Some(columns) => columns.to_vec(),
            None => {
                let columns = detect_datetime_columns_with(
                    rows,
                    options.hints.as_ref(),
                    self.config.transform.datetime_parse_threshold,
                );
                self.cache.insert(signature, columns.clone());
                columns
            }
        };
        transform_with(
            rows,
            options,
            &datetime_columns,
            self.config.transform.min_year,
            self.config.transform.max_year,
        )
    }
}
