pub mod axes;
pub mod cache;
pub mod chart;
pub mod config;
pub mod datetime;
pub mod dialect;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod pivot;
pub mod query_builder;
pub mod rewrite;
pub mod rows;
pub mod sql_ast;

pub use crate::axes::{infer_axes, AxesSpec};
pub use crate::chart::{transform_for_chart, ChartRequest};
pub use crate::config::ChartflowConfig;
pub use crate::datetime::{
    detect_datetime_columns, format_time_bucket, parse_datetime_loose, Granularity,
};
pub use crate::error::{ChartflowError, Result};
pub use crate::format::format_row;
pub use crate::pipeline::{transform_dataset, TransformOptions, TransformPipeline, TransformResult};
pub use crate::pivot::{auto_pivot, detect_keys, PivotKeys, PivotResult};
pub use crate::query_builder::{
    Aggregation, FilterOp, QueryBuilder, QueryFilter, QuerySpec, SortDirection, MAX_ROW_LIMIT,
};
pub use crate::rewrite::{rewrite_time_bucket, RewriteOutcome};
pub use crate::rows::{ColumnMeta, ColumnRole, Row, TypeHints};
