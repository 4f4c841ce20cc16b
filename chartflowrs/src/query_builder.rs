//! Structured aggregate-query generation.
//!
//! The structured [`QuerySpec`] is the source of truth for a generated query:
//! changing granularity or grouping means editing the spec and re-rendering,
//! not round-tripping through SQL text. The textual path in
//! [`crate::rewrite`] exists only for queries whose spec is no longer
//! available.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datetime::{parse_datetime_loose, Granularity};
use crate::dialect::{Dialect, MySqlDialect};
use crate::error::{ChartflowError, Result};
use crate::sql_ast::{
    OrderItem, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, SqlRenderer,
};

/// Hard cap on generated row counts; a dashboard never needs more.
pub const MAX_ROW_LIMIT: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// Result-column alias for the aggregate.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::CountDistinct => "count_distinct",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryFilter {
    pub column: String,
    #[serde(alias = "operation")]
    pub op: FilterOp,
    pub value: Value,
}

/// Structured parameters for an aggregate query against a single table.
///
/// `filters` and `where_clause` are mutually exclusive; `filters` wins when
/// both are present and the raw clause is only a fallback for callers that
/// never migrated. Binning applies to any non-datetime selected or grouped
/// column matching `bin_column`; date bucketing applies to the first selected
/// column whose name contains "date". The two combine freely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySpec {
    pub aggregate: Option<Aggregation>,
    /// Aggregation target; `count` may omit it and counts rows.
    pub aggregate_column: Option<String>,
    pub columns: Vec<String>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub filters: Vec<QueryFilter>,
    pub group_by: Vec<String>,
    pub date_by: Option<Granularity>,
    pub bin_column: Option<String>,
    pub bin_size: Option<f64>,
    pub order_direction: Option<SortDirection>,
    pub limit: Option<u64>,
}

pub struct QueryBuilder;

impl Default for QueryBuilder {
    fn default() -> Self {
        Self
    }
}

impl QueryBuilder {
    /// Build MySQL-dialect SQL for the spec.
    pub fn build(&self, table: &str, spec: &QuerySpec) -> Result<String> {
        self.build_with_dialect(table, spec, &MySqlDialect)
    }

    /// Build SQL using a provided dialect (useful for tests).
    pub fn build_with_dialect(
        &self,
        table: &str,
        spec: &QuerySpec,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        if table.trim().is_empty() {
            return Err(ChartflowError::Validation("table name is required".to_string()));
        }
        if spec.columns.is_empty() && spec.aggregate.is_none() {
            return Err(ChartflowError::Validation(
                "query requires at least one column or an aggregate".to_string(),
            ));
        }
        if let Some(size) = spec.bin_size {
            if size <= 0.0 {
                return Err(ChartflowError::Validation(format!(
                    "bin size must be positive, got {size}"
                )));
            }
        }

        let date_column = self.date_candidate(spec);
        let mut query = SelectQuery {
            from: table.to_string(),
            ..SelectQuery::default()
        };

        // Selected dimensions, with the date candidate bucketed and the bin
        // column floored in place.
        let mut dimensions: Vec<SqlExpr> = Vec::new();
        for column in &spec.columns {
            let expr = self.dimension_expr(table, column, date_column, spec);
            let aliased = !matches!(expr, SqlExpr::Column { .. });
            query.select.push(SelectItem {
                expr: expr.clone(),
                alias: aliased.then(|| column.clone()),
            });
            dimensions.push(expr);
        }

        if let Some(agg) = spec.aggregate {
            let target = match &spec.aggregate_column {
                Some(column) => self.column_expr(table, column),
                None if agg == Aggregation::Count => SqlExpr::Star,
                None => {
                    return Err(ChartflowError::Validation(format!(
                        "aggregate {} requires a column",
                        agg.alias()
                    )))
                }
            };
            query.select.push(SelectItem {
                expr: SqlExpr::Aggregate {
                    agg,
                    expr: Box::new(target),
                },
                alias: Some(agg.alias().to_string()),
            });
        }

        if !spec.filters.is_empty() {
            for filter in &spec.filters {
                query.filters.push(self.filter_expr(table, filter, date_column));
            }
        } else if let Some(where_clause) = &spec.where_clause {
            if !where_clause.trim().is_empty() {
                query.filters.push(SqlExpr::Raw(where_clause.trim().to_string()));
            }
        }

        // Grouping: date bucket first, then remaining dimensions, then extras.
        let mut group_exprs: Vec<SqlExpr> = Vec::new();
        let renderer = SqlRenderer::new(dialect);
        let push_group = |exprs: &mut Vec<SqlExpr>, expr: SqlExpr| {
            let rendered = renderer.render_expr(&expr);
            if !exprs.iter().any(|e| renderer.render_expr(e) == rendered) {
                exprs.push(expr);
            }
        };
        if let Some(date_column) = date_column {
            push_group(
                &mut group_exprs,
                self.dimension_expr(table, date_column, Some(date_column), spec),
            );
        }
        for expr in &dimensions {
            push_group(&mut group_exprs, expr.clone());
        }
        for column in &spec.group_by {
            let expr = self.dimension_expr(table, column, date_column, spec);
            push_group(&mut group_exprs, expr);
        }

        let grouping_wanted =
            spec.aggregate.is_some() || !spec.group_by.is_empty() || spec.date_by.is_some();
        if grouping_wanted && !group_exprs.is_empty() {
            query.group_by = group_exprs.clone();
        }

        // Ordering: date bucket first when present, else the aggregate alias,
        // else the first dimension. Only emitted when the caller asked for a
        // direction or a date bucket fixes natural time order.
        if spec.order_direction.is_some() || date_column.is_some() {
            let direction = spec.order_direction.unwrap_or(SortDirection::Asc);
            let expr = if let Some(date_column) = date_column {
                self.dimension_expr(table, date_column, Some(date_column), spec)
            } else if let Some(agg) = spec.aggregate {
                SqlExpr::Column {
                    table: None,
                    name: agg.alias().to_string(),
                }
            } else {
                dimensions[0].clone()
            };
            query.order_by.push(OrderItem { expr, direction });
        }

        query.limit = Some(spec.limit.unwrap_or(MAX_ROW_LIMIT).min(MAX_ROW_LIMIT));

        Ok(renderer.render_select(&query))
    }

    /// First selected column whose name marks it as a date, active only when
    /// a granularity was requested.
    fn date_candidate<'a>(&self, spec: &'a QuerySpec) -> Option<&'a str> {
        spec.date_by?;
        spec.columns
            .iter()
            .find(|c| c.to_lowercase().contains("date"))
            .map(|c| c.as_str())
    }

    fn column_expr(&self, table: &str, column: &str) -> SqlExpr {
        SqlExpr::Column {
            table: Some(table.to_string()),
            name: column.to_string(),
        }
    }

    fn dimension_expr(
        &self,
        table: &str,
        column: &str,
        date_column: Option<&str>,
        spec: &QuerySpec,
    ) -> SqlExpr {
        let base = self.column_expr(table, column);
        if date_column == Some(column) {
            if let Some(granularity) = spec.date_by {
                return SqlExpr::TimeBucket {
                    granularity,
                    expr: Box::new(base),
                };
            }
        }
        if let (Some(bin_column), Some(size)) = (&spec.bin_column, spec.bin_size) {
            if bin_column == column && date_column != Some(column) {
                return SqlExpr::Bin {
                    size,
                    expr: Box::new(base),
                };
            }
        }
        base
    }

    fn filter_expr(
        &self,
        table: &str,
        filter: &QueryFilter,
        date_column: Option<&str>,
    ) -> SqlExpr {
        let column = self.column_expr(table, &filter.column);
        let is_date_target = date_column == Some(filter.column.as_str())
            || filter.column.to_lowercase().contains("date");

        let literal = |value: &Value| -> SqlExpr {
            if let Value::String(s) = value {
                if is_date_target && parse_datetime_loose(s).is_some() {
                    return SqlExpr::DateLiteral(s.clone());
                }
            }
            SqlExpr::Literal(value.clone())
        };

        match filter.op {
            FilterOp::In | FilterOp::NotIn => {
                let list = match &filter.value {
                    Value::Array(items) => items.iter().map(&literal).collect(),
                    other => vec![literal(other)],
                };
                SqlExpr::InList {
                    expr: Box::new(column),
                    list,
                    negated: matches!(filter.op, FilterOp::NotIn),
                }
            }
            _ => {
                let op = match filter.op {
                    FilterOp::Eq => SqlBinaryOperator::Eq,
                    FilterOp::Neq => SqlBinaryOperator::Neq,
                    FilterOp::Gt => SqlBinaryOperator::Gt,
                    FilterOp::Gte => SqlBinaryOperator::Gte,
                    FilterOp::Lt => SqlBinaryOperator::Lt,
                    FilterOp::Lte => SqlBinaryOperator::Lte,
                    FilterOp::Like => SqlBinaryOperator::Like,
                    FilterOp::In | FilterOp::NotIn => unreachable!(),
                };
                SqlExpr::BinaryOp {
                    op,
                    left: Box::new(column),
                    right: Box::new(literal(&filter.value)),
                }
            }
        }
    }
}
