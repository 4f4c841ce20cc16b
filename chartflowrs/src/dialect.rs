//! SQL dialect rendering.
//!
//! Dialects render identifiers and primitive expression pieces; expression
//! tree walking lives in the renderer. Only MySQL is implemented — generated
//! queries are handed verbatim to a MySQL execution collaborator.

use serde_json::Value;

use crate::datetime::Granularity;
use crate::query_builder::Aggregation;

pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;

    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Avg => format!("AVG({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
        }
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| self.render_literal(v)).collect();
                rendered.join(", ")
            }
            Value::Object(_) => format!("'{}'", value.to_string().replace('\'', "''")),
        }
    }

    /// Truncate a datetime expression to a granularity bucket.
    fn render_time_bucket(&self, granularity: Granularity, expr: &str) -> String;

    /// Fixed-width numeric bucketing via floor division.
    fn render_bin(&self, size: f64, expr: &str) -> String {
        let size = trim_number(size);
        format!("FLOOR({expr} / {size}) * {size}")
    }

    /// Render a date-shaped string literal for comparison against a
    /// datetime column.
    fn render_date_literal(&self, value: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn render_time_bucket(&self, granularity: Granularity, expr: &str) -> String {
        match granularity {
            Granularity::Minute => format!("DATE_FORMAT({expr}, '%Y-%m-%d %H:%i:00')"),
            Granularity::Hour => format!("DATE_FORMAT({expr}, '%Y-%m-%d %H:00:00')"),
            Granularity::Day => format!("DATE({expr})"),
            Granularity::Week => {
                format!("MAKEDATE(YEAR({expr}), 1) + INTERVAL WEEK({expr}, 0) WEEK")
            }
            Granularity::Month => format!("DATE_FORMAT({expr}, '%Y-%m')"),
            Granularity::Quarter => format!("CONCAT(YEAR({expr}), '-Q', QUARTER({expr}))"),
            Granularity::Year => format!("DATE_FORMAT({expr}, '%Y')"),
        }
    }

    fn render_date_literal(&self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        if value.contains(':') {
            format!("STR_TO_DATE('{escaped}', '%Y-%m-%d %H:%i:%s')")
        } else {
            format!("STR_TO_DATE('{escaped}', '%Y-%m-%d')")
        }
    }
}

fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtick_quoting_escapes() {
        let d = MySqlDialect;
        assert_eq!(d.quote_ident("orders"), "`orders`");
        assert_eq!(d.quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn bucket_forms_per_granularity() {
        let d = MySqlDialect;
        let col = "`o`.`created_at`";
        assert_eq!(
            d.render_time_bucket(Granularity::Month, col),
            "DATE_FORMAT(`o`.`created_at`, '%Y-%m')"
        );
        assert_eq!(d.render_time_bucket(Granularity::Day, col), "DATE(`o`.`created_at`)");
        assert_eq!(
            d.render_time_bucket(Granularity::Quarter, col),
            "CONCAT(YEAR(`o`.`created_at`), '-Q', QUARTER(`o`.`created_at`))"
        );
    }

    #[test]
    fn bin_uses_floor_division() {
        let d = MySqlDialect;
        assert_eq!(d.render_bin(10.0, "`t`.`price`"), "FLOOR(`t`.`price` / 10) * 10");
        assert_eq!(d.render_bin(0.5, "`t`.`price`"), "FLOOR(`t`.`price` / 0.5) * 0.5");
    }

    #[test]
    fn date_literals_go_through_str_to_date() {
        let d = MySqlDialect;
        assert_eq!(
            d.render_date_literal("2024-01-15"),
            "STR_TO_DATE('2024-01-15', '%Y-%m-%d')"
        );
        assert_eq!(
            d.render_date_literal("2024-01-15 10:30:00"),
            "STR_TO_DATE('2024-01-15 10:30:00', '%Y-%m-%d %H:%i:%s')"
        );
    }
}
