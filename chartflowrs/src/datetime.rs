//! Time granularities, loose datetime parsing, and datetime column detection.
//!
//! Result sets carry no type information, so datetime-ness is decided per
//! batch: a column qualifies when more than half of its non-null values parse
//! as datetimes, or unconditionally when its name contains a time keyword.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::rows::{ColumnRole, Row, TypeHints};

/// Fraction of non-null values that must parse for heuristic classification.
pub const DEFAULT_PARSE_THRESHOLD: f64 = 0.5;

static RE_TIME_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)minute|hour|day|week|month|quarter|year").expect("valid regex")
});
pub(crate) static RE_PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));
pub(crate) static RE_YEAR_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));
pub(crate) static RE_YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid regex"));

/// Time-bucket size used for both SQL date truncation and label formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// Human-readable label for the bucket containing `dt`.
    pub fn format_label(&self, dt: NaiveDateTime) -> String {
        match self {
            Self::Minute => dt.format("%B %-d, %Y, %-I:%M %p").to_string(),
            Self::Hour => dt.format("%B %-d, %Y, %-I %p").to_string(),
            Self::Day => dt.format("%B %-d, %Y").to_string(),
            Self::Week => {
                let start = dt.date();
                let end = start + Duration::days(6);
                format!(
                    "{} – {}",
                    start.format("%B %-d, %Y"),
                    end.format("%B %-d, %Y")
                )
            }
            Self::Month => dt.format("%B %Y").to_string(),
            Self::Quarter => format!("Q{} {}", dt.month0() / 3 + 1, dt.year()),
            Self::Year => dt.format("%Y").to_string(),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a bucket label, falling back to ISO-8601 when no granularity is
/// in effect.
pub fn format_time_bucket(dt: NaiveDateTime, granularity: Option<Granularity>) -> String {
    match granularity {
        Some(g) => g.format_label(dt),
        None => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

/// Best-effort datetime parsing over the value shapes SQL drivers emit.
/// Date-only inputs land at midnight; a bare 4-digit string is read as a
/// year, a `YYYY-MM` string as the first of that month.
pub fn parse_datetime_loose(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    if RE_YEAR_MONTH.is_match(s) {
        let (year, month) = s.split_once('-')?;
        let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
        return date.and_hms_opt(0, 0, 0);
    }
    if RE_YEAR_ONLY.is_match(s) {
        let date = NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1)?;
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

/// True when the column name alone marks it as time-like.
pub(crate) fn name_is_time_like(name: &str) -> bool {
    RE_TIME_KEYWORD.is_match(name)
}

/// Detect which columns of a batch hold datetime values.
pub fn detect_datetime_columns(rows: &[Row]) -> Vec<String> {
    detect_datetime_columns_with(rows, None, DEFAULT_PARSE_THRESHOLD)
}

/// Detection with driver hints and a custom parse-rate threshold. Hinted
/// columns bypass the heuristics entirely; unhinted columns fall back to
/// value sampling and the name-keyword override.
pub fn detect_datetime_columns_with(
    rows: &[Row],
    hints: Option<&TypeHints>,
    threshold: f64,
) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut detected = Vec::new();
    for key in first.keys() {
        if let Some(role) = hints.and_then(|h| h.role(key)) {
            if role == ColumnRole::Datetime {
                detected.push(key.clone());
            }
            continue;
        }

        let mut valid = 0usize;
        let mut total = 0usize;
        for row in rows {
            match row.get(key) {
                None | Some(serde_json::Value::Null) => {}
                Some(serde_json::Value::String(s)) => {
                    total += 1;
                    if parse_datetime_loose(s).is_some() {
                        valid += 1;
                    }
                }
                Some(serde_json::Value::Number(_)) => {
                    total += 1;
                    if name_is_time_like(key) {
                        valid += 1;
                    }
                }
                Some(_) => {
                    total += 1;
                }
            }
        }

        let ratio_ok = total > 0 && (valid as f64 / total as f64) > threshold;
        // Name keyword wins even when every value failed to parse.
        if ratio_ok || name_is_time_like(key) {
            detected.push(key.clone());
        }
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_common_shapes() {
        assert!(parse_datetime_loose("2024-01-15").is_some());
        assert!(parse_datetime_loose("2024-01-15 10:30:00").is_some());
        assert!(parse_datetime_loose("2024-01-15T10:30:00Z").is_some());
        assert!(parse_datetime_loose("2024-01").is_some());
        assert!(parse_datetime_loose("2024").is_some());
        assert!(parse_datetime_loose("not a date").is_none());
        assert!(parse_datetime_loose("").is_none());
    }

    #[test]
    fn quarter_and_year_labels() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Granularity::Quarter.format_label(dt), "Q2 2024");
        assert_eq!(Granularity::Year.format_label(dt), "2024");
        assert_eq!(Granularity::Month.format_label(dt), "May 2024");
    }

    #[test]
    fn week_label_spans_seven_days() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            Granularity::Week.format_label(dt),
            "January 29, 2024 – February 4, 2024"
        );
    }

    #[test]
    fn iso_fallback_without_granularity() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(format_time_bucket(dt, None), "2024-01-15T10:30:00");
    }

    #[test]
    fn detects_by_parse_rate() {
        let rows = vec![
            row(&[("order_date", json!("2024-01-15")), ("qty", json!(5))]),
            row(&[("order_date", json!("2024-02-01")), ("qty", json!(3))]),
        ];
        assert_eq!(detect_datetime_columns(&rows), vec!["order_date"]);
    }

    #[test]
    fn name_keyword_overrides_values() {
        let rows = vec![
            row(&[("billing_month", serde_json::Value::Null), ("total", json!(10))]),
            row(&[("billing_month", serde_json::Value::Null), ("total", json!(20))]),
        ];
        assert_eq!(detect_datetime_columns(&rows), vec!["billing_month"]);
    }

    #[test]
    fn hints_bypass_heuristics() {
        let rows = vec![row(&[("ts", json!("garbage")), ("label", json!("a"))])];
        let mut hints = TypeHints::new();
        hints.insert("ts", ColumnRole::Datetime);
        hints.insert("label", ColumnRole::Categorical);
        assert_eq!(
            detect_datetime_columns_with(&rows, Some(&hints), DEFAULT_PARSE_THRESHOLD),
            vec!["ts"]
        );
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(detect_datetime_columns(&[]).is_empty());
    }
}
