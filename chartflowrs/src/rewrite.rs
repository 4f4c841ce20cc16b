//! Textual granularity rewrite of an existing aggregate query.
//!
//! Legacy fallback for queries whose structured [`crate::query_builder::QuerySpec`]
//! is no longer available. The scan recognizes only the fixed menu of bucket
//! expressions [`crate::dialect::MySqlDialect`] emits (plus a generic
//! `DATE_FORMAT` form); hand-written SQL that buckets time differently passes
//! through unmodified, and the outcome reports which of the two happened.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::datetime::Granularity;
use crate::dialect::{Dialect, MySqlDialect};

/// Result of a rewrite attempt. `Unchanged` is not an error: it means no
/// known bucket expression was found, and the original SQL is passed back
/// verbatim for the caller to run as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten(String),
    Unchanged(String),
}

impl RewriteOutcome {
    pub fn sql(&self) -> &str {
        match self {
            Self::Rewritten(sql) | Self::Unchanged(sql) => sql,
        }
    }

    pub fn into_sql(self) -> String {
        match self {
            Self::Rewritten(sql) | Self::Unchanged(sql) => sql,
        }
    }

    pub fn was_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten(_))
    }
}

// A column reference as the builder emits it: `table`.`column`, a single
// quoted identifier, or bare dotted/plain identifiers from hand-written SQL.
const COL: &str = "(`[^`]+`\\.`[^`]+`|`[^`]+`|[A-Za-z_][A-Za-z0-9_]*\\.[A-Za-z_][A-Za-z0-9_]*|[A-Za-z_][A-Za-z0-9_]*)";

macro_rules! bucket_regex {
    ($pattern:expr) => {
        Lazy::new(|| Regex::new(&$pattern.replace("{col}", COL)).expect("valid regex"))
    };
}

static RE_YEAR: Lazy<Regex> = bucket_regex!(r"(?i)DATE_FORMAT\(\s*{col}\s*,\s*'%Y'\s*\)");
static RE_MONTH: Lazy<Regex> = bucket_regex!(r"(?i)DATE_FORMAT\(\s*{col}\s*,\s*'%Y-%m'\s*\)");
static RE_DAY: Lazy<Regex> = bucket_regex!(r"(?i)\bDATE\(\s*{col}\s*\)");
static RE_MINUTE: Lazy<Regex> =
    bucket_regex!(r"(?i)DATE_FORMAT\(\s*{col}\s*,\s*'%Y-%m-%d %H:%i:00'\s*\)");
static RE_HOUR: Lazy<Regex> =
    bucket_regex!(r"(?i)DATE_FORMAT\(\s*{col}\s*,\s*'%Y-%m-%d %H:00:00'\s*\)");
static RE_WEEK: Lazy<Regex> = bucket_regex!(
    r"(?i)MAKEDATE\(\s*YEAR\(\s*{col}\s*\)\s*,\s*1\s*\)\s*\+\s*INTERVAL\s+WEEK\(\s*{col}\s*,\s*0\s*\)\s+WEEK"
);
static RE_QUARTER: Lazy<Regex> = bucket_regex!(
    r"(?i)CONCAT\(\s*YEAR\(\s*{col}\s*\)\s*,\s*'-Q'\s*,\s*QUARTER\(\s*{col}\s*\)\s*\)"
);
static RE_DATE_FORMAT_ANY: Lazy<Regex> =
    bucket_regex!(r"(?i)DATE_FORMAT\(\s*{col}\s*,\s*'[^']*'\s*\)");

static RE_GROUP_BY_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bGROUP\s+BY\s+(.*?)(\s+ORDER\s+BY\b|\s+LIMIT\b|$)").expect("valid regex")
});
static RE_ORDER_BY_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bORDER\s+BY\s+(.*?)(\s+LIMIT\b|$)").expect("valid regex")
});

/// Change the time-bucket granularity of an existing query and optionally
/// widen its grouping, purely textually.
///
/// Scans for bucket expressions in a fixed priority order; the first match
/// determines the column, and every occurrence of that pattern is replaced
/// with the target granularity's expression over the same column. The GROUP
/// BY and ORDER BY clauses are then rewritten to lead with the bucket and
/// carry each extra column (backtick-quoted, de-duplicated).
pub fn rewrite_time_bucket(
    raw_query: &str,
    date_by: Granularity,
    additional_group_by: &[String],
) -> RewriteOutcome {
    let trimmed = raw_query.trim_end();
    let stripped = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

    // Fixed scan order; every entry is distinguishable from the others, and
    // the generic DATE_FORMAT form catches hand-edited variants last.
    let patterns: [&Lazy<Regex>; 8] = [
        &RE_YEAR,
        &RE_MONTH,
        &RE_DAY,
        &RE_MINUTE,
        &RE_HOUR,
        &RE_WEEK,
        &RE_QUARTER,
        &RE_DATE_FORMAT_ANY,
    ];

    for pattern in patterns {
        let Some(caps) = pattern.captures(stripped) else {
            continue;
        };
        let column = caps.get(1).expect("column capture").as_str().to_string();
        let bucket = MySqlDialect.render_time_bucket(date_by, &column);

        let mut sql = pattern
            .replace_all(stripped, regex::NoExpand(&bucket))
            .into_owned();
        sql = augment_clause(&sql, &RE_GROUP_BY_CLAUSE, &bucket, additional_group_by);
        sql = augment_clause(&sql, &RE_ORDER_BY_CLAUSE, &bucket, additional_group_by);
        return RewriteOutcome::Rewritten(sql);
    }

    tracing::debug!(granularity = %date_by, "no recognized bucket expression, query unchanged");
    RewriteOutcome::Unchanged(raw_query.to_string())
}

/// Rewrite one clause's item list: lead with the bucket expression, append
/// extra columns, skip anything already present.
fn augment_clause(sql: &str, clause: &Regex, bucket: &str, extra_columns: &[String]) -> String {
    let Some(caps) = clause.captures(sql) else {
        return sql.to_string();
    };
    let list = caps.get(1).expect("item list");
    let items = split_clause_items(list.as_str());

    let mut rebuilt: Vec<String> = Vec::new();
    if !items.iter().any(|item| item_matches(item, bucket)) {
        rebuilt.push(bucket.to_string());
    }
    rebuilt.extend(items);
    for column in extra_columns {
        let quoted = format!("`{}`", column.replace('`', "``"));
        let already_there = rebuilt
            .iter()
            .any(|item| item_matches(item, &quoted) || item_matches(item, column));
        if !already_there {
            rebuilt.push(quoted);
        }
    }

    let mut out = String::with_capacity(sql.len() + 32);
    out.push_str(&sql[..list.start()]);
    out.push_str(&rebuilt.join(", "));
    out.push_str(&sql[list.end()..]);
    out
}

/// Split a clause item list on top-level commas only; commas inside
/// parentheses or string literals belong to a single expression.
fn split_clause_items(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    for c in list.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            '(' if !in_string => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_string && depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

/// Compare a clause item against an expression, ignoring a trailing sort
/// direction.
fn item_matches(item: &str, expr: &str) -> bool {
    let trimmed = item
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim_end();
    item == expr || trimmed == expr
}
