//! Integration tests for structured query generation.

use chartflow::{
    Aggregation, FilterOp, QueryBuilder, QueryFilter, QuerySpec, SortDirection, MAX_ROW_LIMIT,
};
use serde_json::json;

fn build(table: &str, spec: &QuerySpec) -> String {
    QueryBuilder::default().build(table, spec).unwrap()
}

#[test]
fn count_by_month_bucket() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Count),
        columns: vec!["order_date".to_string()],
        date_by: chartflow::Granularity::parse("month"),
        ..QuerySpec::default()
    };
    let sql = build("orders", &spec);
    assert!(sql.starts_with(
        "SELECT DATE_FORMAT(`orders`.`order_date`, '%Y-%m') AS `order_date`, COUNT(*) AS `count` FROM `orders`"
    ));
    assert!(sql.contains("GROUP BY DATE_FORMAT(`orders`.`order_date`, '%Y-%m')"));
    assert!(sql.contains("ORDER BY DATE_FORMAT(`orders`.`order_date`, '%Y-%m') ASC"));
    assert!(sql.ends_with("LIMIT 2000"));
}

#[test]
fn date_bucket_sorts_first_in_group_by() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Count),
        columns: vec!["region".to_string(), "order_date".to_string()],
        date_by: chartflow::Granularity::parse("day"),
        ..QuerySpec::default()
    };
    let sql = build("orders", &spec);
    // The bucket leads even though the date column was selected second.
    assert!(sql.contains("GROUP BY DATE(`orders`.`order_date`), `orders`.`region`"));
    assert!(sql.contains("ORDER BY DATE(`orders`.`order_date`) ASC"));
}

#[test]
fn limit_is_clamped_to_cap() {
    for limit in [2001, 10_000, u64::MAX] {
        let spec = QuerySpec {
            columns: vec!["region".to_string()],
            limit: Some(limit),
            ..QuerySpec::default()
        };
        let sql = build("sales", &spec);
        assert!(sql.ends_with(&format!("LIMIT {MAX_ROW_LIMIT}")), "{sql}");
    }

    let spec = QuerySpec {
        columns: vec!["region".to_string()],
        limit: Some(50),
        ..QuerySpec::default()
    };
    assert!(build("sales", &spec).ends_with("LIMIT 50"));
}

#[test]
fn filters_take_precedence_over_raw_where() {
    let spec = QuerySpec {
        columns: vec!["region".to_string()],
        where_clause: Some("`sales`.`region` = 'ignored'".to_string()),
        filters: vec![QueryFilter {
            column: "status".to_string(),
            op: FilterOp::Eq,
            value: json!("shipped"),
        }],
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("WHERE (`sales`.`status` = 'shipped')"));
    assert!(!sql.contains("ignored"));
}

#[test]
fn raw_where_is_the_fallback() {
    let spec = QuerySpec {
        columns: vec!["region".to_string()],
        where_clause: Some("`sales`.`amount` > 100".to_string()),
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("WHERE `sales`.`amount` > 100"));
}

#[test]
fn date_filter_values_render_via_str_to_date() {
    let spec = QuerySpec {
        columns: vec!["order_date".to_string()],
        date_by: chartflow::Granularity::parse("day"),
        filters: vec![QueryFilter {
            column: "order_date".to_string(),
            op: FilterOp::Gte,
            value: json!("2024-01-01"),
        }],
        ..QuerySpec::default()
    };
    let sql = build("orders", &spec);
    assert!(sql.contains("WHERE (`orders`.`order_date` >= STR_TO_DATE('2024-01-01', '%Y-%m-%d'))"));
}

#[test]
fn in_filter_renders_a_list() {
    let spec = QuerySpec {
        columns: vec!["region".to_string()],
        filters: vec![QueryFilter {
            column: "region".to_string(),
            op: FilterOp::In,
            value: json!(["East", "West"]),
        }],
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("WHERE `sales`.`region` IN ('East', 'West')"));
}

#[test]
fn binning_applies_to_selected_and_grouped_column() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Count),
        columns: vec!["price".to_string()],
        bin_column: Some("price".to_string()),
        bin_size: Some(10.0),
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("FLOOR(`sales`.`price` / 10) * 10 AS `price`"));
    assert!(sql.contains("GROUP BY FLOOR(`sales`.`price` / 10) * 10"));
}

#[test]
fn binning_and_date_bucketing_combine() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Count),
        columns: vec!["order_date".to_string(), "price".to_string()],
        date_by: chartflow::Granularity::parse("week"),
        bin_column: Some("price".to_string()),
        bin_size: Some(25.0),
        ..QuerySpec::default()
    };
    let sql = build("orders", &spec);
    assert!(sql.contains(
        "MAKEDATE(YEAR(`orders`.`order_date`), 1) + INTERVAL WEEK(`orders`.`order_date`, 0) WEEK"
    ));
    assert!(sql.contains("FLOOR(`orders`.`price` / 25) * 25"));
}

#[test]
fn aggregate_with_column_and_direction() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Sum),
        aggregate_column: Some("amount".to_string()),
        columns: vec!["region".to_string()],
        order_direction: Some(SortDirection::Desc),
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("SUM(`sales`.`amount`) AS `sum`"));
    assert!(sql.contains("GROUP BY `sales`.`region`"));
    assert!(sql.contains("ORDER BY `sum` DESC"));
}

#[test]
fn extra_group_by_columns_are_deduplicated() {
    let spec = QuerySpec {
        aggregate: Some(Aggregation::Count),
        columns: vec!["region".to_string()],
        group_by: vec!["region".to_string(), "channel".to_string()],
        ..QuerySpec::default()
    };
    let sql = build("sales", &spec);
    assert!(sql.contains("GROUP BY `sales`.`region`, `sales`.`channel`"));
}

#[test]
fn invalid_specs_are_rejected() {
    let builder = QueryBuilder::default();

    assert!(builder.build("", &QuerySpec::default()).is_err());
    assert!(builder.build("sales", &QuerySpec::default()).is_err());

    let negative_bin = QuerySpec {
        columns: vec!["price".to_string()],
        bin_column: Some("price".to_string()),
        bin_size: Some(-5.0),
        ..QuerySpec::default()
    };
    assert!(builder.build("sales", &negative_bin).is_err());

    let sum_without_column = QuerySpec {
        aggregate: Some(Aggregation::Sum),
        columns: vec!["region".to_string()],
        ..QuerySpec::default()
    };
    assert!(builder.build("sales", &sum_without_column).is_err());
}

#[test]
fn spec_deserializes_from_request_json() {
    let spec: QuerySpec = serde_json::from_str(
        r#"{
            "aggregate": "count",
            "columns": ["order_date", "region"],
            "date_by": "month",
            "filters": [{"column": "region", "op": "==", "value": "East"}],
            "limit": 100
        }"#,
    )
    .unwrap();
    assert_eq!(spec.aggregate, Some(Aggregation::Count));
    assert_eq!(spec.columns.len(), 2);
    let sql = build("orders", &spec);
    assert!(sql.contains("WHERE (`orders`.`region` = 'East')"));
    assert!(sql.ends_with("LIMIT 100"));
}
