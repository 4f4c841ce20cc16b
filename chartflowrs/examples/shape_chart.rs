use chartflow::{transform_dataset, Granularity, Row, TransformOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rows: Vec<Row> = serde_json::from_value(json!([
        {"day": "2024-01-01", "category": "A", "count": 3},
        {"day": "2024-01-01", "category": "B", "count": 2},
        {"day": "2024-01-02", "category": "A", "count": 1},
        {"day": "2024-02-05", "category": "B", "count": 4}
    ]))?;

    let flat = transform_dataset(&rows, &TransformOptions::default());
    println!("flat axes: {}", serde_json::to_string_pretty(&flat.axes)?);
    println!("flat rows: {}", serde_json::to_string_pretty(&flat.rows)?);

    let pivoted = transform_dataset(
        &rows,
        &TransformOptions {
            date_by: Some(Granularity::Month),
            group_by: vec!["day".to_string(), "category".to_string()],
            ..TransformOptions::default()
        },
    );
    println!("pivot axes: {}", serde_json::to_string_pretty(&pivoted.axes)?);
    println!("pivot rows: {}", serde_json::to_string_pretty(&pivoted.rows)?);

    Ok(())
}
