use std::{env, fs};

use chartflow::{QueryBuilder, QuerySpec};

fn usage() {
    eprintln!("Usage: print_sql <table> <spec_json>");
    eprintln!("Example: cargo run --example print_sql -- orders demos/monthly_counts.json");
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let table = args.remove(0);
    let spec_path = args.remove(0);

    let spec_str = fs::read_to_string(spec_path)?;
    let spec: QuerySpec = serde_json::from_str(&spec_str)?;

    let builder = QueryBuilder::default();
    let sql = builder.build(&table, &spec)?;
    println!("{sql}");
    Ok(())
}
