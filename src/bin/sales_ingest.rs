use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use ht_trader::sales_db;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let csv_path = parse_path_arg("--csv").ok_or_else(|| anyhow!("--csv <file> is required"))?;
    let db_path = parse_path_arg("--db")
        .or_else(sales_db::default_db_path)
        .ok_or_else(|| anyhow!("no --db given and no cache dir resolved"))?;
    let export_path = parse_path_arg("--export");

    let sales = sales_db::load_sales_csv(&csv_path)
        .with_context(|| format!("load sales from {}", csv_path.display()))?;
    if sales.is_empty() {
        eprintln!("[WARN] no usable sales rows in {}", csv_path.display());
    }

    let conn = sales_db::open_db(&db_path)?;
    for sale in &sales {
        sales_db::insert_sale(&conn, sale)?;
    }
    println!(
        "ingested {} sales from {} into {}",
        sales.len(),
        csv_path.display(),
        db_path.display()
    );

    if let Some(export) = export_path {
        let exported = sales_db::export_training_csv(&conn, &export)?;
        println!("exported {} rows to {}", exported, export.display());
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).map(PathBuf::from)
}
