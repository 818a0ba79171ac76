use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::comparables::SaleRecord;
use crate::model::GOALKEEPER_FEATURES;
use crate::record::AttrMap;

/// Every attribute column the store keeps per sale; the superset used by
/// the goalkeeper model covers both feature orders.
pub const SALE_COLUMNS: [&str; 11] = GOALKEEPER_FEATURES;

pub fn default_db_path() -> Option<PathBuf> {
    crate::model::app_cache_dir().map(|dir| dir.join("player_sales.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sales db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS sales (
            sale_id INTEGER PRIMARY KEY AUTOINCREMENT,
            playmaking REAL NOT NULL,
            passing REAL NOT NULL,
            defending REAL NOT NULL,
            scoring REAL NOT NULL,
            winger REAL NOT NULL,
            form REAL NOT NULL,
            tsi REAL NOT NULL,
            age_days REAL NOT NULL,
            specialty_index REAL NOT NULL,
            goalkeeping REAL NOT NULL,
            set_pieces REAL NOT NULL,
            price REAL NOT NULL,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sales_age_days ON sales(age_days);
        CREATE INDEX IF NOT EXISTS idx_sales_price ON sales(price);
        "#,
    )
    .context("create sales schema")?;
    Ok(())
}

pub fn insert_sale(conn: &Connection, sale: &SaleRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO sales (
            playmaking, passing, defending, scoring, winger, form,
            tsi, age_days, specialty_index, goalkeeping, set_pieces,
            price, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            sale.attrs.get_or_zero("playmaking"),
            sale.attrs.get_or_zero("passing"),
            sale.attrs.get_or_zero("defending"),
            sale.attrs.get_or_zero("scoring"),
            sale.attrs.get_or_zero("winger"),
            sale.attrs.get_or_zero("form"),
            sale.attrs.get_or_zero("tsi"),
            sale.attrs.get_or_zero("age_days"),
            sale.attrs.get_or_zero("specialty_index"),
            sale.attrs.get_or_zero("goalkeeping"),
            sale.attrs.get_or_zero("set_pieces"),
            sale.price,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("insert sale")?;
    Ok(())
}

/// Load every recorded sale, oldest first, usable directly as a comparable
/// set for the estimator.
pub fn load_sales(conn: &Connection) -> Result<Vec<SaleRecord>> {
    let columns = SALE_COLUMNS.join(", ");
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {columns}, price FROM sales ORDER BY sale_id ASC"
        ))
        .context("prepare sales query")?;

    let rows = stmt
        .query_map([], |row| {
            let mut attrs = AttrMap::new();
            for (idx, column) in SALE_COLUMNS.iter().enumerate() {
                attrs.set(column, row.get::<_, f64>(idx)?);
            }
            let price: f64 = row.get(SALE_COLUMNS.len())?;
            Ok(SaleRecord::new(attrs, price))
        })
        .context("query sales")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode sale row")?);
    }
    Ok(out)
}

/// Dump the store in the training-dataset CSV schema (feature columns plus
/// `price`). Returns the number of exported rows.
pub fn export_training_csv(conn: &Connection, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let sales = load_sales(conn)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create training csv {}", path.display()))?;

    let mut header: Vec<&str> = SALE_COLUMNS.to_vec();
    header.push("price");
    writer.write_record(&header).context("write csv header")?;

    for sale in &sales {
        let mut row: Vec<String> = SALE_COLUMNS
            .iter()
            .map(|column| sale.attrs.get_or_zero(column).to_string())
            .collect();
        row.push(sale.price.to_string());
        writer.write_record(&row).context("write csv row")?;
    }
    writer.flush().context("flush training csv")?;
    Ok(sales.len())
}

/// Read sales from a CSV file (same schema as the training dataset). Rows
/// without a positive price are skipped; malformed cells coerce to 0.
pub fn load_sales_csv(path: &Path) -> Result<Vec<SaleRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open sales csv {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read sales csv header {}", path.display()))?
        .clone();

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read sales csv row {}", path.display()))?;
        let mut attrs = AttrMap::new();
        let mut price = 0.0;
        for (idx, name) in headers.iter().enumerate() {
            let name = name.trim();
            let value = record
                .get(idx)
                .and_then(|raw| {
                    let raw = raw.trim();
                    raw.parse::<f64>()
                        .ok()
                        .or_else(|| raw.replace(',', ".").parse::<f64>().ok())
                })
                .unwrap_or(0.0);
            if name == "price" {
                price = value;
            } else {
                attrs.set(name, value);
            }
        }
        if price > 0.0 {
            out.push(SaleRecord::new(attrs, price));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sale(playmaking: f64, price: f64) -> SaleRecord {
        let mut attrs = AttrMap::new();
        for column in SALE_COLUMNS {
            attrs.set(column, 1.0);
        }
        attrs.set("playmaking", playmaking);
        SaleRecord::new(attrs, price)
    }

    #[test]
    fn insert_and_load_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        insert_sale(&conn, &sample_sale(7.0, 1_500_000.0)).unwrap();
        insert_sale(&conn, &sample_sale(9.0, 2_500_000.0)).unwrap();

        let sales = load_sales(&conn).unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].attrs.get("playmaking"), Some(7.0));
        assert_eq!(sales[0].price, 1_500_000.0);
        assert_eq!(sales[1].attrs.get("playmaking"), Some(9.0));
    }

    #[test]
    fn exported_csv_feeds_model_training() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        for i in 1..=6 {
            insert_sale(&conn, &sample_sale(i as f64, 300_000.0 * i as f64)).unwrap();
        }

        let path = std::env::temp_dir().join(format!(
            "ht_trader_export_{}_{}.csv",
            std::process::id(),
            line!()
        ));
        let exported = export_training_csv(&conn, &path).unwrap();
        assert_eq!(exported, 6);

        let (rows, prices) =
            crate::model::load_training_rows(&path, &crate::model::GENERAL_FEATURES).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(prices[0], 300_000.0);

        let reloaded = load_sales_csv(&path).unwrap();
        assert_eq!(reloaded.len(), 6);
        assert_eq!(reloaded[2].attrs.get("playmaking"), Some(3.0));
        std::fs::remove_file(&path).ok();
    }
}
