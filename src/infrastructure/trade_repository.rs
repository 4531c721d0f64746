//! SQLite store adapter: schema, reference-data import, batched inserts and
//! the aggregate queries the report command reads.
//!
//! Schema management is SQL-in-code with `IF NOT EXISTS` guards; `init` can
//! be re-run safely against an existing database.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use tracing::info;

use crate::domain::district::District;
use crate::domain::repositories::TradeWriter;
use crate::domain::trade::TradeRecord;

/// Per-district aggregate row for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictTradeStat {
    pub district_name: String,
    pub trade_count: i64,
    pub avg_price: f64,
    pub max_price: i64,
}

/// Transactions-per-month aggregate row for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTradeCount {
    pub month: String,
    pub trade_count: i64,
}

/// Per-district price-per-pyeong aggregate for the report's ranking table.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictPyStat {
    pub district_name: String,
    pub avg_py: f64,
    pub trade_count: i64,
}

pub struct SqliteTradeRepository {
    pool: SqlitePool,
}

impl SqliteTradeRepository {
    /// Opens (and if necessary creates) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        // SQLite will not create missing parent directories or the file.
        if !Path::new(db_path).exists() {
            if let Some(parent) = Path::new(db_path).parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory for {db_path}"))?;
            }
            std::fs::File::create(db_path)
                .with_context(|| format!("creating database file {db_path}"))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("connecting to {database_url}"))?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates both tables and their indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS district_code (
                region_code TEXT PRIMARY KEY,
                sigungu_name TEXT NOT NULL,
                addr_level1 TEXT NOT NULL,
                addr_level2 TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating district_code table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                region_code TEXT NOT NULL,
                contract_date DATE NOT NULL,
                district_name TEXT NOT NULL,
                district_code TEXT NOT NULL,
                construction_year INTEGER NOT NULL,
                address TEXT NOT NULL,
                apt_name TEXT NOT NULL,
                apt_section TEXT,
                floor INTEGER NOT NULL,
                area INTEGER NOT NULL,
                price INTEGER NOT NULL,
                price_unit REAL NOT NULL,
                py INTEGER NOT NULL,
                py_unit REAL NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_code) REFERENCES district_code (region_code)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating trade table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_trade_region_code ON trade (region_code);
            CREATE INDEX IF NOT EXISTS idx_trade_contract_date ON trade (contract_date);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating trade indexes")?;

        info!("Database schema ready");
        Ok(())
    }

    /// Loads the district reference table from CSV, once. A populated table
    /// is left untouched so `init` stays idempotent.
    pub async fn import_districts(&self, csv_path: &Path) -> Result<u64> {
        let existing = self.district_count().await?;
        if existing > 0 {
            info!(existing, "District reference table already populated; skipping import");
            return Ok(0);
        }

        let mut reader = csv::Reader::from_path(csv_path)
            .with_context(|| format!("opening district CSV {csv_path:?}"))?;

        let mut tx = self.pool.begin().await?;
        let mut imported = 0u64;
        for row in reader.deserialize::<District>() {
            let district = row.context("reading district CSV row")?;
            sqlx::query(
                r#"
                INSERT INTO district_code (region_code, sigungu_name, addr_level1, addr_level2)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&district.region_code)
            .bind(&district.sigungu_name)
            .bind(&district.addr_level1)
            .bind(&district.addr_level2)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting district {}", district.region_code))?;
            imported += 1;
        }
        tx.commit().await?;

        info!(imported, csv = ?csv_path, "Imported district reference data");
        Ok(imported)
    }

    /// Every district, ordered by region code. The ordering is part of the
    /// crawl contract: cursor indices are positions in this list.
    pub async fn load_districts(&self) -> Result<Vec<District>> {
        let rows = sqlx::query(
            r#"
            SELECT region_code, sigungu_name, addr_level1, addr_level2
            FROM district_code
            ORDER BY region_code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("loading district reference table")?;

        rows.iter()
            .map(|row| {
                Ok(District {
                    region_code: row.try_get("region_code")?,
                    sigungu_name: row.try_get("sigungu_name")?,
                    addr_level1: row.try_get("addr_level1")?,
                    addr_level2: row.try_get("addr_level2")?,
                })
            })
            .collect()
    }

    pub async fn district_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM district_code")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    pub async fn trade_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM trade")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    /// Earliest and latest contract dates present, if any rows exist.
    pub async fn contract_date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let row = sqlx::query(
            "SELECT MIN(contract_date) as min_date, MAX(contract_date) as max_date FROM trade",
        )
        .fetch_one(&self.pool)
        .await?;

        let min: Option<NaiveDate> = row.try_get("min_date")?;
        let max: Option<NaiveDate> = row.try_get("max_date")?;
        Ok(min.zip(max))
    }

    /// Count, average and peak price per district, busiest districts first.
    pub async fn district_stats(&self) -> Result<Vec<DistrictTradeStat>> {
        let rows = sqlx::query(
            r#"
            SELECT district_name,
                   COUNT(*) as trade_count,
                   AVG(price) as avg_price,
                   MAX(price) as max_price
            FROM trade
            GROUP BY district_name
            ORDER BY trade_count DESC, district_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DistrictTradeStat {
                    district_name: row.try_get("district_name")?,
                    trade_count: row.try_get("trade_count")?,
                    avg_price: row.try_get("avg_price")?,
                    max_price: row.try_get("max_price")?,
                })
            })
            .collect()
    }

    /// Priciest districts by average price per pyeong, top ten.
    pub async fn top_py_districts(&self) -> Result<Vec<DistrictPyStat>> {
        let rows = sqlx::query(
            r#"
            SELECT district_name,
                   AVG(py) as avg_py,
                   COUNT(*) as trade_count
            FROM trade
            GROUP BY district_name
            ORDER BY avg_py DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DistrictPyStat {
                    district_name: row.try_get("district_name")?,
                    avg_py: row.try_get("avg_py")?,
                    trade_count: row.try_get("trade_count")?,
                })
            })
            .collect()
    }

    /// Transactions per calendar month, chronological.
    pub async fn monthly_counts(&self) -> Result<Vec<MonthlyTradeCount>> {
        let rows = sqlx::query(
            r#"
            SELECT strftime('%Y-%m', contract_date) as month,
                   COUNT(*) as trade_count
            FROM trade
            GROUP BY month
            ORDER BY month
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MonthlyTradeCount {
                    month: row.try_get("month")?,
                    trade_count: row.try_get("trade_count")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TradeWriter for SqliteTradeRepository {
    async fn insert_trades(&self, records: &[TradeRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO trade (
                    region_code, contract_date, district_name, district_code,
                    construction_year, address, apt_name, apt_section,
                    floor, area, price, price_unit, py, py_unit
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(&record.region_code)
            .bind(record.contract_date)
            .bind(&record.district_name)
            .bind(&record.district_code)
            .bind(record.construction_year)
            .bind(&record.address)
            .bind(&record.apt_name)
            .bind(&record.apt_section)
            .bind(i64::from(record.floor))
            .bind(record.area)
            .bind(record.price)
            .bind(record.price_unit)
            .bind(record.py)
            .bind(record.py_unit)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "inserting trade {} {} {}",
                    record.region_code, record.contract_date, record.apt_name
                )
            })?;
        }
        tx.commit().await?;

        Ok(records.len() as u64)
    }
}
