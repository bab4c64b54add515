//! SQLite persistence for extracted trade records.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{error, info};

use crate::models::TradeRecord;

/// Persistence handle, constructed once per run and passed into the
/// collector explicitly.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the SQLite database and ensures the
    /// results table exists.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        let db = Self { pool };
        db.create_table().await?;
        info!("Database initialized at {}", database_path);

        Ok(db)
    }

    /// Creates the results table if it does not exist. No unique constraint
    /// on (trade_date, instrument_code): duplicate-date reinsertion is
    /// permitted, matching the source system.
    pub async fn create_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spimex_trading_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instrument_code TEXT NOT NULL,
                instrument_name TEXT NOT NULL,
                oil_id TEXT NOT NULL,
                delivery_basis_id TEXT NOT NULL,
                delivery_basis_name TEXT,
                delivery_type_id TEXT NOT NULL,
                volume REAL NOT NULL,
                total REAL NOT NULL,
                contract_count INTEGER NOT NULL,
                trade_date DATE NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trading_results_date \
             ON spimex_trading_results(trade_date)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drops the results table.
    pub async fn drop_table(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS spimex_trading_results")
            .execute(&self.pool)
            .await?;
        info!("Dropped spimex_trading_results");
        Ok(())
    }

    /// Inserts one date's records all-or-nothing. Any row failure rolls the
    /// whole batch back and surfaces the error; no partial writes survive.
    pub async fn insert_batch(&self, records: &[TradeRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO spimex_trading_results (
                    id, instrument_code, instrument_name, oil_id,
                    delivery_basis_id, delivery_basis_name, delivery_type_id,
                    volume, total, contract_count, trade_date,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.id)
            .bind(&record.instrument_code)
            .bind(&record.instrument_name)
            .bind(&record.oil_id)
            .bind(&record.delivery_basis_id)
            .bind(&record.delivery_basis_name)
            .bind(&record.delivery_type_id)
            .bind(record.volume)
            .bind(record.total)
            .bind(record.contract_count)
            .bind(record.trade_date)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut tx)
            .await;

            if let Err(e) = result {
                error!(
                    "Insert failed for {} on {}, rolling back batch: {}",
                    record.instrument_code, record.trade_date, e
                );
                tx.rollback().await?;
                return Err(e.into());
            }
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Number of stored records for one trade date.
    pub async fn count_for_date(&self, trade_date: NaiveDate) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM spimex_trading_results WHERE trade_date = ?",
        )
        .bind(trade_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("n"))
    }

    /// Total stored record count.
    pub async fn record_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM spimex_trading_results")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("n"))
    }
}
