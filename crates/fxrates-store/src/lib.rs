//! Persistent currency rate cache backed by DuckDB.
//!
//! One logical table, `currency_rates`, keyed by (char_code, date). Rows
//! are written only by snapshot batches (the daily sync or a fallback
//! write-back) and are never deleted; the primary key plus upsert writes
//! keep repeated refreshes for the same date idempotent.

pub mod migrations;
pub mod pool;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use duckdb::params;
use thiserror::Error;

pub use pool::{ConnectionPool, PooledConnection};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_home().join("cache").join("rates.duckdb"),
            max_pool_size: 4,
        }
    }
}

/// One rate row as read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRecord {
    pub char_code: String,
    pub nominal: i64,
    pub name: String,
    /// Dot-decimal text, e.g. "75.0000".
    pub value: String,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
}

/// One entry of a snapshot batch to persist. The date comes from the
/// batch, not the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateUpsert {
    pub char_code: String,
    pub nominal: i64,
    pub name: String,
    pub value: String,
}

/// The persistent rate cache. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct RateStore {
    pool: ConnectionPool,
}

impl RateStore {
    /// Open the store, creating the database file, its parent directories
    /// and the schema as needed.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path, config.max_pool_size);
        let store = Self { pool };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(StoreConfig::default())
    }

    /// Idempotent schema bootstrap.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let connection = self.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Point lookup by (code, date). The code is upper-cased before the
    /// comparison; `date` is ISO `YYYY-MM-DD`.
    ///
    /// `Ok(None)` means no row — the expected cache-miss outcome, kept
    /// apart from infrastructure failures.
    pub fn get(&self, char_code: &str, date: &str) -> Result<Option<RateRecord>, StoreError> {
        let connection = self.pool.acquire()?;
        let lookup = connection.query_row(
            "SELECT char_code, nominal, name, value, CAST(date AS VARCHAR) \
             FROM currency_rates WHERE char_code = ? AND date = ?",
            params![char_code.to_ascii_uppercase(), date],
            |row| {
                Ok(RateRecord {
                    char_code: row.get(0)?,
                    nominal: row.get(1)?,
                    name: row.get(2)?,
                    value: row.get(3)?,
                    date: row.get(4)?,
                })
            },
        );

        match lookup {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Persist a full snapshot under one date as a single transaction:
    /// either every entry lands or none do. Entries are upserted on
    /// (char_code, date), and decimal values are normalized to the dot
    /// separator before the write.
    pub fn save_snapshot(&self, rows: &[RateUpsert], date: &str) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), StoreError> {
            let mut statement = connection.prepare(
                "INSERT OR REPLACE INTO currency_rates (char_code, nominal, name, value, date) \
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for row in rows {
                statement.execute(params![
                    row.char_code.to_ascii_uppercase(),
                    row.nominal,
                    row.name,
                    row.value.replace(',', "."),
                    date,
                ])?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Number of rows stored for a date. Used by the sync job's run log.
    pub fn count_for_date(&self, date: &str) -> Result<i64, StoreError> {
        let connection = self.pool.acquire()?;
        let count = connection.query_row(
            "SELECT COUNT(*) FROM currency_rates WHERE date = ?",
            params![date],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn finalize_transaction<T>(
    connection: &duckdb::Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("FXRATES_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".fxrates");
    }

    PathBuf::from(".fxrates")
}
