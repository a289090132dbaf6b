//! SQLite storage sink and replay data source.
//!
//! Timestamps are stored as epoch milliseconds so `ORDER BY timestamp` is
//! chronological. Both tables are keyed so that `INSERT OR REPLACE` makes a
//! repeated store of the same rows a no-op.

use crate::domain::cycle::CycleRow;
use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::MarketRow;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::storage_port::StoragePort;
use chrono::DateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::debug;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    timeframe: String,
}

fn query_err(e: rusqlite::Error) -> AutotraderError {
    AutotraderError::Storage {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AutotraderError> {
        let db_path =
            config
                .get_string("storage", "path")
                .ok_or_else(|| AutotraderError::ConfigMissing {
                    section: "storage".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("storage", "pool_size", 4).max(1) as u32;
        let timeframe = config
            .get_string("storage", "timeframe")
            .or_else(|| config.get_string("market", "timeframe"))
            .unwrap_or_else(|| "1m".to_string());

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| AutotraderError::Storage {
                    reason: e.to_string(),
                })?;

        debug!(path = %db_path, pool_size, "sqlite pool opened");
        Ok(Self { pool, timeframe })
    }

    pub fn in_memory() -> Result<Self, AutotraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AutotraderError::Storage {
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            timeframe: "1m".to_string(),
        })
    }

    /// Timeframe recorded on `ohlcv` rows written through [`StoragePort::store`].
    pub fn with_timeframe(mut self, timeframe: &str) -> Self {
        self.timeframe = timeframe.to_string();
        self
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AutotraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AutotraderError::Storage {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), AutotraderError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ohlcv (
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (symbol, timeframe, timestamp)
            );
            CREATE TABLE IF NOT EXISTS signals (
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                signal INTEGER NOT NULL,
                action TEXT NOT NULL,
                PRIMARY KEY (symbol, strategy, timestamp)
            );
            CREATE INDEX IF NOT EXISTS idx_ohlcv_symbol ON ohlcv(symbol, timeframe);
            CREATE INDEX IF NOT EXISTS idx_signals_symbol ON signals(symbol, strategy);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    /// Seed `ohlcv` with raw market rows, e.g. for replay through `fetch_window`.
    pub fn insert_market_rows(
        &self,
        symbol: &str,
        timeframe: &str,
        rows: &[MarketRow],
    ) -> Result<(), AutotraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for row in rows {
            insert_ohlcv(&tx, symbol, timeframe, row)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    pub fn count_rows(&self, symbol: &str) -> Result<usize, AutotraderError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ohlcv WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }

    pub fn count_signals(&self, symbol: &str, strategy: &str) -> Result<usize, AutotraderError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM signals WHERE symbol = ?1 AND strategy = ?2",
                params![symbol, strategy],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }

    pub fn list_symbols(&self) -> Result<Vec<String>, AutotraderError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM ohlcv ORDER BY symbol")
            .map_err(query_err)?;

        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_err)?);
        }

        Ok(symbols)
    }
}

fn insert_ohlcv(
    tx: &rusqlite::Transaction<'_>,
    symbol: &str,
    timeframe: &str,
    row: &MarketRow,
) -> Result<(), AutotraderError> {
    tx.execute(
        "INSERT OR REPLACE INTO ohlcv (symbol, timeframe, timestamp, open, high, low, close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            symbol,
            timeframe,
            row.timestamp.timestamp_millis(),
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume
        ],
    )
    .map_err(query_err)?;
    Ok(())
}

impl StoragePort for SqliteAdapter {
    fn store(
        &self,
        rows: &[CycleRow],
        symbol: &str,
        strategy_id: &str,
    ) -> Result<(), AutotraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let mut signals_written = 0usize;
        for cycle_row in rows {
            insert_ohlcv(&tx, symbol, &self.timeframe, &cycle_row.row)?;

            if cycle_row.signal == Signal::Flat {
                continue;
            }
            tx.execute(
                "INSERT OR REPLACE INTO signals (symbol, strategy, timestamp, signal, action)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    symbol,
                    strategy_id,
                    cycle_row.row.timestamp.timestamp_millis(),
                    cycle_row.signal.value(),
                    cycle_row.action.as_str()
                ],
            )
            .map_err(query_err)?;
            signals_written += 1;
        }

        tx.commit().map_err(query_err)?;
        debug!(rows = rows.len(), signals = signals_written, "sqlite store committed");
        Ok(())
    }
}

impl MarketDataPort for SqliteAdapter {
    fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<MarketRow>, AutotraderError> {
        let unavailable = |e: rusqlite::Error| AutotraderError::data_unavailable(symbol, e.to_string());
        let conn = self
            .conn()
            .map_err(|e| AutotraderError::data_unavailable(symbol, e.to_string()))?;

        let query = "SELECT timestamp, open, high, low, close, volume
                     FROM ohlcv
                     WHERE symbol = ?1 AND timeframe = ?2
                     ORDER BY timestamp DESC
                     LIMIT ?3";

        let mut stmt = conn.prepare(query).map_err(unavailable)?;

        let rows = stmt
            .query_map(params![symbol, timeframe, limit as i64], |row| {
                let millis: i64 = row.get(0)?;
                let timestamp = DateTime::from_timestamp_millis(millis).ok_or(
                    rusqlite::Error::IntegralValueOutOfRange(0, millis),
                )?;
                Ok(MarketRow {
                    timestamp,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(unavailable)?;

        let mut window = Vec::new();
        for row in rows {
            window.push(row.map_err(unavailable)?);
        }

        window.reverse();
        Ok(window)
    }
}
