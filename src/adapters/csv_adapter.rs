//! CSV file market data adapter.
//!
//! One file per symbol and timeframe, named `<SYMBOL>_<timeframe>.csv` with
//! `/` in the symbol replaced by `_` (so `BTC/USDT` at `1m` lives in
//! `BTC_USDT_1m.csv`). Columns: `timestamp,open,high,low,close,volume`.

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::MarketRow;
use crate::ports::data_port::MarketDataPort;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.replace('/', "_"), timeframe))
    }

    /// Write rows in the layout `fetch_window` reads, replacing any existing file.
    pub fn write_window(
        &self,
        symbol: &str,
        timeframe: &str,
        rows: &[MarketRow],
    ) -> Result<PathBuf, AutotraderError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol, timeframe);

        let mut wtr = csv::Writer::from_path(&path).map_err(|e| {
            AutotraderError::Io(std::io::Error::other(format!(
                "failed to create {}: {}",
                path.display(),
                e
            )))
        })?;
        let write_err = |e: csv::Error| AutotraderError::Io(std::io::Error::other(e.to_string()));

        wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])
            .map_err(write_err)?;
        for row in rows {
            wtr.write_record([
                row.timestamp.to_rfc3339(),
                row.open.to_string(),
                row.high.to_string(),
                row.low.to_string(),
                row.close.to_string(),
                row.volume.to_string(),
            ])
            .map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(path)
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or integer epoch milliseconds.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    symbol: &str,
) -> Result<f64, AutotraderError> {
    record
        .get(index)
        .ok_or_else(|| AutotraderError::data_unavailable(symbol, format!("missing {} column", column)))?
        .trim()
        .parse()
        .map_err(|e| {
            AutotraderError::data_unavailable(symbol, format!("invalid {} value: {}", column, e))
        })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<MarketRow>, AutotraderError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| {
            AutotraderError::data_unavailable(
                symbol,
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| {
                AutotraderError::data_unavailable(symbol, format!("CSV parse error: {}", e))
            })?;

            let ts_str = record
                .get(0)
                .ok_or_else(|| AutotraderError::data_unavailable(symbol, "missing timestamp column"))?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                AutotraderError::data_unavailable(symbol, format!("invalid timestamp: {}", ts_str))
            })?;

            rows.push(MarketRow {
                timestamp,
                open: parse_price(&record, 1, "open", symbol)?,
                high: parse_price(&record, 2, "high", symbol)?,
                low: parse_price(&record, 3, "low", symbol)?,
                close: parse_price(&record, 4, "close", symbol)?,
                volume: parse_price(&record, 5, "volume", symbol)?,
            });
        }

        rows.sort_by_key(|r| r.timestamp);
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15T09:02:00Z,110.0,120.0,105.0,115.0,5.5\n\
            2024-01-15T09:00:00Z,100.0,110.0,90.0,105.0,5.0\n\
            2024-01-15T09:01:00Z,105.0,115.0,100.0,110.0,6.0\n";

        fs::write(path.join("BTC_USDT_1m.csv"), csv_content).unwrap();
        fs::write(
            path.join("ETH_USDT_1m.csv"),
            "timestamp,open,high,low,close,volume\n1705309200000,1,2,0.5,1.5,10\n",
        )
        .unwrap();
        fs::write(
            path.join("BAD_USDT_1m.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-15T09:00:00Z,1,2,abc,1.5,10\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_window_returns_sorted_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let rows = adapter.fetch_window("BTC/USDT", "1m", 500).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
        );
        assert_eq!(rows[0].open, 100.0);
        assert_eq!(rows[0].high, 110.0);
        assert_eq!(rows[0].low, 90.0);
        assert_eq!(rows[0].close, 105.0);
        assert_eq!(rows[0].volume, 5.0);
        assert_eq!(rows[2].close, 115.0);
    }

    #[test]
    fn fetch_window_keeps_most_recent_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let rows = adapter.fetch_window("BTC/USDT", "1m", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].close, 110.0);
        assert_eq!(rows[1].close, 115.0);
    }

    #[test]
    fn fetch_window_parses_epoch_millis() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let rows = adapter.fetch_window("ETH/USDT", "1m", 10).unwrap();
        assert_eq!(
            rows[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_window("XRP/USDT", "1m", 10);
        assert!(matches!(
            result,
            Err(AutotraderError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn header_only_file_yields_empty_window() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("ADA_USDT_1m.csv"),
            "timestamp,open,high,low,close,volume\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.fetch_window("ADA/USDT", "1m", 10).unwrap(), vec![]);
    }

    #[test]
    fn malformed_value_is_data_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        match adapter.fetch_window("BAD/USDT", "1m", 10) {
            Err(AutotraderError::DataUnavailable { symbol, reason }) => {
                assert_eq!(symbol, "BAD/USDT");
                assert!(reason.contains("low"));
            }
            other => panic!("expected DataUnavailable, got: {other:?}"),
        }
    }

    #[test]
    fn write_then_fetch() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("nested"));
        let rows = vec![MarketRow {
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
            open: 1.25,
            high: 1.5,
            low: 1.0,
            close: 1.4,
            volume: 42.0,
        }];

        let path = adapter.write_window("SOL/USDT", "5m", &rows).unwrap();
        assert!(path.ends_with("SOL_USDT_5m.csv"));
        assert_eq!(adapter.fetch_window("SOL/USDT", "5m", 10).unwrap(), rows);
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T09:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 09:00:00"), Some(expected));
        assert_eq!(parse_timestamp("1705309200000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
