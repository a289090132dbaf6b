//! OHLCV market row representation.

use chrono::{DateTime, Utc};

use crate::domain::error::AutotraderError;

/// One candle of a market-data window.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRow {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Check that a fetched window is ordered by strictly increasing timestamp.
pub fn validate_window(symbol: &str, rows: &[MarketRow]) -> Result<(), AutotraderError> {
    for (i, pair) in rows.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(AutotraderError::data_unavailable(
                symbol,
                format!(
                    "timestamps not strictly increasing at row {} ({} after {})",
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp
                ),
            ));
        }
    }
    Ok(())
}
