//! Market data source port.

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::MarketRow;

pub trait MarketDataPort {
    /// Return up to `limit` of the most recent rows, oldest first.
    ///
    /// A source that exists but holds no rows for `symbol` and `timeframe`
    /// yields an empty window, not an error. A source that cannot be read
    /// (missing file, unreachable database, malformed row) fails with
    /// [`AutotraderError::DataUnavailable`].
    fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<MarketRow>, AutotraderError>;
}
