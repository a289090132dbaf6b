//! Storage sink port.

use crate::domain::cycle::CycleRow;
use crate::domain::error::AutotraderError;

/// Sink for finalized cycle rows.
///
/// Implementations must tolerate duplicate (symbol, timestamp) rows so that a
/// retried store of identical input is harmless.
pub trait StoragePort {
    fn store(
        &self,
        rows: &[CycleRow],
        symbol: &str,
        strategy_id: &str,
    ) -> Result<(), AutotraderError>;
}
