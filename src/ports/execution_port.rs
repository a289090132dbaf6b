//! Order execution sink port.

use crate::domain::cycle::OrderRequest;
use crate::domain::error::AutotraderError;

pub trait ExecutionPort {
    /// Submit an order and return the venue's order id. Fills are not awaited.
    fn place(&self, order: &OrderRequest) -> Result<String, AutotraderError>;
}
