//! In-process execution sink that never talks to a venue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::domain::cycle::OrderRequest;
use crate::domain::error::AutotraderError;
use crate::ports::execution_port::ExecutionPort;

/// Orders kept for inspection unless [`PaperExecutionAdapter::with_history`] says otherwise.
pub const DEFAULT_HISTORY: usize = 1_000;

/// Accepts orders and assigns sequential `paper-<n>` ids.
///
/// Clones share the order book, so a clone kept by the caller can inspect
/// orders placed through a boxed copy handed to the cycle. The book keeps
/// only the most recent `history` orders; ids keep counting past it.
#[derive(Debug, Clone)]
pub struct PaperExecutionAdapter {
    next_id: Arc<AtomicU64>,
    placed: Arc<Mutex<VecDeque<(String, OrderRequest)>>>,
    history: usize,
    reject_reason: Option<String>,
}

impl Default for PaperExecutionAdapter {
    fn default() -> Self {
        Self {
            next_id: Arc::default(),
            placed: Arc::default(),
            history: DEFAULT_HISTORY,
            reject_reason: None,
        }
    }
}

impl PaperExecutionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `history` placed orders; 0 disables recording.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// Fail every order with `reason`. Rehearses the execution failure path.
    pub fn reject_all(mut self, reason: impl Into<String>) -> Self {
        self.reject_reason = Some(reason.into());
        self
    }

    /// Most recent orders, oldest first.
    pub fn placed_orders(&self) -> Vec<(String, OrderRequest)> {
        self.placed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Orders accepted since construction, including ones aged out of the book.
    pub fn order_count(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl ExecutionPort for PaperExecutionAdapter {
    fn place(&self, order: &OrderRequest) -> Result<String, AutotraderError> {
        if let Some(reason) = &self.reject_reason {
            warn!(
                symbol = %order.symbol,
                direction = %order.direction,
                %reason,
                "paper order rejected"
            );
            return Err(AutotraderError::Execution {
                reason: reason.clone(),
            });
        }

        let order_id = format!("paper-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        info!(
            order_id = %order_id,
            symbol = %order.symbol,
            direction = %order.direction,
            size = order.size,
            leverage = order.leverage,
            price = order.reference_price,
            "paper order accepted"
        );

        if self.history > 0 {
            let mut placed = self.placed.lock().unwrap_or_else(PoisonError::into_inner);
            while placed.len() >= self.history {
                placed.pop_front();
            }
            placed.push_back((order_id.clone(), order.clone()));
        }
        Ok(order_id)
    }
}
