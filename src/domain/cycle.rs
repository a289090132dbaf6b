//! One fetch → score → translate → dispatch → persist pass.
//!
//! The cycle owns the [`PositionTracker`], which is the only state carried
//! from one cycle to the next. Fetch and scoring failures abort the cycle
//! before the tracker is touched. Sink failures happen after the tracker has
//! moved and are recorded on the [`CycleReport`] instead of being rolled back,
//! so the tracked position reflects intended trades, not confirmed fills.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, info_span, warn};

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::{MarketRow, validate_window};
use crate::domain::position::{Action, Direction, Position, PositionTracker};
use crate::domain::scheduler::CycleTask;
use crate::domain::signal::Signal;
use crate::domain::strategies::{Strategy, score_checked};
use crate::ports::data_port::MarketDataPort;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::storage_port::StoragePort;

/// Which non-hold rows of a cycle result are sent to the execution sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Every non-hold row of every cycle.
    #[default]
    All,
    /// Only rows newer than the newest row seen by an earlier cycle. On the
    /// first cycle only the last row counts as new.
    NewRowsOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub symbol: String,
    pub timeframe: String,
    pub window: usize,
    pub order_size: f64,
    pub leverage: u32,
    pub dispatch: DispatchPolicy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        CycleConfig {
            symbol: "BTC/USDT".to_string(),
            timeframe: "1m".to_string(),
            window: 500,
            order_size: 0.0,
            leverage: 1,
            dispatch: DispatchPolicy::All,
        }
    }
}

/// A market row with the signal it produced and the action taken on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRow {
    pub row: MarketRow,
    pub signal: Signal,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub size: f64,
    pub leverage: u32,
    pub timestamp: DateTime<Utc>,
    pub reference_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Placed { order_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub request: OrderRequest,
    pub status: OrderStatus,
}

/// Outcome of a cycle that got past fetch and scoring.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub symbol: String,
    pub strategy_id: String,
    pub rows: Vec<CycleRow>,
    pub orders: Vec<OrderRecord>,
    pub storage_error: Option<String>,
    pub position_after: Position,
}

impl CycleReport {
    pub fn actions(&self) -> Vec<Action> {
        self.rows.iter().map(|r| r.action).collect()
    }

    pub fn trade_count(&self) -> usize {
        self.rows.iter().filter(|r| r.action.is_trade()).count()
    }

    pub fn failed_orders(&self) -> impl Iterator<Item = &OrderRecord> {
        self.orders
            .iter()
            .filter(|o| matches!(o.status, OrderStatus::Failed { .. }))
    }
}

/// Zip rows and signals with the tracker's actions, dropping the leading row.
pub fn assemble_rows(
    rows: Vec<MarketRow>,
    signals: &[Signal],
    actions: &[Action],
) -> Vec<CycleRow> {
    rows.into_iter()
        .zip(signals.iter().copied())
        .skip(1)
        .zip(actions.iter().copied())
        .map(|((row, signal), action)| CycleRow {
            row,
            signal,
            action,
        })
        .collect()
}

pub struct ExecutionCycle {
    config: CycleConfig,
    data: Box<dyn MarketDataPort + Send>,
    strategy: Arc<dyn Strategy>,
    storage: Option<Box<dyn StoragePort + Send>>,
    execution: Option<Box<dyn ExecutionPort + Send>>,
    tracker: PositionTracker,
    last_cycle_id: u64,
    dispatched_through: Option<DateTime<Utc>>,
}

impl ExecutionCycle {
    pub fn new(
        config: CycleConfig,
        data: Box<dyn MarketDataPort + Send>,
        strategy: Arc<dyn Strategy>,
    ) -> Self {
        ExecutionCycle {
            config,
            data,
            strategy,
            storage: None,
            execution: None,
            tracker: PositionTracker::new(),
            last_cycle_id: 0,
            dispatched_through: None,
        }
    }

    pub fn with_storage(mut self, storage: Box<dyn StoragePort + Send>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_execution(mut self, execution: Box<dyn ExecutionPort + Send>) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn with_tracker(mut self, tracker: PositionTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn strategy_id(&self) -> &str {
        self.strategy.name()
    }

    pub fn position(&self) -> Position {
        self.tracker.position()
    }

    /// Return the tracked position to flat. Never called by the cycle itself.
    pub fn reset_position(&mut self) {
        self.tracker.reset();
    }

    pub fn cycles_started(&self) -> u64 {
        self.last_cycle_id
    }

    pub fn run(&mut self) -> Result<CycleReport, AutotraderError> {
        self.last_cycle_id += 1;
        let cycle_id = self.last_cycle_id;
        let span = info_span!(
            "cycle",
            id = cycle_id,
            symbol = %self.config.symbol,
            strategy = %self.strategy.name()
        );
        let _enter = span.enter();

        let (rows, signals) = match self.fetch_and_score() {
            Ok(scored) => scored,
            Err(e) => {
                warn!(error = %e, position = %self.tracker.position(), "cycle aborted");
                return Err(e);
            }
        };

        // Only mutation of cross-cycle state.
        let actions = self.tracker.translate(&signals);
        let rows = assemble_rows(rows, &signals, &actions);
        debug!(
            rows = rows.len(),
            position = %self.tracker.position(),
            "signals translated"
        );

        let storage_error = self.persist(&rows);
        let orders = self.dispatch(&rows);

        let report = CycleReport {
            cycle_id,
            symbol: self.config.symbol.clone(),
            strategy_id: self.strategy.name().to_string(),
            rows,
            orders,
            storage_error,
            position_after: self.tracker.position(),
        };

        info!(
            rows = report.rows.len(),
            trades = report.trade_count(),
            orders = report.orders.len(),
            failed_orders = report.failed_orders().count(),
            position = %report.position_after,
            "cycle complete"
        );
        Ok(report)
    }

    fn fetch_and_score(&self) -> Result<(Vec<MarketRow>, Vec<Signal>), AutotraderError> {
        let symbol = &self.config.symbol;

        let rows = self
            .data
            .fetch_window(symbol, &self.config.timeframe, self.config.window)
            .map_err(|e| match e {
                AutotraderError::DataUnavailable { .. } => e,
                other => AutotraderError::data_unavailable(symbol, other.to_string()),
            })?;
        validate_window(symbol, &rows)?;
        debug!(rows = rows.len(), "window fetched");

        let signals = score_checked(self.strategy.as_ref(), &rows).map_err(|e| match e {
            AutotraderError::Strategy { .. } => e,
            other => AutotraderError::strategy(self.strategy.name(), other.to_string()),
        })?;

        Ok((rows, signals))
    }

    fn persist(&self, rows: &[CycleRow]) -> Option<String> {
        let storage = match &self.storage {
            Some(s) => s,
            None => {
                debug!("no storage sink configured");
                return None;
            }
        };

        match storage.store(rows, &self.config.symbol, self.strategy.name()) {
            Ok(()) => {
                debug!(rows = rows.len(), "rows stored");
                None
            }
            Err(e) => {
                error!(error = %e, "storage failed");
                Some(e.to_string())
            }
        }
    }

    fn dispatch(&mut self, rows: &[CycleRow]) -> Vec<OrderRecord> {
        let newest = rows.last().map(|r| r.row.timestamp);
        let cutoff = match self.config.dispatch {
            DispatchPolicy::All => None,
            // first cycle: everything before the newest row is history
            DispatchPolicy::NewRowsOnly => match self.dispatched_through {
                Some(mark) => Some(mark),
                None => rows.iter().rev().nth(1).map(|r| r.row.timestamp),
            },
        };

        let mut orders = Vec::new();
        for cycle_row in rows {
            let direction = match cycle_row.action.direction() {
                Some(d) => d,
                None => continue,
            };
            if cutoff.is_some_and(|mark| cycle_row.row.timestamp <= mark) {
                continue;
            }

            let request = OrderRequest {
                symbol: self.config.symbol.clone(),
                direction,
                size: self.config.order_size,
                leverage: self.config.leverage,
                timestamp: cycle_row.row.timestamp,
                reference_price: cycle_row.row.close,
            };

            let execution = match &self.execution {
                Some(e) => e,
                None => {
                    debug!(
                        direction = %direction,
                        timestamp = %cycle_row.row.timestamp,
                        "no execution sink configured, order not sent"
                    );
                    continue;
                }
            };

            let status = match execution.place(&request) {
                Ok(order_id) => {
                    info!(
                        order_id = %order_id,
                        direction = %direction,
                        size = request.size,
                        price = request.reference_price,
                        "order placed"
                    );
                    OrderStatus::Placed { order_id }
                }
                Err(e) => {
                    error!(
                        error = %e,
                        direction = %direction,
                        position = %self.tracker.position(),
                        "order failed; tracked position no longer matches the venue"
                    );
                    OrderStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            orders.push(OrderRecord { request, status });
        }

        if self.config.dispatch == DispatchPolicy::NewRowsOnly {
            if let Some(ts) = newest {
                self.dispatched_through = Some(self.dispatched_through.map_or(ts, |m| m.max(ts)));
            }
        }
        orders
    }
}

impl CycleTask for ExecutionCycle {
    fn run_cycle(&mut self) -> Result<(), AutotraderError> {
        self.run().map(|_| ())
    }
}
