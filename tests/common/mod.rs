#![allow(dead_code)]

use autotrader::domain::cycle::{CycleConfig, CycleRow, OrderRequest};
use autotrader::domain::error::AutotraderError;
pub use autotrader::domain::ohlcv::MarketRow;
use autotrader::domain::signal::Signal;
use autotrader::domain::strategies::Strategy;
use autotrader::ports::data_port::MarketDataPort;
use autotrader::ports::execution_port::ExecutionPort;
use autotrader::ports::storage_port::StoragePort;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const SYMBOL: &str = "BTC/USDT";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn make_row(minute: i64, close: f64) -> MarketRow {
    MarketRow {
        timestamp: start_time() + Duration::minutes(minute),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 100.0,
    }
}

/// Rows at consecutive minutes starting at `first_minute`.
pub fn make_rows(first_minute: i64, closes: &[f64]) -> Vec<MarketRow> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_row(first_minute + i as i64, c))
        .collect()
}

pub fn flat_rows(n: usize) -> Vec<MarketRow> {
    make_rows(0, &vec![100.0; n])
}

pub fn cycle_config() -> CycleConfig {
    CycleConfig {
        symbol: SYMBOL.to_string(),
        order_size: 0.5,
        leverage: 2,
        ..CycleConfig::default()
    }
}

/// Data source returning queued responses in order, repeating the last one.
#[derive(Clone)]
pub struct MockDataPort {
    responses: Arc<Mutex<VecDeque<Result<Vec<MarketRow>, String>>>>,
    last: Arc<Mutex<Option<Result<Vec<MarketRow>, String>>>>,
    pub calls: Arc<Mutex<usize>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_rows(self, rows: Vec<MarketRow>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub fn with_error(self, reason: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_window(
        &self,
        symbol: &str,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<MarketRow>, AutotraderError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            *last = Some(response);
        }
        match last.clone() {
            Some(Ok(rows)) => {
                let skip = rows.len().saturating_sub(limit);
                Ok(rows[skip..].to_vec())
            }
            Some(Err(reason)) => Err(AutotraderError::data_unavailable(symbol, reason)),
            None => Err(AutotraderError::data_unavailable(symbol, "no data queued")),
        }
    }
}

/// Storage sink recording every call; optionally failing.
#[derive(Clone, Default)]
pub struct MockStorage {
    pub stored: Arc<Mutex<Vec<(String, String, Vec<CycleRow>)>>>,
    pub fail_with: Option<String>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn store_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

impl StoragePort for MockStorage {
    fn store(
        &self,
        rows: &[CycleRow],
        symbol: &str,
        strategy_id: &str,
    ) -> Result<(), AutotraderError> {
        if let Some(reason) = &self.fail_with {
            return Err(AutotraderError::Storage {
                reason: reason.clone(),
            });
        }
        self.stored.lock().unwrap().push((
            symbol.to_string(),
            strategy_id.to_string(),
            rows.to_vec(),
        ));
        Ok(())
    }
}

/// Execution sink recording requests; fails the calls whose 1-based index is listed.
#[derive(Clone, Default)]
pub struct MockExecution {
    pub requests: Arc<Mutex<Vec<OrderRequest>>>,
    pub fail_calls: Vec<usize>,
}

impl MockExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_calls: calls.to_vec(),
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ExecutionPort for MockExecution {
    fn place(&self, order: &OrderRequest) -> Result<String, AutotraderError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(order.clone());
        let n = requests.len();
        if self.fail_calls.contains(&n) {
            return Err(AutotraderError::Execution {
                reason: format!("venue rejected order {n}"),
            });
        }
        Ok(format!("mock-{n}"))
    }
}

/// Strategy emitting a fixed script, aligned to the end of the window.
pub struct ScriptedStrategy {
    pub script: Vec<Signal>,
}

impl ScriptedStrategy {
    pub fn new(script: Vec<Signal>) -> Arc<dyn Strategy> {
        Arc::new(Self { script })
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError> {
        let n = rows.len();
        let mut out = vec![Signal::Flat; n.saturating_sub(self.script.len())];
        out.extend(self.script.iter().skip(self.script.len().saturating_sub(n)));
        Ok(out)
    }
}

/// Strategy that violates the one-signal-per-row contract.
pub struct ShortOutputStrategy;

impl Strategy for ShortOutputStrategy {
    fn name(&self) -> &str {
        "short_output"
    }

    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError> {
        Ok(vec![Signal::Long; rows.len().saturating_sub(1)])
    }
}
