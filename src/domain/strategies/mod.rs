//! Strategy capability and the registry that owns named strategies.
//!
//! A strategy is a pure transform of a market-row window into one signal per
//! row. Strategies are registered explicitly by the orchestration layer;
//! nothing is registered implicitly.

pub mod bollinger_breakout;
pub mod rsi_threshold;
pub mod sma_crossover;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::MarketRow;
use crate::domain::signal::Signal;

pub use bollinger_breakout::BollingerBreakout;
pub use rsi_threshold::RsiThreshold;
pub use sma_crossover::SmaCrossover;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        "No description provided."
    }

    /// Produce exactly one signal per input row.
    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError>;
}

/// Run a strategy and enforce the one-signal-per-row contract.
pub fn score_checked(
    strategy: &dyn Strategy,
    rows: &[MarketRow],
) -> Result<Vec<Signal>, AutotraderError> {
    let signals = strategy.score(rows)?;
    if signals.len() != rows.len() {
        return Err(AutotraderError::strategy(
            strategy.name(),
            format!(
                "produced {} signals for {} rows",
                signals.len(),
                rows.len()
            ),
        ));
    }
    Ok(signals)
}

/// Named strategies available to the orchestrator.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy with default parameters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SmaCrossover::default()));
        registry.register(Arc::new(RsiThreshold::default()));
        registry.register(Arc::new(BollingerBreakout::default()));
        registry
    }

    /// Insert under the strategy's own name, returning any strategy it replaced.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Option<Arc<dyn Strategy>> {
        self.strategies
            .insert(strategy.name().to_string(), strategy)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Strategy>, AutotraderError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| AutotraderError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Strategy>> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
