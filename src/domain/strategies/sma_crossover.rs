//! Simple moving average crossover.

use crate::domain::error::AutotraderError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::MarketRow;
use crate::domain::signal::Signal;
use crate::domain::strategies::Strategy;

/// Long while the short SMA is above the long SMA, short while below.
///
/// Both averages use `min_periods = 1`, so every row gets a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaCrossover {
    short_window: usize,
    long_window: usize,
}

impl SmaCrossover {
    pub const NAME: &'static str = "sma_crossover";

    pub fn new(short_window: usize, long_window: usize) -> Result<Self, AutotraderError> {
        if short_window == 0 || long_window == 0 {
            return Err(AutotraderError::strategy(
                Self::NAME,
                "windows must be positive",
            ));
        }
        if short_window >= long_window {
            return Err(AutotraderError::strategy(
                Self::NAME,
                format!(
                    "short_window ({}) must be less than long_window ({})",
                    short_window, long_window
                ),
            ));
        }
        Ok(Self {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
        }
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Long when the short SMA is above the long SMA, short when below"
    }

    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError> {
        let short = calculate_sma(rows, self.short_window, 1);
        let long = calculate_sma(rows, self.long_window, 1);

        Ok((0..rows.len())
            .map(|i| match (short.simple_at(i), long.simple_at(i)) {
                (Some(s), Some(l)) if s > l => Signal::Long,
                (Some(s), Some(l)) if s < l => Signal::Short,
                _ => Signal::Flat,
            })
            .collect())
    }
}
