//! RSI overbought/oversold strategy.

use crate::domain::error::AutotraderError;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::ohlcv::MarketRow;
use crate::domain::signal::Signal;
use crate::domain::strategies::Strategy;

/// Long when RSI drops below `lower`, short when it rises above `upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiThreshold {
    period: usize,
    lower: f64,
    upper: f64,
}

impl RsiThreshold {
    pub const NAME: &'static str = "rsi";

    pub fn new(period: usize, lower: f64, upper: f64) -> Result<Self, AutotraderError> {
        if period == 0 {
            return Err(AutotraderError::strategy(Self::NAME, "period must be positive"));
        }
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) {
            return Err(AutotraderError::strategy(
                Self::NAME,
                "thresholds must be between 0 and 100",
            ));
        }
        if lower >= upper {
            return Err(AutotraderError::strategy(
                Self::NAME,
                format!("lower ({}) must be below upper ({})", lower, upper),
            ));
        }
        Ok(Self {
            period,
            lower,
            upper,
        })
    }
}

impl Default for RsiThreshold {
    fn default() -> Self {
        Self {
            period: 14,
            lower: 30.0,
            upper: 70.0,
        }
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Long when RSI is oversold, short when overbought"
    }

    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError> {
        let rsi = calculate_rsi(rows, self.period);

        Ok((0..rows.len())
            .map(|i| match rsi.simple_at(i) {
                Some(v) if v < self.lower => Signal::Long,
                Some(v) if v > self.upper => Signal::Short,
                _ => Signal::Flat,
            })
            .collect())
    }
}
