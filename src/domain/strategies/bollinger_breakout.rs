//! Bollinger band mean-reversion strategy.

use crate::domain::error::AutotraderError;
use crate::domain::indicator::IndicatorValue;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::ohlcv::MarketRow;
use crate::domain::signal::Signal;
use crate::domain::strategies::Strategy;

/// Long when the close falls below the lower band, short above the upper band.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBreakout {
    window: usize,
    num_std_dev: f64,
}

impl BollingerBreakout {
    pub const NAME: &'static str = "bollinger";

    pub fn new(window: usize, num_std_dev: f64) -> Result<Self, AutotraderError> {
        if window < 2 {
            return Err(AutotraderError::strategy(
                Self::NAME,
                "window must be at least 2",
            ));
        }
        if !num_std_dev.is_finite() || num_std_dev <= 0.0 {
            return Err(AutotraderError::strategy(
                Self::NAME,
                "num_std_dev must be positive",
            ));
        }
        Ok(Self {
            window,
            num_std_dev,
        })
    }
}

impl Default for BollingerBreakout {
    fn default() -> Self {
        Self {
            window: 20,
            num_std_dev: 2.0,
        }
    }
}

impl Strategy for BollingerBreakout {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Long below the lower Bollinger band, short above the upper band"
    }

    fn score(&self, rows: &[MarketRow]) -> Result<Vec<Signal>, AutotraderError> {
        let bands = calculate_bollinger(rows, self.window, self.num_std_dev);

        Ok(rows
            .iter()
            .zip(&bands.values)
            .map(|(row, point)| match point.value {
                IndicatorValue::Bollinger { upper, lower, .. } if point.valid => {
                    if row.close < lower {
                        Signal::Long
                    } else if row.close > upper {
                        Signal::Short
                    } else {
                        Signal::Flat
                    }
                }
                _ => Signal::Flat,
            })
            .collect())
    }
}
