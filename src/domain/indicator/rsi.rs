//! RSI (Relative Strength Index) over closes.
//!
//! Average gain/loss are simple rolling means of the last n price changes:
//! - gain[i] = max(C[i] - C[i-1], 0), loss[i] = max(C[i-1] - C[i], 0)
//! - RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! If avg_loss == 0 and avg_gain > 0: RSI = 100. If both are zero the price
//! did not move and the point is invalid.
//!
//! Warmup: first n rows are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::MarketRow;

pub fn calculate_rsi(rows: &[MarketRow], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let rsi = if period == 0 || i < period {
            None
        } else {
            let (gain_sum, loss_sum) = rows[i - period..=i]
                .windows(2)
                .map(|w| w[1].close - w[0].close)
                .fold((0.0, 0.0), |(g, l), change| {
                    if change > 0.0 {
                        (g + change, l)
                    } else {
                        (g, l - change)
                    }
                });
            let avg_gain = gain_sum / period as f64;
            let avg_loss = loss_sum / period as f64;

            if avg_loss == 0.0 && avg_gain == 0.0 {
                None
            } else if avg_loss == 0.0 {
                Some(100.0)
            } else {
                Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
            }
        };

        values.push(IndicatorPoint {
            timestamp: row.timestamp,
            valid: rsi.is_some(),
            value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
