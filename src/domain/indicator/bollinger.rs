//! Bollinger Bands over closes.
//!
//! - Middle: simple moving average over n closes
//! - Upper: middle + (multiplier × stddev)
//! - Lower: middle - (multiplier × stddev)
//!
//! Stddev is the sample standard deviation (divides by n-1), so n must be at
//! least 2 for any point to be valid.
//! Warmup: first (n-1) rows are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::MarketRow;

pub fn calculate_bollinger(
    rows: &[MarketRow],
    period: usize,
    num_std_dev: f64,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(rows.len());
    let warmup = period.saturating_sub(1);

    for (i, row) in rows.iter().enumerate() {
        let valid = period >= 2 && i >= warmup;

        let (upper, middle, lower) = if valid {
            let window = &rows[i + 1 - period..=i];

            let middle: f64 = window.iter().map(|r| r.close).sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|r| {
                    let diff = r.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;

            let stddev = variance.sqrt();
            (
                middle + num_std_dev * stddev,
                middle,
                middle - num_std_dev * stddev,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            timestamp: row.timestamp,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            num_std_dev,
        },
        values,
    }
}
