//! Rolling simple moving average over closes.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). With `min_periods < n` the leading
//! points average over however many closes exist (at least `min_periods`)
//! instead of being marked invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::MarketRow;

pub fn calculate_sma(rows: &[MarketRow], period: usize, min_periods: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(rows.len());
    let min_periods = min_periods.clamp(1, period.max(1));
    let mut sum = 0.0;

    for (i, row) in rows.iter().enumerate() {
        sum += row.close;
        if period > 0 && i >= period {
            sum -= rows[i - period].close;
        }

        let count = if period == 0 { 0 } else { (i + 1).min(period) };
        let valid = count >= min_periods && period > 0;

        values.push(IndicatorPoint {
            timestamp: row.timestamp,
            valid,
            value: IndicatorValue::Simple(if valid { sum / count as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
