//! Per-bar technical indicators.
//!
//! Every derived value that needs trailing history is an `Option<f64>`: it stays `None`
//! until enough bars exist, and division by zero also yields `None` rather than a
//! sentinel number.

use serde::{Deserialize, Serialize};

use crate::candle::CandleRecord;
use crate::stats::{mean, sample_std_dev};

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEVS: f64 = 2.0;

/// A candle plus the indicators derived from it and its trailing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandle {
    #[serde(flatten)]
    pub candle: CandleRecord,
    /// Percent change of close vs the previous close.
    pub daily_return: Option<f64>,
    /// `(high - low) / open * 100`.
    pub volatility: Option<f64>,
    pub body_size: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
    pub price_range: f64,
    pub mid_price: f64,
    pub is_green: bool,
    pub sma_5: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

/// Compute indicators for candles sorted oldest first.
/// The output is index-aligned with the input.
pub fn enrich(candles: &[CandleRecord]) -> Vec<EnrichedCandle> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let daily_return = i
                .checked_sub(1)
                .and_then(|prev| percent_change(closes[prev], closes[i]));

            let volatility = (candle.open != 0.0)
                .then(|| (candle.high - candle.low) / candle.open * 100.0);

            let bb_middle = sma(&closes, i, BOLLINGER_PERIOD);
            let band = trailing(&closes, i, BOLLINGER_PERIOD)
                .and_then(sample_std_dev)
                .map(|sd| sd * BOLLINGER_STD_DEVS);

            EnrichedCandle {
                daily_return,
                volatility,
                body_size: (candle.close - candle.open).abs(),
                upper_shadow: candle.high - candle.open.max(candle.close),
                lower_shadow: candle.open.min(candle.close) - candle.low,
                price_range: candle.high - candle.low,
                mid_price: (candle.high + candle.low) / 2.0,
                is_green: candle.close > candle.open,
                sma_5: sma(&closes, i, 5),
                sma_20: sma(&closes, i, 20),
                sma_50: sma(&closes, i, 50),
                rsi: rsi(&closes, i, RSI_PERIOD),
                bb_middle,
                bb_upper: bb_middle.zip(band).map(|(m, w)| m + w),
                bb_lower: bb_middle.zip(band).map(|(m, w)| m - w),
                candle: candle.clone(),
            }
        })
        .collect()
}

/// Simple moving average of the `period` values ending at index `i`.
pub fn sma(values: &[f64], i: usize, period: usize) -> Option<f64> {
    trailing(values, i, period).and_then(mean)
}

/// Relative strength index at index `i` over the last `period` close-to-close deltas.
///
/// Gains and losses are averaged with a plain rolling mean, not Wilder smoothing.
/// When there were no losses the index is 100; with neither gains nor losses it is
/// undefined.
pub fn rsi(closes: &[f64], i: usize, period: usize) -> Option<f64> {
    if period == 0 || i < period || i >= closes.len() {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for j in (i + 1 - period)..=i {
        let delta = closes[j] - closes[j - 1];
        if delta > 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

fn trailing(values: &[f64], i: usize, period: usize) -> Option<&[f64]> {
    if period == 0 || i >= values.len() || i + 1 < period {
        return None;
    }
    Some(&values[i + 1 - period..=i])
}

fn percent_change(previous: f64, current: f64) -> Option<f64> {
    (previous != 0.0).then(|| (current - previous) / previous * 100.0)
}
