use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::indicators::EnrichedCandle;
use crate::stats::{SeriesStats, mean, sample_std_dev};

/// Short-term direction: last close against the 5-bar moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    /// Not enough history for the 5-bar average.
    Undetermined,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Bullish => "Bullish",
            Trend::Bearish => "Bearish",
            Trend::Undetermined => "Undetermined",
        };
        f.write_str(label)
    }
}

/// Risk bucket derived from return volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Above 3% is high, above 2% moderate, otherwise low.
    pub fn from_volatility(volatility: f64) -> Self {
        if volatility > 3.0 {
            RiskLevel::High
        } else if volatility > 2.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

/// Scalar summary of a window of enriched candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_pct: f64,
    pub max_price: f64,
    pub min_price: f64,
    pub avg_volume: f64,
    pub total_volume: u64,
    /// Sample standard deviation of daily returns, in percent.
    pub volatility: f64,
    pub green_days: usize,
    pub red_days: usize,
    pub win_rate: f64,
    pub recent_trend: Trend,
    pub total_days: usize,
}

impl SummaryMetrics {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_volatility(self.volatility)
    }

    pub fn loss_rate(&self) -> f64 {
        100.0 - self.win_rate
    }
}

/// Reduce a window of enriched candles (oldest first) to summary metrics.
pub fn summarize(records: &[EnrichedCandle]) -> Result<SummaryMetrics, AnalysisError> {
    let last = records.last().ok_or(AnalysisError::EmptyInput)?;

    let current_price = last.candle.close;
    let previous_price = match records.len() {
        0 | 1 => current_price,
        n => records[n - 2].candle.close,
    };
    let price_change = current_price - previous_price;
    let price_change_pct = if previous_price != 0.0 {
        price_change / previous_price * 100.0
    } else {
        0.0
    };

    let max_price = records
        .iter()
        .map(|r| r.candle.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_price = records
        .iter()
        .map(|r| r.candle.low)
        .fold(f64::INFINITY, f64::min);

    // summed wide; the reported total saturates at u64::MAX
    let volume_sum: u128 = records.iter().map(|r| u128::from(r.candle.volume)).sum();
    let total_volume = u64::try_from(volume_sum).unwrap_or(u64::MAX);
    let avg_volume = volume_sum as f64 / records.len() as f64;

    let returns: Vec<f64> = records.iter().filter_map(|r| r.daily_return).collect();
    let volatility = sample_std_dev(&returns).unwrap_or(0.0);

    let total_days = records.len();
    let green_days = records.iter().filter(|r| r.is_green).count();
    let red_days = total_days - green_days;
    let win_rate = green_days as f64 / total_days as f64 * 100.0;

    let recent_trend = match last.sma_5 {
        Some(sma) if current_price > sma => Trend::Bullish,
        Some(_) => Trend::Bearish,
        None => Trend::Undetermined,
    };

    Ok(SummaryMetrics {
        current_price,
        price_change,
        price_change_pct,
        max_price,
        min_price,
        avg_volume,
        total_volume,
        volatility,
        green_days,
        red_days,
        win_rate,
        recent_trend,
        total_days,
    })
}

/// Distribution of returns, bar volatility and volume over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub daily_return: Option<SeriesStats>,
    pub volatility: Option<SeriesStats>,
    pub volume: Option<SeriesStats>,
}

impl WindowStats {
    pub fn compute(records: &[EnrichedCandle]) -> Self {
        Self {
            daily_return: SeriesStats::describe(records.iter().filter_map(|r| r.daily_return)),
            volatility: SeriesStats::describe(records.iter().filter_map(|r| r.volatility)),
            volume: SeriesStats::describe(records.iter().map(|r| r.candle.volume as f64)),
        }
    }
}

/// Whether the mean volume of the last `recent` bars exceeds the window mean.
/// Uses every bar when the window is shorter than `recent`.
pub fn recent_volume_elevated(records: &[EnrichedCandle], recent: usize) -> bool {
    let volumes: Vec<f64> = records.iter().map(|r| r.candle.volume as f64).collect();
    let tail = &volumes[volumes.len().saturating_sub(recent)..];

    match (mean(tail), mean(&volumes)) {
        (Some(recent_mean), Some(overall_mean)) => recent_mean > overall_mean,
        _ => false,
    }
}
