use serde::{Deserialize, Serialize};

use crate::indicators::EnrichedCandle;
use crate::metrics::{SummaryMetrics, recent_volume_elevated};

/// Bars compared against the whole window for the activity rule.
pub const RECENT_VOLUME_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightKind {
    BullishTrend,
    BearishTrend,
    NeutralTrend,
    HighRisk,
    LowRisk,
    ElevatedActivity,
    Overbought,
    Oversold,
    NeutralRsi,
}

impl InsightKind {
    pub fn polarity(self) -> Polarity {
        match self {
            InsightKind::BullishTrend
            | InsightKind::LowRisk
            | InsightKind::ElevatedActivity
            | InsightKind::Oversold => Polarity::Positive,
            InsightKind::BearishTrend | InsightKind::HighRisk | InsightKind::Overbought => {
                Polarity::Negative
            }
            InsightKind::NeutralTrend | InsightKind::NeutralRsi => Polarity::Neutral,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            InsightKind::BullishTrend => "Strong bullish trend with high win rate",
            InsightKind::BearishTrend => "Bearish trend with low win rate",
            InsightKind::NeutralTrend => "Neutral trend with balanced win/loss ratio",
            InsightKind::HighRisk => "High volatility indicates increased risk",
            InsightKind::LowRisk => "Low volatility suggests stable price action",
            InsightKind::ElevatedActivity => "Recent volume above average - increased activity",
            InsightKind::Overbought => "RSI indicates overbought conditions",
            InsightKind::Oversold => "RSI indicates oversold conditions",
            InsightKind::NeutralRsi => "RSI in neutral territory",
        }
    }
}

/// One qualitative observation about the analyzed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub polarity: Polarity,
    pub message: String,
}

impl From<InsightKind> for Insight {
    fn from(kind: InsightKind) -> Self {
        Self {
            kind,
            polarity: kind.polarity(),
            message: kind.message().to_string(),
        }
    }
}

/// Apply the insight rules in order: trend, risk, activity, RSI.
///
/// `current_rsi` is the RSI of the latest bar; when it is missing no RSI insight is
/// produced.
pub fn generate_insights(
    metrics: &SummaryMetrics,
    current_rsi: Option<f64>,
    volume_elevated: bool,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    insights.push(if metrics.win_rate > 60.0 {
        InsightKind::BullishTrend
    } else if metrics.win_rate < 40.0 {
        InsightKind::BearishTrend
    } else {
        InsightKind::NeutralTrend
    });

    if metrics.volatility > 4.0 {
        insights.push(InsightKind::HighRisk);
    } else if metrics.volatility < 2.0 {
        insights.push(InsightKind::LowRisk);
    }

    if volume_elevated {
        insights.push(InsightKind::ElevatedActivity);
    }

    if let Some(rsi) = current_rsi {
        insights.push(if rsi > 70.0 {
            InsightKind::Overbought
        } else if rsi < 30.0 {
            InsightKind::Oversold
        } else {
            InsightKind::NeutralRsi
        });
    }

    insights.into_iter().map(Insight::from).collect()
}

/// Insights for a window, taking RSI from its last bar and the activity flag from its
/// volumes.
pub fn insights_for_window(metrics: &SummaryMetrics, records: &[EnrichedCandle]) -> Vec<Insight> {
    let current_rsi = records.last().and_then(|r| r.rsi);
    let volume_elevated = recent_volume_elevated(records, RECENT_VOLUME_BARS);
    generate_insights(metrics, current_rsi, volume_elevated)
}
