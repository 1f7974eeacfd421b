use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candle::parse_candle_payload;
use crate::error::AnalysisError;
use crate::indicators::{EnrichedCandle, enrich};
use crate::insights::{Insight, insights_for_window};
use crate::metrics::{RiskLevel, SummaryMetrics, WindowStats, summarize};
use crate::window::DateRange;

/// Everything derived from one candle document for one date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub range: DateRange,
    pub metrics: SummaryMetrics,
    pub risk_level: RiskLevel,
    pub stats: WindowStats,
    pub insights: Vec<Insight>,
    pub records: Vec<EnrichedCandle>,
}

#[derive(Serialize)]
struct LlmContext<'a> {
    instrument_key: &'a str,
    #[serde(flatten)]
    report: &'a AnalysisReport,
}

impl AnalysisReport {
    /// Summarize the part of an enriched history that falls in `range`.
    ///
    /// Fails with `EmptyInput` when the range selects nothing.
    pub fn from_history(history: &[EnrichedCandle], range: DateRange) -> Result<Self, AnalysisError> {
        let records = range.select(history);
        let metrics = summarize(&records)?;
        let insights = insights_for_window(&metrics, &records);

        Ok(Self {
            range,
            risk_level: metrics.risk_level(),
            stats: WindowStats::compute(&records),
            metrics,
            insights,
            records,
        })
    }

    pub fn latest(&self) -> Option<&EnrichedCandle> {
        self.records.last()
    }

    /// Pretty-printed JSON payload handed to the language model as analysis context.
    pub fn llm_context(&self, instrument_key: &str) -> Result<String, AnalysisError> {
        let context = LlmContext {
            instrument_key,
            report: self,
        };
        Ok(serde_json::to_string_pretty(&context)?)
    }
}

/// Run the candle pipeline: normalize, enrich over the full history, then summarize the
/// window.
pub fn analyze_candles(payload: &str, range: DateRange) -> Result<AnalysisReport, AnalysisError> {
    let candles = parse_candle_payload(payload)?;
    debug!("normalized {} candle(s)", candles.len());

    let history = enrich(&candles);
    let report = AnalysisReport::from_history(&history, range)?;
    debug!(
        "window of {} bar(s): trend {}, risk {}",
        report.records.len(),
        report.metrics.recent_trend,
        report.risk_level
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::InsightKind;
    use crate::metrics::Trend;
    use chrono::{Duration, NaiveDate};

    /// Newest-first daily candles, the order the historical feed delivers them in.
    fn payload(days: usize) -> String {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let mut rows = Vec::new();
        for i in (0..days).rev() {
            let date = start + Duration::days(i as i64);
            let open = 30.0 + (i % 4) as f64 * 0.5;
            let close = open + if i % 3 == 0 { -0.4 } else { 0.6 };
            rows.push(format!(
                r#"["{date}T00:00:00+05:30", {open}, {high}, {low}, {close}, {volume}, 0]"#,
                high = open.max(close) + 0.3,
                low = open.min(close) - 0.3,
                volume = 40_000 + i * 1_000,
            ));
        }
        format!(
            r#"{{"status": "success", "data": {{"candles": [{}]}}}}"#,
            rows.join(",")
        )
    }

    #[test]
    fn full_history_report() {
        let report = analyze_candles(&payload(30), DateRange::all()).unwrap();

        assert_eq!(report.records.len(), 30);
        assert_eq!(report.metrics.total_days, 30);
        assert_eq!(
            report.metrics.green_days + report.metrics.red_days,
            report.metrics.total_days
        );
        for pair in report.records.windows(2) {
            assert!(pair[0].candle.timestamp <= pair[1].candle.timestamp);
        }
        assert_eq!(report.risk_level, report.metrics.risk_level());
        assert!(report.latest().unwrap().rsi.is_some());
        assert_ne!(report.metrics.recent_trend, Trend::Undetermined);

        // trend rule always fires, RSI is defined on the last bar
        assert!(report.insights.len() >= 2);
        assert!(matches!(
            report.insights[0].kind,
            InsightKind::BullishTrend | InsightKind::BearishTrend | InsightKind::NeutralTrend
        ));
    }

    #[test]
    fn window_keeps_indicators_from_full_history() {
        let from = NaiveDate::from_ymd_opt(2025, 5, 26).unwrap();
        let report = analyze_candles(&payload(30), DateRange::new(Some(from), None)).unwrap();

        assert_eq!(report.records.len(), 5);
        assert!(report.records[0].sma_20.is_some());
        assert!(report.records[0].daily_return.is_some());
        assert_eq!(report.stats.daily_return.unwrap().count, 5);
    }

    #[test]
    fn empty_window_is_an_error() {
        let from = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(matches!(
            analyze_candles(&payload(5), DateRange::new(Some(from), None)),
            Err(AnalysisError::EmptyInput)
        ));
    }

    #[test]
    fn short_history_has_no_rsi_insight() {
        let report = analyze_candles(&payload(3), DateRange::all()).unwrap();
        assert!(report.latest().unwrap().rsi.is_none());
        assert!(report.insights.iter().all(|i| !matches!(
            i.kind,
            InsightKind::Overbought | InsightKind::Oversold | InsightKind::NeutralRsi
        )));
        assert_eq!(report.metrics.recent_trend, Trend::Undetermined);
    }

    #[test]
    fn malformed_candle_fails_the_pipeline() {
        let payload = r#"{"status": "success", "data": {"candles": [
            ["2025-06-06T00:00:00+05:30", 32.85, 33.31, 32.69, 32.9, 52446, 0],
            ["2025-06-05T00:00:00+05:30", 33.15, "?", 32.61, 32.69, 139035, 0]
        ]}}"#;
        assert!(matches!(
            analyze_candles(payload, DateRange::all()),
            Err(AnalysisError::MalformedRecord { index: 1, field: "high", .. })
        ));
    }

    #[test]
    fn near_max_volumes_summarize() {
        let payload = r#"{"status": "success", "data": {"candles": [
            ["2025-06-06T00:00:00+05:30", 32.85, 33.31, 32.69, 32.9, 18446744073709551000, 0],
            ["2025-06-05T00:00:00+05:30", 33.15, 33.3, 32.61, 32.69, 18446744073709551000, 0]
        ]}}"#;
        let report = analyze_candles(payload, DateRange::all()).unwrap();
        assert_eq!(report.metrics.total_volume, u64::MAX);
        assert!(report.metrics.avg_volume > 1.8e19);
    }

    #[test]
    fn llm_context_is_json_with_nulls_for_gaps() {
        let report = analyze_candles(&payload(3), DateRange::all()).unwrap();
        let context = report.llm_context("NSE_EQ|INE848E01016").unwrap();

        let value: serde_json::Value = serde_json::from_str(&context).unwrap();
        assert_eq!(value["instrument_key"], "NSE_EQ|INE848E01016");
        assert_eq!(value["metrics"]["total_days"], 3);
        assert!(value["records"][0]["sma_5"].is_null());
        assert!(value["records"][0]["daily_return"].is_null());
        assert!(value["records"][1]["daily_return"].is_number());
        assert_eq!(value["metrics"]["recent_trend"], "Undetermined");
    }
}
