use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::EnrichedCandle;

/// Inclusive calendar-date range. An open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Records whose timestamp, read in its own offset, falls on a date in the range.
    ///
    /// Indicator values are carried over as computed on the full history, so the first
    /// selected bar keeps its return and moving averages.
    pub fn select(&self, records: &[EnrichedCandle]) -> Vec<EnrichedCandle> {
        records
            .iter()
            .filter(|r| self.contains(r.candle.timestamp.date_naive()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::CandleRecord;
    use crate::indicators::enrich;
    use chrono::{DateTime, Duration};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_records(days: i64) -> Vec<EnrichedCandle> {
        let start = DateTime::parse_from_rfc3339("2025-06-01T00:00:00+05:30").unwrap();
        let candles: Vec<CandleRecord> = (0..days)
            .map(|i| CandleRecord {
                timestamp: start + Duration::days(i),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0 + i as f64,
                volume: 100,
                open_interest: 0,
            })
            .collect();
        enrich(&candles)
    }

    #[test]
    fn unbounded_range_keeps_everything() {
        let records = daily_records(5);
        let range = DateRange::all();
        assert!(range.is_unbounded());
        assert_eq!(range.select(&records), records);
    }

    #[test]
    fn inclusive_bounds() {
        let records = daily_records(10);
        let range = DateRange::new(Some(date(2025, 6, 3)), Some(date(2025, 6, 5)));

        let selected = range.select(&records);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].candle.timestamp.date_naive(), date(2025, 6, 3));
        assert_eq!(selected[2].candle.timestamp.date_naive(), date(2025, 6, 5));
    }

    #[test]
    fn open_ended_ranges() {
        let records = daily_records(10);
        assert_eq!(DateRange::new(Some(date(2025, 6, 8)), None).select(&records).len(), 3);
        assert_eq!(DateRange::new(None, Some(date(2025, 6, 2))).select(&records).len(), 2);
    }

    #[test]
    fn dates_use_the_record_offset() {
        // midnight IST is still the previous day in UTC
        let records = daily_records(1);
        let range = DateRange::new(Some(date(2025, 6, 1)), Some(date(2025, 6, 1)));
        assert_eq!(range.select(&records).len(), 1);
    }

    #[test]
    fn selection_keeps_history_indicators() {
        let records = daily_records(10);
        let range = DateRange::new(Some(date(2025, 6, 6)), None);
        let selected = range.select(&records);

        assert_eq!(selected.len(), 5);
        assert!(selected[0].daily_return.is_some());
        assert!(selected[0].sma_5.is_some());
    }

    #[test]
    fn empty_selection() {
        let records = daily_records(3);
        let range = DateRange::new(Some(date(2026, 1, 1)), None);
        assert!(range.select(&records).is_empty());
    }
}
