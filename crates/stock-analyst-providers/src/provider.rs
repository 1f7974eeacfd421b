use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ProviderError;

/// Candle granularity accepted by the historical endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    /// 1 to 300 minutes.
    Minutes(u32),
    /// 1 to 5 hours.
    Hours(u32),
    Days,
    Weeks,
    Months,
}

impl CandleInterval {
    /// Validate a unit name and count. Day, week and month candles only come in count 1.
    pub fn parse(unit: &str, count: u32) -> Result<Self, ProviderError> {
        let interval = match unit.trim().to_lowercase().as_str() {
            "minutes" => Self::Minutes(count),
            "hours" => Self::Hours(count),
            "days" => Self::Days,
            "weeks" => Self::Weeks,
            "months" => Self::Months,
            other => {
                return Err(ProviderError::InvalidRequest(format!(
                    "unsupported interval '{other}'. Supported: minutes, hours, days, weeks, months"
                )));
            }
        };

        let allowed = match interval {
            Self::Minutes(_) => 1..=300,
            Self::Hours(_) => 1..=5,
            Self::Days | Self::Weeks | Self::Months => 1..=1,
        };
        if !allowed.contains(&count) {
            return Err(ProviderError::InvalidRequest(format!(
                "count {count} out of range {}..={} for {}",
                allowed.start(),
                allowed.end(),
                interval.unit()
            )));
        }

        Ok(interval)
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Minutes(_) => "minutes",
            Self::Hours(_) => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Minutes(n) | Self::Hours(n) => *n,
            Self::Days | Self::Weeks | Self::Months => 1,
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count(), self.unit())
    }
}

/// A validated historical candle query. Both dates are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRequest {
    pub instrument_key: String,
    pub interval: CandleInterval,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl HistoricalRequest {
    pub fn new(
        instrument_key: impl Into<String>,
        interval: CandleInterval,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, ProviderError> {
        let instrument_key = instrument_key.into();
        if instrument_key.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "instrument key must not be empty".into(),
            ));
        }
        if from > to {
            return Err(ProviderError::InvalidRequest(format!(
                "from date {from} is after to date {to}"
            )));
        }

        Ok(Self {
            instrument_key,
            interval,
            from,
            to,
        })
    }
}

/// Source of raw market-data documents.
///
/// Responses are returned as the unparsed JSON body; validation belongs to the
/// analysis pipeline.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch the historical candle document for a request.
    async fn fetch_historical_candles(
        &self,
        request: &HistoricalRequest,
    ) -> Result<String, ProviderError>;

    /// Fetch the full market quote document for one instrument.
    async fn fetch_quotes(&self, instrument_key: &str) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn interval_counts() {
        assert_eq!(
            CandleInterval::parse("minutes", 30).unwrap(),
            CandleInterval::Minutes(30)
        );
        assert_eq!(
            CandleInterval::parse("Hours", 5).unwrap(),
            CandleInterval::Hours(5)
        );
        assert_eq!(CandleInterval::parse("days", 1).unwrap(), CandleInterval::Days);
        assert_eq!(CandleInterval::parse("months", 1).unwrap().count(), 1);

        assert!(CandleInterval::parse("minutes", 0).is_err());
        assert!(CandleInterval::parse("minutes", 301).is_err());
        assert!(CandleInterval::parse("hours", 6).is_err());
        assert!(CandleInterval::parse("days", 2).is_err());
        assert!(CandleInterval::parse("weeks", 0).is_err());
    }

    #[test]
    fn unknown_interval_unit() {
        let err = CandleInterval::parse("seconds", 1).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
        assert!(err.to_string().contains("seconds"));
    }

    #[test]
    fn interval_display() {
        assert_eq!(CandleInterval::Minutes(15).to_string(), "15 minutes");
        assert_eq!(CandleInterval::Days.to_string(), "1 days");
    }

    #[test]
    fn request_date_order() {
        let ok = HistoricalRequest::new(
            "NSE_EQ|INE848E01016",
            CandleInterval::Days,
            date(2025, 6, 1),
            date(2025, 6, 1),
        );
        assert!(ok.is_ok());

        let err = HistoricalRequest::new(
            "NSE_EQ|INE848E01016",
            CandleInterval::Days,
            date(2025, 6, 2),
            date(2025, 6, 1),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn request_needs_a_key() {
        let err = HistoricalRequest::new(
            " ",
            CandleInterval::Days,
            date(2025, 6, 1),
            date(2025, 6, 2),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
