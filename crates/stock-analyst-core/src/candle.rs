use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalysisError;

/// A single OHLCV bar from the historical-candle feed.
///
/// The timestamp keeps the offset it was delivered with (exchange local time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub open_interest: i64,
}

#[derive(Debug, Deserialize)]
struct CandleEnvelope {
    status: Option<String>,
    data: Option<CandleData>,
}

#[derive(Debug, Deserialize)]
struct CandleData {
    candles: Option<Vec<Value>>,
}

/// Parse a historical-candle document:
/// `{"status": "success", "data": {"candles": [[ts, o, h, l, c, v, oi], ...]}}`.
///
/// Returns candles sorted by timestamp, oldest first.
pub fn parse_candle_payload(payload: &str) -> Result<Vec<CandleRecord>, AnalysisError> {
    let envelope: CandleEnvelope = serde_json::from_str(payload).map_err(|e| {
        AnalysisError::InvalidPayload(format!("failed to parse candle document: {e}"))
    })?;

    if let Some(status) = &envelope.status
        && status != "success"
    {
        return Err(AnalysisError::InvalidStatus(status.clone()));
    }

    let rows = envelope
        .data
        .and_then(|d| d.candles)
        .ok_or_else(|| AnalysisError::InvalidPayload("missing data.candles array".into()))?;

    normalize_candles(&rows)
}

/// Convert raw `[timestamp, open, high, low, close, volume, open_interest]` rows into
/// typed candles sorted ascending by timestamp.
///
/// Parsing is strict: the first row with an unparseable or non-finite field fails the
/// whole batch. Values are not range-checked, and duplicate timestamps are kept in
/// their delivered order.
pub fn normalize_candles(rows: &[Value]) -> Result<Vec<CandleRecord>, AnalysisError> {
    if rows.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let mut candles = rows
        .iter()
        .enumerate()
        .map(|(index, row)| parse_row(index, row))
        .collect::<Result<Vec<_>, _>>()?;

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_row(index: usize, row: &Value) -> Result<CandleRecord, AnalysisError> {
    let fields = row
        .as_array()
        .ok_or_else(|| AnalysisError::malformed(index, "row", format!("expected an array, got {row}")))?;

    // open interest is optional; some feeds send six columns
    if !(6..=7).contains(&fields.len()) {
        return Err(AnalysisError::malformed(
            index,
            "row",
            format!("expected 7 fields, got {}", fields.len()),
        ));
    }

    let open_interest = match fields.get(6) {
        None | Some(Value::Null) => 0,
        Some(value) => parse_open_interest(index, value)?,
    };

    Ok(CandleRecord {
        timestamp: parse_timestamp(index, &fields[0])?,
        open: parse_price(index, "open", &fields[1])?,
        high: parse_price(index, "high", &fields[2])?,
        low: parse_price(index, "low", &fields[3])?,
        close: parse_price(index, "close", &fields[4])?,
        volume: parse_volume(index, &fields[5])?,
        open_interest,
    })
}

fn parse_timestamp(index: usize, value: &Value) -> Result<DateTime<FixedOffset>, AnalysisError> {
    let text = value
        .as_str()
        .ok_or_else(|| AnalysisError::malformed(index, "timestamp", format!("expected a string, got {value}")))?;

    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|e| AnalysisError::malformed(index, "timestamp", format!("'{text}': {e}")))
}

fn parse_price(index: usize, field: &'static str, value: &Value) -> Result<f64, AnalysisError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AnalysisError::malformed(
            index,
            field,
            format!("expected a finite number, got {value}"),
        )),
    }
}

fn parse_volume(index: usize, value: &Value) -> Result<u64, AnalysisError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_u64))
        }
        _ => None,
    };

    parsed.ok_or_else(|| {
        AnalysisError::malformed(
            index,
            "volume",
            format!("expected a non-negative integer, got {value}"),
        )
    })
}

fn parse_open_interest(index: usize, value: &Value) -> Result<i64, AnalysisError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_i64))
        }
        _ => None,
    };

    parsed.ok_or_else(|| {
        AnalysisError::malformed(
            index,
            "open_interest",
            format!("expected an integer, got {value}"),
        )
    })
}

fn whole_u64(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < u64::MAX as f64).then_some(v as u64)
}

fn whole_i64(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}
