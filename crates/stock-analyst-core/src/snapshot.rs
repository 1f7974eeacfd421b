use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalysisError;
use crate::metrics::RiskLevel;

/// Point-in-time quote for one instrument.
///
/// Built from a best-effort feed: numeric fields the feed omits are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub instrument_key: String,
    pub symbol: String,
    pub last_price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub average_price: f64,
    pub net_change: f64,
    /// `net_change / last_price * 100`, zero when the last price is zero.
    pub net_change_percent: f64,
    pub upper_circuit: f64,
    pub lower_circuit: f64,
    /// Distance from the last price up to the upper circuit, in percent of last price.
    pub upper_circuit_buffer: Option<f64>,
    /// Distance from the last price down to the lower circuit, in percent of last price.
    pub lower_circuit_buffer: Option<f64>,
    pub total_buy_quantity: u64,
    pub total_sell_quantity: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceAction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeActivity {
    High,
    Moderate,
    Low,
}

impl SnapshotRecord {
    /// Day range relative to the average traded price, in percent.
    pub fn intraday_volatility(&self) -> Option<f64> {
        (self.average_price != 0.0)
            .then(|| (self.high - self.low) / self.average_price * 100.0)
    }

    /// Where the last price sits in the day's range, 0 at the low and 100 at the high.
    /// A degenerate range reads as the midpoint.
    pub fn range_position(&self) -> f64 {
        let range = self.high - self.low;
        if range > 0.0 {
            (self.last_price - self.low) / range * 100.0
        } else {
            50.0
        }
    }

    pub fn price_action(&self) -> PriceAction {
        if self.net_change > 0.0 {
            PriceAction::Bullish
        } else if self.net_change < 0.0 {
            PriceAction::Bearish
        } else {
            PriceAction::Neutral
        }
    }

    pub fn volume_activity(&self) -> VolumeActivity {
        if self.volume > 50_000 {
            VolumeActivity::High
        } else if self.volume > 20_000 {
            VolumeActivity::Moderate
        } else {
            VolumeActivity::Low
        }
    }

    /// Proximity to the circuit limits: low when both buffers exceed 10%, high when
    /// either is under 5%.
    pub fn circuit_risk(&self) -> Option<RiskLevel> {
        let (upper, lower) = self.upper_circuit_buffer.zip(self.lower_circuit_buffer)?;
        Some(if upper > 10.0 && lower > 10.0 {
            RiskLevel::Low
        } else if upper < 5.0 || lower < 5.0 {
            RiskLevel::High
        } else {
            RiskLevel::Moderate
        })
    }
}

/// Parse a market-quote document:
/// `{"status": "success", "data": {"<instrument_key>": {...}}}`.
///
/// Records keep the order of the `data` map.
pub fn parse_snapshot_payload(payload: &str) -> Result<Vec<SnapshotRecord>, AnalysisError> {
    let document: Value = serde_json::from_str(payload).map_err(|e| {
        AnalysisError::InvalidPayload(format!("failed to parse quote document: {e}"))
    })?;

    let status = document.get("status").and_then(Value::as_str);
    if status != Some("success") {
        return Err(AnalysisError::InvalidStatus(
            status.unwrap_or("missing").to_string(),
        ));
    }

    let data = document
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| AnalysisError::InvalidPayload("data is not an object".into()))?;

    Ok(data
        .iter()
        .map(|(instrument_key, quote)| parse_quote(instrument_key, quote))
        .collect())
}

fn parse_quote(instrument_key: &str, quote: &Value) -> SnapshotRecord {
    let ohlc = quote.get("ohlc");
    let ohlc_field = |name: &str| number_or_zero(ohlc.and_then(|o| o.get(name)));
    let field = |name: &str| number_or_zero(quote.get(name));

    let last_price = field("last_price");
    let net_change = field("net_change");
    let upper_circuit = field("upper_circuit_limit");
    let lower_circuit = field("lower_circuit_limit");

    let net_change_percent = if last_price != 0.0 {
        net_change / last_price * 100.0
    } else {
        0.0
    };
    let buffer = |distance: f64| (last_price != 0.0).then(|| distance / last_price * 100.0);

    SnapshotRecord {
        instrument_key: instrument_key.to_string(),
        symbol: quote
            .get("symbol")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string(),
        last_price,
        open: ohlc_field("open"),
        high: ohlc_field("high"),
        low: ohlc_field("low"),
        close: ohlc_field("close"),
        volume: count_or_zero(quote.get("volume")),
        average_price: field("average_price"),
        net_change,
        net_change_percent,
        upper_circuit,
        lower_circuit,
        upper_circuit_buffer: buffer(upper_circuit - last_price),
        lower_circuit_buffer: buffer(last_price - lower_circuit),
        total_buy_quantity: count_or_zero(quote.get("total_buy_quantity")),
        total_sell_quantity: count_or_zero(quote.get("total_sell_quantity")),
        timestamp: quote
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn count_or_zero(value: Option<&Value>) -> u64 {
    if let Some(Value::Number(n)) = value
        && let Some(count) = n.as_u64()
    {
        return count;
    }
    let v = number_or_zero(value);
    if v > 0.0 { v.trunc() as u64 } else { 0 }
}
