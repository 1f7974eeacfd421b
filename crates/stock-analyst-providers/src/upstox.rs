use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::provider::{HistoricalRequest, MarketDataProvider};

const UPSTOX_BASE_URL: &str = "https://api.upstox.com";

/// Upstox market data provider.
/// Authenticates with an OAuth access token sent as a bearer header.
pub struct UpstoxProvider {
    client: Client,
    access_token: String,
    base_url: Url,
}

impl UpstoxProvider {
    /// Create from the `UPSTOX_ACCESS_TOKEN` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let access_token = std::env::var("UPSTOX_ACCESS_TOKEN")
            .map_err(|_| ProviderError::Config("UPSTOX_ACCESS_TOKEN not set".into()))?;
        Self::new(access_token, None)
    }

    /// Create with an explicit token and optional base URL override.
    pub fn new(access_token: String, base_url: Option<String>) -> Result<Self, ProviderError> {
        if access_token.trim().is_empty() {
            return Err(ProviderError::Config("access token is empty".into()));
        }
        let base = base_url.unwrap_or_else(|| UPSTOX_BASE_URL.to_string());
        let base_url = Url::parse(&base)
            .map_err(|e| ProviderError::Config(format!("invalid base URL '{base}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Config(format!(
                "base URL '{base}' cannot carry a path"
            )));
        }

        Ok(Self {
            client: Client::new(),
            access_token,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Config(format!("invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `/v3/historical-candle/{key}/{unit}/{count}/{to}/{from}`
    pub fn historical_candles_url(&self, request: &HistoricalRequest) -> Result<Url, ProviderError> {
        let count = request.interval.count().to_string();
        let to = request.to.format("%Y-%m-%d").to_string();
        let from = request.from.format("%Y-%m-%d").to_string();
        self.endpoint(&[
            "v3",
            "historical-candle",
            &request.instrument_key,
            request.interval.unit(),
            &count,
            &to,
            &from,
        ])
    }

    /// `/v2/market-quote/quotes?instrument_key={key}`
    pub fn quotes_url(&self, instrument_key: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint(&["v2", "market-quote", "quotes"])?;
        url.query_pairs_mut()
            .append_pair("instrument_key", instrument_key);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<String, ProviderError> {
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: api_error_message(&body),
            });
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, Deserialize)]
struct UpstoxErrorResponse {
    #[serde(default)]
    errors: Vec<UpstoxError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstoxError {
    error_code: Option<String>,
    message: Option<String>,
}

/// Flatten an Upstox error body into one line, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<UpstoxErrorResponse>(body) else {
        return body.to_string();
    };

    let messages: Vec<String> = parsed
        .errors
        .iter()
        .filter_map(|e| match (&e.error_code, &e.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        })
        .collect();

    if messages.is_empty() {
        body.to_string()
    } else {
        messages.join("; ")
    }
}

#[async_trait]
impl MarketDataProvider for UpstoxProvider {
    fn name(&self) -> &str {
        "upstox"
    }

    async fn fetch_historical_candles(
        &self,
        request: &HistoricalRequest,
    ) -> Result<String, ProviderError> {
        let url = self.historical_candles_url(request)?;
        let body = self.get(url).await?;
        info!(
            "{}: fetched {} candles {}..{} ({} bytes)",
            request.instrument_key,
            request.interval,
            request.from,
            request.to,
            body.len()
        );
        Ok(body)
    }

    async fn fetch_quotes(&self, instrument_key: &str) -> Result<String, ProviderError> {
        let url = self.quotes_url(instrument_key)?;
        let body = self.get(url).await?;
        info!("{instrument_key}: fetched quote ({} bytes)", body.len());
        Ok(body)
    }
}
