//! Exchange candle data (Binance-compatible `/api/v3/klines`)
//!
//! SECURITY NOTE:
//! - The API key is sent only as the `X-MBX-APIKEY` header
//! - It is held as a `SecretString` and never logged

use crate::{Error, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

const INTERVALS: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

pub const DEFAULT_INTERVAL: &str = "1d";
pub const DEFAULT_LIMIT: u32 = 24;
const MAX_LIMIT: u32 = 1000;

/// Candle request
#[derive(Debug, Clone)]
pub struct KlinesRequest {
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
}

impl KlinesRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: DEFAULT_INTERVAL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Normalize and check the request before any network call
    fn validated(&self) -> Result<Self> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Validation(format!(
                "Invalid trading pair symbol: {:?}",
                self.symbol
            )));
        }
        if !INTERVALS.contains(&self.interval.as_str()) {
            return Err(Error::Validation(format!(
                "Unsupported interval {:?}; expected one of {}",
                self.interval,
                INTERVALS.join(", ")
            )));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(Self {
            symbol,
            interval: self.interval.clone(),
            limit: self.limit,
        })
    }
}

/// One OHLCV candle. Prices stay as the exchange's decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
}

/// Summary over the returned window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub high: String,
    pub low: String,
    /// `(last close - first open) / first open * 100`, two decimals
    pub change_percent: String,
    /// Open time of the first candle (ms)
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KlinesReport {
    pub symbol: String,
    pub interval: String,
    pub candles: Vec<Candle>,
    pub extracted_metrics: Metrics,
}

/// Client for the exchange's public market-data API
pub struct ExchangeClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl ExchangeClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url)
    }

    /// Fetch candles and summarize them
    pub async fn klines(&self, request: &KlinesRequest) -> Result<KlinesReport> {
        let request = request.validated()?;
        let limit = request.limit.to_string();

        let mut builder = self.client.get(self.klines_url()).query(&[
            ("symbol", request.symbol.as_str()),
            ("interval", request.interval.as_str()),
            ("limit", limit.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Feed(format!(
                "Exchange returned {} for {}: {}",
                status, request.symbol, body
            )));
        }

        let raw: Value = response.json().await?;
        let candles = parse_klines(&raw)?;
        let extracted_metrics = summarize(&candles)?;

        tracing::debug!(
            symbol = %request.symbol,
            interval = %request.interval,
            candles = candles.len(),
            "Fetched klines"
        );

        Ok(KlinesReport {
            symbol: request.symbol,
            interval: request.interval,
            candles,
            extracted_metrics,
        })
    }
}

impl std::fmt::Debug for ExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Kline rows are positional arrays:
/// `[openTime, open, high, low, close, volume, closeTime, ...]`
fn parse_klines(raw: &Value) -> Result<Vec<Candle>> {
    let rows = raw
        .as_array()
        .ok_or_else(|| Error::Feed("Expected an array of klines".to_string()))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let cols = row
                .as_array()
                .filter(|cols| cols.len() >= 7)
                .ok_or_else(|| Error::Feed(format!("Malformed kline row {}", i)))?;

            let int = |idx: usize| {
                cols[idx]
                    .as_i64()
                    .ok_or_else(|| Error::Feed(format!("Kline row {} column {} is not an integer", i, idx)))
            };
            let text = |idx: usize| {
                cols[idx]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Feed(format!("Kline row {} column {} is not a string", i, idx)))
            };

            Ok(Candle {
                open_time: int(0)?,
                open: text(1)?,
                high: text(2)?,
                low: text(3)?,
                close: text(4)?,
                volume: text(5)?,
                close_time: int(6)?,
            })
        })
        .collect()
}

fn price(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| Error::Feed(format!("Invalid price {:?}", value)))
}

fn summarize(candles: &[Candle]) -> Result<Metrics> {
    let (first, last) = match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(Error::Feed("Exchange returned no candles".to_string())),
    };

    let mut high = first;
    let mut low = first;
    for candle in candles {
        if price(&candle.high)? > price(&high.high)? {
            high = candle;
        }
        if price(&candle.low)? < price(&low.low)? {
            low = candle;
        }
    }

    let open = price(&first.open)?;
    let close = price(&last.close)?;
    let change = if open == 0.0 {
        0.0
    } else {
        (close - open) / open * 100.0
    };

    Ok(Metrics {
        high: high.high.clone(),
        low: low.low.clone(),
        change_percent: format!("{:.2}", change),
        timestamp: first.open_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            [1700000000000i64, "100.0", "110.0", "95.0", "105.0", "12.5", 1700086399999i64, "0", 10, "0", "0", "0"],
            [1700086400000i64, "105.0", "120.0", "101.0", "115.0", "8.0", 1700172799999i64, "0", 7, "0", "0", "0"]
        ])
    }

    #[test]
    fn parses_positional_rows() {
        let candles = parse_klines(&sample()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert_eq!(candles[1].close, "115.0");
    }

    #[test]
    fn metrics_span_the_window() {
        let candles = parse_klines(&sample()).unwrap();
        let metrics = summarize(&candles).unwrap();
        assert_eq!(metrics.high, "120.0");
        assert_eq!(metrics.low, "95.0");
        assert_eq!(metrics.change_percent, "15.00");
        assert_eq!(metrics.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn empty_window_is_feed_error() {
        let candles = parse_klines(&json!([])).unwrap();
        assert!(matches!(summarize(&candles), Err(Error::Feed(_))));
    }

    #[test]
    fn malformed_rows_rejected() {
        assert!(parse_klines(&json!({"code": -1121})).is_err());
        assert!(parse_klines(&json!([[1, "2"]])).is_err());
    }

    #[test]
    fn request_is_normalized() {
        let mut request = KlinesRequest::new(" btcusdt ");
        request.interval = "4h".to_string();
        let validated = request.validated().unwrap();
        assert_eq!(validated.symbol, "BTCUSDT");
        assert_eq!(validated.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn request_validation() {
        assert!(KlinesRequest::new("BTC/USDT").validated().is_err());

        let mut request = KlinesRequest::new("ETHUSDT");
        request.interval = "2d".to_string();
        assert!(request.validated().is_err());

        let mut request = KlinesRequest::new("ETHUSDT");
        request.limit = 0;
        assert!(request.validated().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = ExchangeClient::new(
            Client::new(),
            "https://api.binance.com/",
            Some(SecretString::from("super-secret-key".to_string())),
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret-key"));
        assert_eq!(client.klines_url(), "https://api.binance.com/api/v3/klines");
    }
}
