//! Exchange candle action

use super::{MarketAction, ACTION_MARKET_DATA};
use crate::feeds::{ExchangeClient, KlinesRequest, DEFAULT_INTERVAL, DEFAULT_LIMIT};
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarketDataInput {
    /// Trading pair, e.g. "BTCUSDT"
    pub symbol: String,
    /// Candle interval, e.g. "1h" or "1d"
    #[serde(default)]
    pub interval: Option<String>,
    /// Number of candles (1 to 1000)
    #[serde(default)]
    pub limit: Option<u32>,
}

impl From<MarketDataInput> for KlinesRequest {
    fn from(input: MarketDataInput) -> Self {
        KlinesRequest {
            symbol: input.symbol,
            interval: input
                .interval
                .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
            limit: input.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

pub struct MarketDataAction {
    client: Arc<ExchangeClient>,
}

impl MarketDataAction {
    pub fn new(client: Arc<ExchangeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketAction for MarketDataAction {
    const NAME: &'static str = ACTION_MARKET_DATA;
    type Input = MarketDataInput;

    fn description(&self) -> &'static str {
        "Fetch exchange candles for a trading pair with summary metrics \
         (high, low, percent change over the window). Use before predicting a price."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let report = self.client.klines(&input.into()).await?;
        Ok(serde_json::to_value(report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let input: MarketDataInput = serde_json::from_value(json!({"symbol": "ETHUSDT"})).unwrap();
        let request = KlinesRequest::from(input);
        assert_eq!(request.interval, DEFAULT_INTERVAL);
        assert_eq!(request.limit, DEFAULT_LIMIT);
    }

    #[tokio::test]
    async fn test_invalid_symbol_rejected_before_request() {
        // Unroutable base URL: validation must fail first
        let client = ExchangeClient::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let action = MarketDataAction::new(Arc::new(client));
        let err = action
            .execute(MarketDataInput {
                symbol: "BTC/USDT".to_string(),
                interval: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
