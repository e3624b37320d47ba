//! Off-chain decision-support data
//!
//! Exchange candles and subgraph event history. Nothing here writes.

mod exchange;
mod subgraph;

pub use exchange::{
    Candle, ExchangeClient, KlinesReport, KlinesRequest, Metrics, DEFAULT_INTERVAL, DEFAULT_LIMIT,
};
pub use subgraph::{SettledFilter, SubgraphClient};

use crate::config::FeedSettings;
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for all feeds
pub fn http_client(settings: &FeedSettings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .user_agent(concat!("rekt-market-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}
