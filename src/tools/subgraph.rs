//! Subgraph history actions
//!
//! Indexed `MarketCreated` and `MarketSettled` events for the configured
//! network. Read-only.

use super::types::stringly;
use super::{MarketAction, ACTION_SUBGRAPH_CREATED, ACTION_SUBGRAPH_SETTLED};
use crate::feeds::{SettledFilter, SubgraphClient};
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarketCreatedHistoryInput {
    /// Only markets with a deadline after this unix timestamp
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub deadline_gt: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarketSettledHistoryInput {
    /// Settled before this unix timestamp
    #[serde(rename = "blockTimestamp_lt", deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub block_timestamp_lt: String,
    /// Settled after this unix timestamp
    #[serde(rename = "blockTimestamp_gt", deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub block_timestamp_gt: String,
    /// Exclude settlements won by this address
    pub winner_not: String,
}

pub struct MarketCreatedHistoryAction {
    client: Arc<SubgraphClient>,
}

impl MarketCreatedHistoryAction {
    pub fn new(client: Arc<SubgraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketAction for MarketCreatedHistoryAction {
    const NAME: &'static str = ACTION_SUBGRAPH_CREATED;
    type Input = MarketCreatedHistoryInput;

    fn description(&self) -> &'static str {
        "List created markets whose deadline is after the given unix timestamp, newest first."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        self.client.market_created(&input.deadline_gt).await
    }
}

pub struct MarketSettledHistoryAction {
    client: Arc<SubgraphClient>,
}

impl MarketSettledHistoryAction {
    pub fn new(client: Arc<SubgraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketAction for MarketSettledHistoryAction {
    const NAME: &'static str = ACTION_SUBGRAPH_SETTLED;
    type Input = MarketSettledHistoryInput;

    fn description(&self) -> &'static str {
        "List market settlements within a block-time window, excluding one winner address. \
         Useful for reviewing how past predictions fared."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        self.client
            .market_settled(&SettledFilter {
                block_timestamp_lt: input.block_timestamp_lt,
                block_timestamp_gt: input.block_timestamp_gt,
                winner_not: input.winner_not,
            })
            .await
    }
}
