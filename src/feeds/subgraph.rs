//! Market event history from the protocol subgraph
//!
//! Read-only. Queries are raw GraphQL strings posted as JSON.

use crate::config::{FeedSettings, Network};
use crate::market::units::parse_integer;
use crate::{Error, Result};
use alloy::primitives::Address;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

const MARKET_CREATED_QUERY: &str = r#"
    query ($deadline_gt: BigInt!) {
        marketCreateds(
            first: 10
            orderBy: startTime
            orderDirection: desc
            where: { deadline_gt: $deadline_gt }
            skip: 0
        ) {
            id
            marketId
            startTime
            deadline
        }
    }
"#;

const MARKET_SETTLED_QUERY: &str = r#"
    query ($blockTimestamp_lt: BigInt!, $blockTimestamp_gt: BigInt!, $winner_not: String!) {
        marketSettleds(
            orderBy: blockTimestamp
            orderDirection: asc
            where: { blockTimestamp_lt: $blockTimestamp_lt, blockTimestamp_gt: $blockTimestamp_gt, winner_not: $winner_not }
            first: 10
        ) {
            id
            marketId
            finalPrice
            predictionPrice
            totalAmount
            winner
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GraphQLError {
    message: String,
}

impl GraphQLResponse {
    fn into_data(self) -> Result<Value> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Feed(format!("GraphQL errors: {}", messages.join("; "))));
        }
        self.data
            .ok_or_else(|| Error::Feed("No data in GraphQL response".to_string()))
    }
}

/// Filters for settled-market history
#[derive(Debug, Clone)]
pub struct SettledFilter {
    pub block_timestamp_lt: String,
    pub block_timestamp_gt: String,
    /// Exclude markets won by this address
    pub winner_not: String,
}

/// Subgraph client bound to one network's endpoint
pub struct SubgraphClient {
    client: Client,
    endpoint: String,
    network: Network,
}

impl SubgraphClient {
    /// Client for `network`; a network without a subgraph is a configuration error
    pub fn for_network(client: Client, feeds: &FeedSettings, network: Network) -> Result<Self> {
        let endpoint = feeds.subgraph_urls.get(&network).cloned().ok_or_else(|| {
            Error::Config(format!("No subgraph endpoint configured for {}", network))
        })?;
        Ok(Self {
            client,
            endpoint,
            network,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "query": query,
                "variables": variables
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed(format!(
                "Subgraph returned {} for {}",
                status, self.network
            )));
        }

        let result: GraphQLResponse = response.json().await?;
        result.into_data()
    }

    /// Markets whose deadline is after `deadline_gt`, newest first
    pub async fn market_created(&self, deadline_gt: &str) -> Result<Value> {
        let variables = market_created_variables(deadline_gt)?;
        tracing::debug!(network = %self.network, deadline_gt = deadline_gt, "Querying created markets");
        self.query(MARKET_CREATED_QUERY, variables).await
    }

    /// Settlements in a block-time window, oldest first
    pub async fn market_settled(&self, filter: &SettledFilter) -> Result<Value> {
        let variables = market_settled_variables(filter)?;
        tracing::debug!(network = %self.network, "Querying settled markets");
        self.query(MARKET_SETTLED_QUERY, variables).await
    }
}

fn market_created_variables(deadline_gt: &str) -> Result<Value> {
    let deadline_gt = parse_integer(deadline_gt, "deadline_gt")?;
    Ok(json!({ "deadline_gt": deadline_gt.to_string() }))
}

fn market_settled_variables(filter: &SettledFilter) -> Result<Value> {
    let lt = parse_integer(&filter.block_timestamp_lt, "blockTimestamp_lt")?;
    let gt = parse_integer(&filter.block_timestamp_gt, "blockTimestamp_gt")?;
    if gt >= lt {
        return Err(Error::Validation(
            "blockTimestamp_gt must be below blockTimestamp_lt".to_string(),
        ));
    }
    let winner = Address::from_str(filter.winner_not.trim())
        .map_err(|e| Error::Validation(format!("Invalid winner_not address: {}", e)))?;

    // Subgraph stores addresses lowercased
    Ok(json!({
        "blockTimestamp_lt": lt.to_string(),
        "blockTimestamp_gt": gt.to_string(),
        "winner_not": format!("{:#x}", winner),
    }))
}
