//! Prediction market contract actions
//!
//! Thin wrappers over [`MarketGateway`]. Ids and prices accept strings or
//! bare numbers; outputs keep every on-chain quantity as a decimal string.

use super::types::{stringly, stringly_opt, EmptyArgs};
use super::{
    MarketAction, ACTION_CREATE_MARKET, ACTION_PARTICIPATE, ACTION_READ_AGENT_BALANCE,
    ACTION_READ_MARKET, ACTION_SETTLE_MARKET, ACTION_WITHDRAW_BALANCES,
};
use crate::market::{CreateMarketRequest, MarketGateway, ParticipateRequest, SettleRequest};
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarketInput {
    /// Market id (integer)
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub market_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketInput {
    /// Human-readable market question, e.g. "BTC above 100k"
    pub name: String,
    /// Days until the deadline; out-of-range values fall back to the default
    #[serde(default)]
    pub deadline_days: Option<i64>,
    /// Participation fee in ETH, e.g. "0.001"
    #[serde(default, deserialize_with = "stringly_opt")]
    #[schemars(with = "Option<String>")]
    pub participation_fee: Option<String>,
    /// Wait for the receipt and report the assigned market id
    #[serde(default)]
    pub wait_for_confirmation: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipateInput {
    /// Market id (integer)
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub market_id: String,
    /// Predicted price with 8 decimals, e.g. "10000000000000" for 100000
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub prediction_price: String,
    /// Entrance fee in ETH; must match the market's fee
    #[serde(default, deserialize_with = "stringly_opt")]
    #[schemars(with = "Option<String>")]
    pub entrance_fee: Option<String>,
    /// Optional 32-byte hex tag stored with the prediction
    #[serde(default)]
    pub aux_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettleMarketInput {
    /// Market id (integer)
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub market_id: String,
    /// Observed final price with 8 decimals
    #[serde(deserialize_with = "stringly")]
    #[schemars(with = "String")]
    pub final_price: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBalancesInput {
    /// Amount in ETH; omit to withdraw the full balance
    #[serde(default, deserialize_with = "stringly_opt")]
    #[schemars(with = "Option<String>")]
    pub amount: Option<String>,
}

pub struct ReadMarketAction {
    gateway: Arc<MarketGateway>,
}

impl ReadMarketAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for ReadMarketAction {
    const NAME: &'static str = ACTION_READ_MARKET;
    type Input = ReadMarketInput;

    fn description(&self) -> &'static str {
        "Read a prediction market: times, entrance fee, pool size, settlement state, \
         current phase (PREDICTION, LOCK, SETTLEMENT) and the agent's own prediction."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let snapshot = self.gateway.read_market(&input.market_id).await?;
        Ok(serde_json::to_value(snapshot)?)
    }
}

pub struct CreateMarketAction {
    gateway: Arc<MarketGateway>,
}

impl CreateMarketAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for CreateMarketAction {
    const NAME: &'static str = ACTION_CREATE_MARKET;
    type Input = CreateMarketInput;

    fn description(&self) -> &'static str {
        "Create a prediction market starting now. Deadline defaults to 7 days (3 to 30 allowed); \
         participation fee defaults to 0.001 ETH (0.001 to 0.005 allowed)."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let submission = self
            .gateway
            .create_market(CreateMarketRequest {
                name: input.name,
                deadline_days: input.deadline_days,
                participation_fee: input.participation_fee,
            })
            .await?;

        let tx_hash = submission.tx.tx_hash;
        let mut output = serde_json::to_value(submission)?;
        if !input.wait_for_confirmation {
            return Ok(output);
        }

        // The transaction is already out; a failed wait must not hide its hash
        let confirmation = match self.gateway.confirm_market_created(tx_hash).await {
            Ok(confirmation) => serde_json::to_value(confirmation)?,
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Market creation not confirmed");
                json!({ "error": e.payload() })
            }
        };
        output["confirmation"] = confirmation;
        Ok(output)
    }
}

pub struct ParticipateAction {
    gateway: Arc<MarketGateway>,
}

impl ParticipateAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for ParticipateAction {
    const NAME: &'static str = ACTION_PARTICIPATE;
    type Input = ParticipateInput;

    fn description(&self) -> &'static str {
        "Submit a price prediction to a market in PREDICTION phase, paying its entrance fee. \
         One prediction per address per market."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let submission = self
            .gateway
            .participate(ParticipateRequest {
                market_id: input.market_id,
                prediction_price: input.prediction_price,
                entrance_fee: input.entrance_fee,
                aux_data: input.aux_data,
            })
            .await?;
        Ok(serde_json::to_value(submission)?)
    }
}

pub struct SettleMarketAction {
    gateway: Arc<MarketGateway>,
}

impl SettleMarketAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for SettleMarketAction {
    const NAME: &'static str = ACTION_SETTLE_MARKET;
    type Input = SettleMarketInput;

    fn description(&self) -> &'static str {
        "Settle a market after its deadline with the observed final price. \
         The closest prediction wins the pool."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let submission = self
            .gateway
            .settle(SettleRequest {
                market_id: input.market_id,
                final_price: input.final_price,
            })
            .await?;
        Ok(serde_json::to_value(submission)?)
    }
}

pub struct ReadAgentBalanceAction {
    gateway: Arc<MarketGateway>,
}

impl ReadAgentBalanceAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for ReadAgentBalanceAction {
    const NAME: &'static str = ACTION_READ_AGENT_BALANCE;
    type Input = EmptyArgs;

    fn description(&self) -> &'static str {
        "Read the winnings credited to the agent's address and available to withdraw."
    }

    async fn execute(&self, _input: Self::Input) -> Result<Value> {
        let balance = self.gateway.read_agent_balance().await?;
        Ok(serde_json::to_value(balance)?)
    }
}

pub struct WithdrawBalancesAction {
    gateway: Arc<MarketGateway>,
}

impl WithdrawBalancesAction {
    pub fn new(gateway: Arc<MarketGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MarketAction for WithdrawBalancesAction {
    const NAME: &'static str = ACTION_WITHDRAW_BALANCES;
    type Input = WithdrawBalancesInput;

    fn description(&self) -> &'static str {
        "Withdraw credited winnings to the agent's address. Omit amount to withdraw everything."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        let submission = self
            .gateway
            .withdraw_balances(input.amount.as_deref())
            .await?;
        Ok(serde_json::to_value(submission)?)
    }
}
