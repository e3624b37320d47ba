//! Action implementations for the prediction market agent
//!
//! Actions implement [`MarketAction`] and are exposed to the model through
//! the [`ActionRegistry`], which runs every call through the interceptor
//! pipeline and returns JSON either way.

mod market;
mod market_data;
mod registry;
mod subgraph;
mod types;
mod wallet_signing;

use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use market::{
    CreateMarketAction, CreateMarketInput, ParticipateAction, ParticipateInput, ReadAgentBalanceAction,
    ReadMarketAction, ReadMarketInput, SettleMarketAction, SettleMarketInput, WithdrawBalancesAction,
    WithdrawBalancesInput,
};
pub use market_data::{MarketDataAction, MarketDataInput};
pub use registry::{ActionRegistry, ActionDescriptor};
pub use subgraph::{
    MarketCreatedHistoryAction, MarketCreatedHistoryInput, MarketSettledHistoryAction,
    MarketSettledHistoryInput,
};
pub use types::EmptyArgs;
pub use wallet_signing::{SignMessageAction, SignMessageInput};

pub const ACTION_READ_MARKET: &str = "readMarketsContract";
pub const ACTION_CREATE_MARKET: &str = "writeCreateMarket";
pub const ACTION_PARTICIPATE: &str = "writeParticipateInMarket";
pub const ACTION_SETTLE_MARKET: &str = "writeSettleMarket";
pub const ACTION_READ_AGENT_BALANCE: &str = "readAgentBalance";
pub const ACTION_WITHDRAW_BALANCES: &str = "writeWithdrawBalances";
pub const ACTION_MARKET_DATA: &str = "getBinanceMarketData";
pub const ACTION_SUBGRAPH_CREATED: &str = "getSubgraphMarketCreatedData";
pub const ACTION_SUBGRAPH_SETTLED: &str = "getSubgraphMarketSettledData";
pub const ACTION_SIGN_MESSAGE: &str = "signMessage";

/// Actions that submit transactions
pub const WRITE_ACTIONS: [&str; 4] = [
    ACTION_CREATE_MARKET,
    ACTION_PARTICIPATE,
    ACTION_SETTLE_MARKET,
    ACTION_WITHDRAW_BALANCES,
];

/// A callable action
#[async_trait]
pub trait MarketAction: Send + Sync + 'static {
    /// Name the model calls the action by
    const NAME: &'static str;

    /// Argument object; its JSON schema is published to the model
    type Input: DeserializeOwned + JsonSchema + Send;

    fn description(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> Result<Value>;
}
