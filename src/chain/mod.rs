//! Chain access
//!
//! The gateway talks to the chain only through [`ChainClient`]. The
//! production implementation is [`RpcChainClient`] (alloy over HTTP); tests
//! use an in-memory contract double.

#[cfg(test)]
pub(crate) mod mock;
mod provider;
mod retry;

pub use provider::RpcChainClient;
pub use retry::{retry_read, RetryPolicy};

use crate::Result;
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::time::Duration;

/// An encoded contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    /// Native value attached (`msg.value`)
    pub value: U256,
}

impl ContractCall {
    /// Encode a typed call against `to`
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            data: Bytes::from(call.abi_encode()),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Mined transaction outcome
#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Reader/writer for contract state.
///
/// Writes return once the node has accepted the transaction; they do not
/// wait for it to be mined. Use [`ChainClient::wait_for_receipt`] for that.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain this client is connected to
    fn chain_id(&self) -> u64;

    /// Address reads are made for and transactions are sent from
    fn sender(&self) -> Address;

    /// Timestamp of the latest block, the clock contract logic runs on
    async fn latest_timestamp(&self) -> Result<u64>;

    /// `eth_call` a view function and return the raw return data
    async fn read_contract(&self, call: &ContractCall) -> Result<Bytes>;

    /// Sign and broadcast a transaction, returning its hash on acceptance
    async fn send_transaction(&self, call: &ContractCall) -> Result<TxHash>;

    /// Wait up to `timeout` for the transaction to be mined
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt>;
}
