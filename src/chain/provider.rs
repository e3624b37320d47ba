//! alloy-backed chain client
//!
//! SECURITY NOTE:
//! - Signing happens inside the alloy wallet filler built from `SecureWallet`
//! - Without a wallet the client is read-only and refuses to send

use super::{ChainClient, ContractCall, Receipt};
use crate::config::RpcConfig;
use crate::contracts::decode_revert;
use crate::error::RevertStage;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{hex, Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};

/// Receipt polling interval
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Chain client over JSON-RPC
pub struct RpcChainClient {
    provider: DynProvider,
    chain_id: u64,
    sender: Address,
    can_sign: bool,
    request_timeout: Duration,
    simulate_writes: bool,
}

impl RpcChainClient {
    /// Connect with a signing wallet
    pub fn with_wallet(
        rpc_config: &RpcConfig,
        chain_id: u64,
        wallet: &SecureWallet,
        request_timeout: Duration,
    ) -> Result<Self> {
        let url = Self::rpc_url(rpc_config, chain_id)?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            chain_id,
            sender: wallet.address(),
            can_sign: true,
            request_timeout,
            simulate_writes: true,
        })
    }

    /// Connect without a wallet; reads are made on behalf of `sender`
    pub fn read_only(
        rpc_config: &RpcConfig,
        chain_id: u64,
        sender: Address,
        request_timeout: Duration,
    ) -> Result<Self> {
        let url = Self::rpc_url(rpc_config, chain_id)?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            chain_id,
            sender,
            can_sign: false,
            request_timeout,
            simulate_writes: true,
        })
    }

    /// Toggle `eth_call` pre-flight before broadcasting writes
    pub fn with_simulation(mut self, simulate_writes: bool) -> Self {
        self.simulate_writes = simulate_writes;
        self
    }

    fn rpc_url(rpc_config: &RpcConfig, chain_id: u64) -> Result<url::Url> {
        let raw = rpc_config
            .get(chain_id)
            .ok_or_else(|| Error::Config(format!("RPC URL not configured for chain {}", chain_id)))?;
        raw.parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))
    }

    fn timeout_ms(&self) -> u64 {
        self.request_timeout.as_millis() as u64
    }

    /// Run an RPC future under the request timeout.
    ///
    /// `None` means the deadline elapsed; the future is dropped, which
    /// cancels the request.
    async fn bounded<T, F>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.request_timeout, fut).await.ok()
    }

    fn request(&self, call: &ContractCall) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.sender)
            .to(call.to)
            .input(call.data.clone().into())
            .value(call.value)
    }

    /// Revert reason carried by an RPC error, if the node reported one
    fn revert_reason(error: &TransportError) -> Option<String> {
        let payload = error.as_error_resp()?;
        if let Some(data) = payload.as_revert_data() {
            return Some(
                decode_revert(&data).unwrap_or_else(|| format!("Reverted with data: {}", data)),
            );
        }
        let message = payload.message.to_string();
        if message.contains("revert") {
            return Some(parse_revert_reason(&message));
        }
        None
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sender(&self) -> Address {
        self.sender
    }

    async fn latest_timestamp(&self) -> Result<u64> {
        let block = self
            .bounded(async {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Latest)
                    .await
            })
            .await
            .ok_or(Error::Timeout(self.timeout_ms()))?
            .map_err(|e| Error::ChainRead(format!("Failed to fetch latest block: {}", e)))?
            .ok_or_else(|| Error::ChainRead("Latest block not available".to_string()))?;

        Ok(block.header.timestamp)
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Bytes> {
        let tx = self.request(call);
        let result = self
            .bounded(async { self.provider.call(tx).await })
            .await
            .ok_or(Error::Timeout(self.timeout_ms()))?;

        result.map_err(|e| match Self::revert_reason(&e) {
            Some(reason) => Error::Reverted {
                stage: RevertStage::Simulation,
                reason,
            },
            None => Error::ChainRead(e.to_string()),
        })
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<TxHash> {
        if !self.can_sign {
            return Err(Error::Wallet(
                "No wallet configured; set AGENT_PRIVATE_KEY to send transactions".to_string(),
            ));
        }

        let tx = self.request(call);

        if self.simulate_writes {
            let simulated = self
                .bounded(async { self.provider.call(tx.clone()).await })
                .await
                .ok_or_else(|| {
                    Error::WriteNotSubmitted(format!(
                        "Pre-flight simulation timed out after {}ms",
                        self.timeout_ms()
                    ))
                })?;

            if let Err(e) = simulated {
                return Err(match Self::revert_reason(&e) {
                    Some(reason) => Error::Reverted {
                        stage: RevertStage::Simulation,
                        reason,
                    },
                    None => Error::WriteNotSubmitted(format!("Pre-flight simulation failed: {}", e)),
                });
            }
        }

        let pending = self
            .bounded(async { self.provider.send_transaction(tx).await })
            .await
            .ok_or_else(|| {
                Error::SubmissionUnknown(format!(
                    "No acknowledgement within {}ms; check pending transactions before resubmitting",
                    self.timeout_ms()
                ))
            })?;

        match pending {
            Ok(pending) => {
                let tx_hash = *pending.tx_hash();
                tracing::info!(
                    tx_hash = %tx_hash,
                    to = %call.to,
                    value = %call.value,
                    "Transaction submitted"
                );
                Ok(tx_hash)
            }
            Err(e) => Err(match Self::revert_reason(&e) {
                // Gas estimation ran the call and it reverted; nothing was broadcast
                Some(reason) => Error::Reverted {
                    stage: RevertStage::Simulation,
                    reason,
                },
                None => Error::WriteNotSubmitted(e.to_string()),
            }),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            let fetched = self
                .bounded(async { self.provider.get_transaction_receipt(tx_hash).await })
                .await;

            match fetched {
                Some(Ok(Some(receipt))) => {
                    return Ok(Receipt {
                        tx_hash,
                        block_number: receipt.block_number,
                        success: receipt.status(),
                        logs: receipt
                            .inner
                            .logs()
                            .iter()
                            .map(|log| log.inner.clone())
                            .collect(),
                    });
                }
                Some(Ok(None)) => {}
                Some(Err(e)) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                }
                None => {
                    tracing::warn!(tx_hash = %tx_hash, "Receipt lookup timed out");
                }
            }

            if started.elapsed() >= timeout {
                return Err(Error::Timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("chain_id", &self.chain_id)
            .field("sender", &self.sender)
            .field("can_sign", &self.can_sign)
            .finish()
    }
}

/// Parse revert reason from an RPC error message
fn parse_revert_reason(error: &str) -> String {
    if error.contains("execution reverted") {
        if let Some(start) = error.find("revert: ") {
            let reason = &error[start + 8..];
            if let Some(end) = reason.find('"') {
                return reason[..end].to_string();
            }
            return reason.to_string();
        }
        if let Some((_, rest)) = error.split_once("execution reverted: ") {
            return rest.trim().to_string();
        }
        if let Some(start) = error.find("0x") {
            let hex_data = &error[start..];
            let end = hex_data
                .find(|c: char| !c.is_ascii_hexdigit() && c != 'x')
                .unwrap_or(hex_data.len());
            let hex_str = &hex_data[..end];
            if let Ok(bytes) = hex::decode(hex_str) {
                if let Some(reason) = decode_revert(&bytes) {
                    return reason;
                }
            }
            return format!("Reverted with data: {}", hex_str);
        }
        return "execution reverted".to_string();
    }

    error.to_string()
}
