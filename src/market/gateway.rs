//! Market action gateway
//!
//! Reads on-chain state before every write and rejects calls the contract
//! would revert, so an obviously invalid write never costs gas. The contract
//! remains the authority: races between the pre-check and inclusion surface
//! as reverts.

use super::policy::{DeadlinePolicy, FeePolicy};
use super::types::{
    AgentBalance, AuxTag, CreateMarketSubmission, Market, MarketCreatedConfirmation, MarketPhase,
    MarketSnapshot, ParticipationSubmission, PlayerEntry, PlayerEntryView, SettlementSubmission,
    SubmittedTx, WithdrawalSubmission,
};
use super::units::{format_ether, parse_ether, parse_integer};
use crate::chain::{retry_read, ChainClient, ContractCall, RetryPolicy};
use crate::config::{AiMarker, Config, PhaseSource};
use crate::contracts::{Deployment, IRektPredictionMarket};
use crate::error::RevertStage;
use crate::{Error, Result};
use alloy::primitives::{TxHash, U256};
use alloy::sol_types::{SolCall, SolEvent};
use std::sync::Arc;
use std::time::Duration;

/// Create-market request
#[derive(Debug, Clone, Default)]
pub struct CreateMarketRequest {
    pub name: String,
    pub deadline_days: Option<i64>,
    /// ETH decimal string
    pub participation_fee: Option<String>,
}

/// Participate request
#[derive(Debug, Clone, Default)]
pub struct ParticipateRequest {
    pub market_id: String,
    /// 8-decimal integer string
    pub prediction_price: String,
    /// ETH decimal string
    pub entrance_fee: Option<String>,
    pub aux_data: Option<String>,
}

/// Settle request
#[derive(Debug, Clone, Default)]
pub struct SettleRequest {
    pub market_id: String,
    /// 8-decimal integer string
    pub final_price: String,
}

enum PhaseReading {
    Reported(MarketPhase),
    Clock(u64),
}

/// Gateway over one `RektPredictionMarket` deployment
pub struct MarketGateway {
    chain: Arc<dyn ChainClient>,
    deployment: Deployment,
    fees: FeePolicy,
    deadlines: DeadlinePolicy,
    phase_source: PhaseSource,
    ai_marker: AiMarker,
    read_retry: RetryPolicy,
    confirmation_timeout: Duration,
}

impl MarketGateway {
    pub fn new(chain: Arc<dyn ChainClient>, deployment: Deployment, config: &Config) -> Result<Self> {
        if chain.chain_id() != deployment.chain_id {
            return Err(Error::Config(format!(
                "Chain client is on chain {} but {} is deployed on chain {}",
                chain.chain_id(),
                deployment.name,
                deployment.chain_id
            )));
        }

        Ok(Self {
            chain,
            deployment,
            fees: FeePolicy::from_config(&config.market)?,
            deadlines: DeadlinePolicy::from_config(&config.market)?,
            phase_source: config.market.phase_source,
            ai_marker: config.market.ai_marker,
            read_retry: config.chain.read_retry.clone(),
            confirmation_timeout: Duration::from_millis(config.chain.confirmation_timeout_ms),
        })
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    // -- reads ------------------------------------------------------------

    async fn view<C>(&self, what: &'static str, call: C) -> Result<C::Return>
    where
        C: SolCall + Send,
    {
        let call = ContractCall::new(self.deployment.address, &call);
        let data = retry_read(&self.read_retry, what, || self.chain.read_contract(&call)).await?;
        C::abi_decode_returns(&data)
            .map_err(|e| Error::ChainRead(format!("Failed to decode {} response: {}", what, e)))
    }

    async fn now(&self) -> Result<u64> {
        retry_read(&self.read_retry, "latestBlock", || self.chain.latest_timestamp()).await
    }

    /// Fail with `NotFound` unless the contract's counter has assigned `id`
    async fn ensure_exists(&self, id: U256) -> Result<()> {
        let next = self
            .view("nextOrderId", IRektPredictionMarket::nextOrderIdCall {})
            .await?;
        if id >= next {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn market(&self, id: U256) -> Result<Market> {
        let raw = self
            .view("markets", IRektPredictionMarket::marketsCall { marketId: id })
            .await?;
        Ok(Market {
            start_time: to_u64(raw.startTime, "startTime")?,
            deadline: to_u64(raw.deadline, "deadline")?,
            entrance_fee: raw.entranceFee,
            final_price: raw.finalPrice,
            total_amount: raw.totalAmount,
            settled: raw.settled,
            name: raw.name,
        })
    }

    async fn player_entry(&self, id: U256) -> Result<PlayerEntry> {
        let raw = self
            .view(
                "getPlayerData",
                IRektPredictionMarket::getPlayerDataCall {
                    marketId: id,
                    player: self.chain.sender(),
                },
            )
            .await?;
        Ok(PlayerEntry {
            prediction_price: raw.predictionPrice,
            timestamp: to_u64(raw.timestamp, "timestamp")?,
            aux: AuxTag(raw.data),
        })
    }

    async fn phase_reading(&self, id: U256) -> Result<PhaseReading> {
        match self.phase_source {
            PhaseSource::Contract => {
                let raw = self
                    .view(
                        "getMarketPhase",
                        IRektPredictionMarket::getMarketPhaseCall { marketId: id },
                    )
                    .await?;
                Ok(PhaseReading::Reported(MarketPhase::from_u8(raw)?))
            }
            PhaseSource::Local => Ok(PhaseReading::Clock(self.now().await?)),
        }
    }

    /// Market record and its current phase, read concurrently
    async fn market_with_phase(&self, id: U256) -> Result<(Market, MarketPhase)> {
        let (market, reading) = futures::try_join!(self.market(id), self.phase_reading(id))?;
        let phase = match reading {
            PhaseReading::Reported(phase) => phase,
            PhaseReading::Clock(now) => MarketPhase::derive(now, market.deadline),
        };
        Ok((market, phase))
    }

    /// Snapshot of a market from the caller's point of view
    pub async fn read_market(&self, market_id: &str) -> Result<MarketSnapshot> {
        let id = parse_integer(market_id, "marketId")?;
        self.ensure_exists(id).await?;

        let ((market, phase), entry, players) = futures::try_join!(
            self.market_with_phase(id),
            self.player_entry(id),
            self.view(
                "getPlayers",
                IRektPredictionMarket::getPlayersCall { marketId: id }
            ),
        )?;

        let is_predicted_by_ai = entry
            .exists()
            .then(|| entry.aux.is_agent(self.ai_marker));

        tracing::debug!(market_id = %id, phase = %phase, settled = market.settled, "Market read");

        Ok(MarketSnapshot {
            market_id: id.to_string(),
            start_time: market.start_time.to_string(),
            deadline: market.deadline.to_string(),
            entrance_fee: market.entrance_fee.to_string(),
            entrance_fee_eth: format_ether(market.entrance_fee),
            final_price: market.final_price.to_string(),
            total_amount: market.total_amount.to_string(),
            settled: market.settled,
            name: market.name,
            phase,
            phase_source: self.phase_source,
            is_predicted_by_ai,
            player_entry: entry.exists().then(|| PlayerEntryView::from(&entry)),
            player_count: players.len().to_string(),
        })
    }

    /// Withdrawable winnings credited to the agent
    pub async fn read_agent_balance(&self) -> Result<AgentBalance> {
        let address = self.chain.sender();
        let balance = self
            .view(
                "getBalance",
                IRektPredictionMarket::getBalanceCall { user: address },
            )
            .await?;
        Ok(AgentBalance {
            address: address.to_checksum(None),
            balance: balance.to_string(),
            balance_eth: format_ether(balance),
        })
    }

    // -- writes -----------------------------------------------------------

    async fn submit<C>(&self, call: C, value: U256) -> Result<SubmittedTx>
    where
        C: SolCall + Send,
    {
        let call = ContractCall::new(self.deployment.address, &call).with_value(value);
        let tx_hash = self.chain.send_transaction(&call).await.map_err(|e| {
            tracing::warn!(function = C::SIGNATURE, error = %e, "Write failed");
            e
        })?;
        Ok(SubmittedTx::new(tx_hash, self.chain.chain_id()))
    }

    /// Submit `createMarket` starting now.
    ///
    /// The market id is only known once the transaction is mined; see
    /// [`MarketGateway::confirm_market_created`].
    pub async fn create_market(&self, request: CreateMarketRequest) -> Result<CreateMarketSubmission> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("Market name must not be empty".to_string()));
        }

        let fee = self.fees.resolve(request.participation_fee.as_deref())?;
        let days = self.deadlines.resolve(request.deadline_days);

        let now = self.now().await?;
        let deadline = self.deadlines.deadline_from(now, days.effective);

        let tx = self
            .submit(
                IRektPredictionMarket::createMarketCall {
                    _startTime: U256::from(now),
                    _deadline: U256::from(deadline),
                    _participationFee: fee.effective,
                    _name: name.clone(),
                },
                U256::ZERO,
            )
            .await?;

        tracing::info!(
            tx_hash = %tx.tx_hash,
            name = %name,
            deadline = deadline,
            days = days.effective,
            fee_wei = %fee.effective,
            "Market creation submitted"
        );

        Ok(CreateMarketSubmission {
            tx,
            name,
            start_time: now.to_string(),
            deadline: deadline.to_string(),
            requested_deadline_days: request.deadline_days,
            effective_deadline_days: days.effective,
            deadline_clamped: days.clamped,
            requested_participation_fee: request.participation_fee,
            participation_fee: fee.effective.to_string(),
            participation_fee_eth: format_ether(fee.effective),
            fee_clamped: fee.clamped,
        })
    }

    /// Wait for a `createMarket` transaction and return the assigned id
    pub async fn confirm_market_created(&self, tx_hash: TxHash) -> Result<MarketCreatedConfirmation> {
        let receipt = self
            .chain
            .wait_for_receipt(tx_hash, self.confirmation_timeout)
            .await?;

        if !receipt.success {
            return Err(Error::Reverted {
                stage: RevertStage::Execution,
                reason: format!("createMarket transaction {} failed", tx_hash),
            });
        }

        let event = receipt
            .logs
            .iter()
            .filter(|log| log.address == self.deployment.address)
            .find_map(|log| IRektPredictionMarket::MarketCreated::decode_log_data(&log.data).ok())
            .ok_or_else(|| {
                Error::ChainRead(format!("No MarketCreated event in receipt of {}", tx_hash))
            })?;

        tracing::info!(tx_hash = %tx_hash, market_id = %event.marketId, "Market created");

        Ok(MarketCreatedConfirmation {
            status: "confirmed",
            confirmed: true,
            tx_hash,
            block_number: receipt.block_number.map(|n| n.to_string()),
            market_id: event.marketId.to_string(),
            start_time: event.startTime.to_string(),
            deadline: event.deadline.to_string(),
        })
    }

    /// Submit a prediction with the entrance fee attached
    pub async fn participate(&self, request: ParticipateRequest) -> Result<ParticipationSubmission> {
        let id = parse_integer(&request.market_id, "marketId")?;
        let prediction_price = parse_integer(&request.prediction_price, "predictionPrice")?;
        let aux = AuxTag::parse(request.aux_data.as_deref())?;
        let fee = self.fees.resolve(request.entrance_fee.as_deref())?;

        self.ensure_exists(id).await?;
        let (market, phase) = self.market_with_phase(id).await?;

        if phase != MarketPhase::Prediction {
            return Err(Error::Precondition(format!(
                "Market {} is in {} phase; predictions are only accepted during PREDICTION",
                id, phase
            )));
        }
        if market.entrance_fee != fee.effective {
            tracing::warn!(
                market_id = %id,
                market_fee = %market.entrance_fee,
                attached = %fee.effective,
                "Attached fee differs from the market's entrance fee"
            );
        }

        let tx = self
            .submit(
                IRektPredictionMarket::participateInMarketCall {
                    marketId: id,
                    predictionPrice: prediction_price,
                    _data: aux.0,
                },
                fee.effective,
            )
            .await?;

        tracing::info!(
            tx_hash = %tx.tx_hash,
            market_id = %id,
            prediction_price = %prediction_price,
            value = %fee.effective,
            "Participation submitted"
        );

        Ok(ParticipationSubmission {
            tx,
            market_id: id.to_string(),
            prediction_price: prediction_price.to_string(),
            requested_entrance_fee: request.entrance_fee,
            value: fee.effective.to_string(),
            value_eth: format_ether(fee.effective),
            fee_clamped: fee.clamped,
            aux_data: aux.to_string(),
        })
    }

    /// Submit settlement once the deadline has passed
    pub async fn settle(&self, request: SettleRequest) -> Result<SettlementSubmission> {
        let id = parse_integer(&request.market_id, "marketId")?;
        let final_price = parse_integer(&request.final_price, "finalPrice")?;

        self.ensure_exists(id).await?;
        let (market, now) = futures::try_join!(self.market(id), self.now())?;

        if market.settled {
            return Err(Error::Precondition(format!("Market {} is already settled", id)));
        }
        if now < market.deadline {
            return Err(Error::Precondition(format!(
                "Market {} cannot be settled before its deadline {} (current block time {})",
                id, market.deadline, now
            )));
        }

        let tx = self
            .submit(
                IRektPredictionMarket::settleMarketCall {
                    marketId: id,
                    _finalPrice: final_price,
                },
                U256::ZERO,
            )
            .await?;

        tracing::info!(
            tx_hash = %tx.tx_hash,
            market_id = %id,
            final_price = %final_price,
            "Settlement submitted"
        );

        Ok(SettlementSubmission {
            tx,
            market_id: id.to_string(),
            final_price: final_price.to_string(),
        })
    }

    /// Withdraw credited winnings. `None` withdraws everything.
    pub async fn withdraw_balances(&self, amount_eth: Option<&str>) -> Result<WithdrawalSubmission> {
        let requested = amount_eth.map(parse_ether).transpose()?;
        let balance = self
            .view(
                "getBalance",
                IRektPredictionMarket::getBalanceCall {
                    user: self.chain.sender(),
                },
            )
            .await?;

        let amount = requested.unwrap_or(balance);
        if amount.is_zero() {
            return Err(Error::Precondition("Nothing to withdraw".to_string()));
        }
        if amount > balance {
            return Err(Error::Precondition(format!(
                "Requested {} ETH but only {} ETH is withdrawable",
                format_ether(amount),
                format_ether(balance)
            )));
        }

        let tx = self
            .submit(
                IRektPredictionMarket::withdrawBalancesCall { _amount: amount },
                U256::ZERO,
            )
            .await?;

        tracing::info!(tx_hash = %tx.tx_hash, amount = %amount, "Withdrawal submitted");

        Ok(WithdrawalSubmission {
            tx,
            amount: amount.to_string(),
            amount_eth: format_ether(amount),
        })
    }
}

impl std::fmt::Debug for MarketGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketGateway")
            .field("chain_id", &self.chain.chain_id())
            .field("deployment", &self.deployment)
            .field("phase_source", &self.phase_source)
            .finish()
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::ChainRead(format!("{} {} does not fit in 64 bits", field, value)))
}
