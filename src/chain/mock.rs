//! In-memory `RektPredictionMarket` for tests
//!
//! Decodes calldata with the `sol!` bindings, applies the contract's rules to
//! local state and encodes return data the way the node would. Sends are
//! evaluated before they are accepted, so a rule violation surfaces as a
//! simulated revert.

use super::{ChainClient, ContractCall, Receipt};
use crate::contracts::IRektPredictionMarket::{self, IRektPredictionMarketCalls};
use crate::error::RevertStage;
use crate::{Error, Result};
use alloy::primitives::{address, keccak256, Address, Bytes, Log, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default sender (anvil account 0)
pub const AGENT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

/// Contract address used by the double
pub const CONTRACT: Address = address!("c4cebf58836707611439e23996f4fa4165ea6a28");

#[derive(Debug, Clone, Default)]
pub struct MockMarket {
    pub start_time: u64,
    pub deadline: u64,
    pub entrance_fee: U256,
    pub final_price: U256,
    pub total_amount: U256,
    pub settled: bool,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockEntry {
    pub prediction_price: U256,
    pub timestamp: u64,
    pub data: B256,
}

#[derive(Debug, Default)]
struct State {
    now: u64,
    /// Seconds before the deadline during which the contract reports LOCK
    lock_window: u64,
    markets: Vec<MockMarket>,
    entries: HashMap<(u64, Address), MockEntry>,
    players: HashMap<u64, Vec<Address>>,
    balances: HashMap<Address, U256>,
    sent: Vec<ContractCall>,
    receipts: HashMap<TxHash, Receipt>,
    nonce: u64,
    failing_reads: u32,
    read_count: u32,
    withhold_receipts: bool,
}

/// Shared-state contract double; clones made with [`MockChain::as_sender`]
/// see the same contract.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<State>>,
    sender: Address,
    chain_id: u64,
}

type Revert = String;

impl MockChain {
    pub fn new(now: u64) -> Self {
        let state = State {
            now,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            sender: AGENT,
            chain_id: 31337,
        }
    }

    /// Same contract, different caller
    pub fn as_sender(&self, sender: Address) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sender,
            chain_id: self.chain_id,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn now(&self) -> u64 {
        self.lock().now
    }

    pub fn set_now(&self, now: u64) {
        self.lock().now = now;
    }

    pub fn set_lock_window(&self, seconds: u64) {
        self.lock().lock_window = seconds;
    }

    /// Insert a market directly, returning its id
    pub fn seed_market(&self, market: MockMarket) -> u64 {
        let mut state = self.lock();
        state.markets.push(market);
        (state.markets.len() - 1) as u64
    }

    pub fn market(&self, id: u64) -> Option<MockMarket> {
        self.lock().markets.get(id as usize).cloned()
    }

    pub fn entry(&self, id: u64, player: Address) -> Option<MockEntry> {
        self.lock().entries.get(&(id, player)).cloned()
    }

    pub fn set_balance(&self, user: Address, amount: U256) {
        self.lock().balances.insert(user, amount);
    }

    pub fn balance(&self, user: Address) -> U256 {
        self.lock().balances.get(&user).copied().unwrap_or_default()
    }

    /// Fail the next `n` reads with a transport error
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().failing_reads = n;
    }

    pub fn read_count(&self) -> u32 {
        self.lock().read_count
    }

    pub fn withhold_receipts(&self, withhold: bool) {
        self.lock().withhold_receipts = withhold;
    }

    /// Transactions accepted so far
    pub fn sent(&self) -> Vec<ContractCall> {
        self.lock().sent.clone()
    }
}

impl State {
    fn phase(&self, id: u64) -> u8 {
        match self.markets.get(id as usize) {
            Some(m) if self.now >= m.deadline => 2,
            Some(m) if self.now + self.lock_window >= m.deadline => 1,
            _ => 0,
        }
    }

    fn read(&self, call: IRektPredictionMarketCalls) -> std::result::Result<Vec<u8>, Revert> {
        use IRektPredictionMarketCalls as C;

        let encoded = match call {
            C::markets(c) => {
                let m = self.markets.get(to_u64(c.marketId)? as usize).cloned().unwrap_or_default();
                (
                    U256::from(m.start_time),
                    U256::from(m.deadline),
                    m.entrance_fee,
                    m.final_price,
                    m.total_amount,
                    m.settled,
                    m.name,
                )
                    .abi_encode_params()
            }
            C::getMarketPhase(c) => IRektPredictionMarket::getMarketPhaseCall::abi_encode_returns(
                &self.phase(to_u64(c.marketId)?),
            ),
            C::getPlayerData(c) => {
                let e = self
                    .entries
                    .get(&(to_u64(c.marketId)?, c.player))
                    .cloned()
                    .unwrap_or_default();
                (e.prediction_price, U256::from(e.timestamp), e.data).abi_encode_params()
            }
            C::getPlayers(c) => {
                let players = self
                    .players
                    .get(&to_u64(c.marketId)?)
                    .cloned()
                    .unwrap_or_default();
                (players,).abi_encode_params()
            }
            C::getBalance(c) => {
                (self.balances.get(&c.user).copied().unwrap_or_default(),).abi_encode_params()
            }
            C::nextOrderId(_) => (U256::from(self.markets.len()),).abi_encode_params(),
            _ => return Err("not a view function".to_string()),
        };
        Ok(encoded)
    }

    fn execute(
        &mut self,
        sender: Address,
        value: U256,
        call: IRektPredictionMarketCalls,
    ) -> std::result::Result<Vec<Log>, Revert> {
        use IRektPredictionMarketCalls as C;

        let log = |data| Log {
            address: CONTRACT,
            data,
        };

        match call {
            C::createMarket(c) => {
                if c._startTime >= c._deadline {
                    return Err("Start time must be before deadline".to_string());
                }
                let id = self.markets.len() as u64;
                self.markets.push(MockMarket {
                    start_time: to_u64(c._startTime)?,
                    deadline: to_u64(c._deadline)?,
                    entrance_fee: c._participationFee,
                    name: c._name,
                    ..Default::default()
                });
                let event = IRektPredictionMarket::MarketCreated {
                    marketId: U256::from(id),
                    startTime: c._startTime,
                    deadline: c._deadline,
                };
                Ok(vec![log(event.encode_log_data())])
            }
            C::participateInMarket(c) => {
                let id = to_u64(c.marketId)?;
                let fee = self.existing(id)?.entrance_fee;
                if self.phase(id) != 0 {
                    return Err("Market not in prediction phase".to_string());
                }
                if value != fee {
                    return Err("Incorrect entrance fee".to_string());
                }
                if self.entries.contains_key(&(id, sender)) {
                    return Err("Player already participated".to_string());
                }
                self.entries.insert(
                    (id, sender),
                    MockEntry {
                        prediction_price: c.predictionPrice,
                        timestamp: self.now,
                        data: c._data,
                    },
                );
                self.players.entry(id).or_default().push(sender);
                self.markets[id as usize].total_amount += value;

                let event = IRektPredictionMarket::MarketParticipation {
                    marketId: c.marketId,
                    player: sender,
                    predictionPrice: c.predictionPrice,
                };
                Ok(vec![log(event.encode_log_data())])
            }
            C::settleMarket(c) => {
                let id = to_u64(c.marketId)?;
                let market = self.existing(id)?;
                if market.settled {
                    return Err("Market already settled".to_string());
                }
                if self.now < market.deadline {
                    return Err("Market not in settlement phase".to_string());
                }
                let total = market.total_amount;

                // Closest prediction wins the pool
                let winner = self
                    .players
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .filter_map(|p| self.entries.get(&(id, *p)).map(|e| (*p, e.prediction_price)))
                    .min_by_key(|(_, price)| price.abs_diff(c._finalPrice));
                let (winner, prediction) = winner.unwrap_or((Address::ZERO, U256::ZERO));
                if winner != Address::ZERO {
                    *self.balances.entry(winner).or_default() += total;
                }

                let market = &mut self.markets[id as usize];
                market.settled = true;
                market.final_price = c._finalPrice;

                let event = IRektPredictionMarket::MarketSettled {
                    marketId: c.marketId,
                    winner,
                    finalPrice: c._finalPrice,
                    predictionPrice: prediction,
                    totalAmount: total,
                };
                Ok(vec![log(event.encode_log_data())])
            }
            C::withdrawBalances(c) => {
                let balance = self.balances.entry(sender).or_default();
                if *balance < c._amount {
                    return Err("Insufficient balance".to_string());
                }
                *balance -= c._amount;
                let event = IRektPredictionMarket::WithdrawBalance {
                    user: sender,
                    amount: c._amount,
                };
                Ok(vec![log(event.encode_log_data())])
            }
            _ => Err("not a state-changing function".to_string()),
        }
    }

    fn existing(&self, id: u64) -> std::result::Result<&MockMarket, Revert> {
        self.markets
            .get(id as usize)
            .ok_or_else(|| "Market does not exist".to_string())
    }
}

fn to_u64(value: U256) -> std::result::Result<u64, Revert> {
    u64::try_from(value).map_err(|_| "value out of range".to_string())
}

fn decode(call: &ContractCall) -> Result<IRektPredictionMarketCalls> {
    IRektPredictionMarketCalls::abi_decode(&call.data)
        .map_err(|e| Error::Validation(format!("mock could not decode calldata: {}", e)))
}

fn reverted(reason: Revert) -> Error {
    Error::Reverted {
        stage: RevertStage::Simulation,
        reason,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sender(&self) -> Address {
        self.sender
    }

    async fn latest_timestamp(&self) -> Result<u64> {
        Ok(self.now())
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Bytes> {
        let decoded = decode(call)?;
        let mut state = self.lock();
        state.read_count += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(Error::ChainRead("connection reset by peer".to_string()));
        }
        state.read(decoded).map(Bytes::from).map_err(reverted)
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<TxHash> {
        let decoded = decode(call)?;
        let mut state = self.lock();
        let logs = state
            .execute(self.sender, call.value, decoded)
            .map_err(reverted)?;

        state.nonce += 1;
        let tx_hash = keccak256(state.nonce.to_be_bytes());
        let block_number = Some(state.nonce);
        state.sent.push(call.clone());
        state.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                block_number,
                success: true,
                logs,
            },
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt> {
        let state = self.lock();
        if state.withhold_receipts {
            return Err(Error::Timeout(timeout.as_millis() as u64));
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(Error::Timeout(timeout.as_millis() as u64))
    }
}
