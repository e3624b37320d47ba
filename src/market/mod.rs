//! Prediction market lifecycle
//!
//! A market moves PREDICTION → (LOCK) → SETTLEMENT and is settled exactly
//! once. The gateway checks phase and settlement state before each write;
//! fees and durations pass through clamp policies first.

mod gateway;
pub mod policy;
pub mod types;
pub mod units;

pub use gateway::{CreateMarketRequest, MarketGateway, ParticipateRequest, SettleRequest};
pub use policy::{Clamped, DeadlinePolicy, FeePolicy};
pub use types::{
    AgentBalance, AuxTag, CreateMarketSubmission, Market, MarketCreatedConfirmation, MarketPhase,
    MarketSnapshot, ParticipationSubmission, PlayerEntry, SettlementSubmission, SubmittedTx,
    WithdrawalSubmission,
};
