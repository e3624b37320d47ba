//! Prediction Market Agent
//!
//! Turns the `RektPredictionMarket` contract and its off-chain data sources
//! into actions a language model can call:
//! - Read markets, their phase and the agent's own prediction
//! - Create, participate in and settle markets, withdraw winnings
//! - Fetch exchange candles and subgraph event history
//!
//! # Safety Model
//!
//! - Every write reads on-chain state first and rejects calls the contract
//!   would revert
//! - All action calls pass through the interceptor pipeline
//! - Private keys never leave the wallet module
//! - Errors report whether the chain evaluated the call

pub mod chain;
pub mod config;
pub mod contracts;
pub mod feeds;
pub mod interceptors;
pub mod market;
pub mod runner;
pub mod tools;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, ErrorPayload, Result, RevertStage};
pub use market::MarketGateway;
pub use runner::AgentRunner;
pub use tools::ActionRegistry;
