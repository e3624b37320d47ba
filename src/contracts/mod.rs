//! Contract registry
//!
//! Maps `(chain_id, contract)` to a deployment. The ABI side of each entry
//! is the typed binding in this module; the registry only carries addresses.

mod rekt;

pub use rekt::{decode_revert, IRektPredictionMarket};

use crate::config::Network;
use crate::{Error, Result};
use alloy::primitives::{address, Address};
use std::collections::HashMap;

/// Contracts the agent knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractName {
    RektPredictionMarket,
}

impl ContractName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::RektPredictionMarket => "RektPredictionMarket",
        }
    }
}

impl std::fmt::Display for ContractName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed contract instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub name: ContractName,
    pub chain_id: u64,
    pub address: Address,
}

/// Known deployments
mod deployed {
    use super::*;

    pub const REKT_LOCALHOST: Address = address!("c4cebf58836707611439e23996f4fa4165ea6a28");
    pub const REKT_BASE_SEPOLIA: Address = address!("5641214dfb3a7a12731825193ad999b12303e706");
    pub const REKT_ARBITRUM_SEPOLIA: Address =
        address!("e3b19b212375e31d3b7138ce86cc7706c7d36329");
}

/// Registry of contract deployments keyed by chain and contract name
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    entries: HashMap<(u64, ContractName), Deployment>,
}

impl ContractRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every known deployment
    pub fn deployed() -> Self {
        let mut registry = Self::new();
        registry.insert(
            Network::Localhost.chain_id(),
            ContractName::RektPredictionMarket,
            deployed::REKT_LOCALHOST,
        );
        registry.insert(
            Network::BaseSepolia.chain_id(),
            ContractName::RektPredictionMarket,
            deployed::REKT_BASE_SEPOLIA,
        );
        registry.insert(
            Network::ArbitrumSepolia.chain_id(),
            ContractName::RektPredictionMarket,
            deployed::REKT_ARBITRUM_SEPOLIA,
        );
        registry
    }

    /// Add or replace a deployment
    pub fn insert(&mut self, chain_id: u64, name: ContractName, address: Address) {
        self.entries.insert(
            (chain_id, name),
            Deployment {
                name,
                chain_id,
                address,
            },
        );
    }

    /// Look up a deployment. A missing entry is a configuration error.
    pub fn get(&self, chain_id: u64, name: ContractName) -> Result<Deployment> {
        self.entries.get(&(chain_id, name)).copied().ok_or_else(|| {
            Error::Config(format!(
                "No {} deployment registered for chain {}",
                name, chain_id
            ))
        })
    }
}
