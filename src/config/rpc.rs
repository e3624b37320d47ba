//! RPC endpoint configuration
//!
//! Resolution order per chain:
//! 1. Per-chain env vars (LOCALHOST_RPC_URL, BASE_SEPOLIA_RPC_URL, ARBITRUM_SEPOLIA_RPC_URL)
//! 2. ALCHEMY_API_KEY - builds testnet URLs automatically
//! 3. Public RPC fallbacks - rate limited, for testing only
//!
//! # Examples
//!
//! ```bash
//! export BASE_SEPOLIA_RPC_URL="https://base-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use super::Network;
use std::collections::HashMap;

/// RPC configuration for the supported chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

/// Environment variable names
mod env_vars {
    pub const LOCALHOST_RPC_URL: &str = "LOCALHOST_RPC_URL";
    pub const BASE_SEPOLIA_RPC_URL: &str = "BASE_SEPOLIA_RPC_URL";
    pub const ARBITRUM_SEPOLIA_RPC_URL: &str = "ARBITRUM_SEPOLIA_RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const LOCALHOST: &str = "http://127.0.0.1:8545";
    pub const BASE_SEPOLIA: &str = "https://sepolia.base.org";
    pub const ARBITRUM_SEPOLIA: &str = "https://sepolia-rollup.arbitrum.io/rpc";
}

fn per_chain_var(network: Network) -> &'static str {
    match network {
        Network::Localhost => env_vars::LOCALHOST_RPC_URL,
        Network::BaseSepolia => env_vars::BASE_SEPOLIA_RPC_URL,
        Network::ArbitrumSepolia => env_vars::ARBITRUM_SEPOLIA_RPC_URL,
    }
}

fn public_rpc(network: Network) -> &'static str {
    match network {
        Network::Localhost => public_rpcs::LOCALHOST,
        Network::BaseSepolia => public_rpcs::BASE_SEPOLIA,
        Network::ArbitrumSepolia => public_rpcs::ARBITRUM_SEPOLIA,
    }
}

fn alchemy_url(network: Network, key: &str) -> Option<String> {
    match network {
        Network::Localhost => None,
        Network::BaseSepolia => Some(format!("https://base-sepolia.g.alchemy.com/v2/{}", key)),
        Network::ArbitrumSepolia => {
            Some(format!("https://arb-sepolia.g.alchemy.com/v2/{}", key))
        }
    }
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let alchemy_key = std::env::var(env_vars::ALCHEMY_API_KEY).ok();
        let mut urls = HashMap::new();

        for network in Network::ALL {
            if let Ok(url) = std::env::var(per_chain_var(network)) {
                tracing::debug!(network = %network, "Using {} for RPC", per_chain_var(network));
                urls.insert(network.chain_id(), url);
                continue;
            }

            if let Some(url) = alchemy_key
                .as_deref()
                .and_then(|key| alchemy_url(network, key))
            {
                tracing::debug!(network = %network, "Building RPC URL from ALCHEMY_API_KEY");
                urls.insert(network.chain_id(), url);
                continue;
            }

            if network != Network::Localhost {
                tracing::warn!(
                    network = %network,
                    "No RPC configured, using public RPC (rate limited)"
                );
            }
            urls.insert(network.chain_id(), public_rpc(network).to_string());
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
