//! Configuration for the prediction market agent

pub mod rpc;

use crate::chain::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Environment variable selecting the network
pub const NETWORK_ID_ENV: &str = "NETWORK_ID";

/// Environment variable holding the agent's private key
pub const AGENT_PRIVATE_KEY_ENV: &str = "AGENT_PRIVATE_KEY";

/// Environment variable holding the exchange market-data API key
pub const MARKET_DATA_API_KEY_ENV: &str = "MARKET_DATA_API_KEY";

/// Supported networks, each with its own contract deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Local anvil node
    Localhost,
    #[default]
    BaseSepolia,
    ArbitrumSepolia,
}

impl Network {
    pub const ALL: [Network; 3] = [
        Network::Localhost,
        Network::BaseSepolia,
        Network::ArbitrumSepolia,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Localhost => 31337,
            Network::BaseSepolia => 84532,
            Network::ArbitrumSepolia => 421614,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Localhost => "localhost",
            Network::BaseSepolia => "base-sepolia",
            Network::ArbitrumSepolia => "arbitrum-sepolia",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "localhost" | "anvil" | "31337" => Ok(Network::Localhost),
            "base-sepolia" | "84532" => Ok(Network::BaseSepolia),
            "arbitrum-sepolia" | "421614" => Ok(Network::ArbitrumSepolia),
            other => Err(Error::Config(format!(
                "Unknown network: {}. Supported: localhost, base-sepolia, arbitrum-sepolia",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the reader obtains a market's phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseSource {
    /// Ask the contract via `getMarketPhase`
    #[default]
    Contract,
    /// Derive from the latest block timestamp and the market's deadline
    Local,
}

/// Which aux tag value marks an agent-originated entry.
///
/// Deployed revisions disagree on this; confirm against the contract before
/// switching the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiMarker {
    #[default]
    ZeroIsAgent,
    NonZeroIsAgent,
}

/// Market parameter policy (clamping rules)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPolicyConfig {
    /// Lowest accepted entrance fee, in ETH
    pub min_fee_eth: String,
    /// Highest accepted entrance fee, in ETH
    pub max_fee_eth: String,
    /// Fee substituted for out-of-range or omitted values, in ETH
    pub default_fee_eth: String,
    /// Shortest accepted market duration, in days
    pub min_deadline_days: i64,
    /// Longest accepted market duration, in days
    pub max_deadline_days: i64,
    /// Duration substituted for out-of-range or omitted values
    pub default_deadline_days: i64,
    #[serde(default)]
    pub phase_source: PhaseSource,
    #[serde(default)]
    pub ai_marker: AiMarker,
}

impl Default for MarketPolicyConfig {
    fn default() -> Self {
        Self {
            min_fee_eth: "0.001".to_string(),
            max_fee_eth: "0.005".to_string(),
            default_fee_eth: "0.001".to_string(),
            min_deadline_days: 3,
            max_deadline_days: 30,
            default_deadline_days: 7,
            phase_source: PhaseSource::Contract,
            ai_marker: AiMarker::ZeroIsAgent,
        }
    }
}

/// Chain access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Per-request timeout for RPC calls (milliseconds)
    pub request_timeout_ms: u64,
    /// How long to wait for a receipt when confirmation is requested
    pub confirmation_timeout_ms: u64,
    /// Simulate writes with `eth_call` before broadcasting
    pub simulate_writes: bool,
    /// Retry policy for idempotent reads
    #[serde(default)]
    pub read_retry: RetryPolicy,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
            confirmation_timeout_ms: 120_000,
            simulate_writes: true,
            read_retry: RetryPolicy::default(),
        }
    }
}

/// Off-chain data source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Exchange REST base URL (klines endpoint lives under it)
    pub exchange_base_url: String,
    /// Subgraph endpoint per network
    pub subgraph_urls: HashMap<Network, String>,
    /// HTTP timeout for feed requests (milliseconds)
    pub timeout_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        let mut subgraph_urls = HashMap::new();
        subgraph_urls.insert(
            Network::ArbitrumSepolia,
            "https://api.studio.thegraph.com/query/62788/rekt-ai-subgraph/version/latest"
                .to_string(),
        );
        subgraph_urls.insert(
            Network::BaseSepolia,
            "https://api.studio.thegraph.com/query/62788/rekt-ai-subgraph-base/version/latest"
                .to_string(),
        );

        Self {
            exchange_base_url: "https://api.binance.com".to_string(),
            subgraph_urls,
            timeout_ms: 10_000,
        }
    }
}

/// Guardrails applied to every action call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardSettings {
    /// Minimum seconds between writes against the same market
    pub write_cooldown_seconds: u64,
    /// Maximum entrance fees paid per UTC day, in ETH
    pub max_daily_fees_eth: String,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            write_cooldown_seconds: 30,
            max_daily_fees_eth: "0.05".to_string(),
            audit_log_path: Some("audit.jsonl".to_string()),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Network the agent operates on
    #[serde(default)]
    pub network: Network,
    /// Market parameter policy
    #[serde(default)]
    pub market: MarketPolicyConfig,
    /// Chain access settings
    #[serde(default)]
    pub chain: ChainSettings,
    /// Off-chain data sources
    #[serde(default)]
    pub feeds: FeedSettings,
    /// Action guardrails
    #[serde(default)]
    pub guards: GuardSettings,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply `NETWORK_ID` from the environment, if set.
    ///
    /// Only the binary entry point calls this; everything below it receives
    /// the resolved network through `Config`.
    pub fn apply_network_env(&mut self) -> Result<()> {
        match std::env::var(NETWORK_ID_ENV) {
            Ok(id) => {
                self.network = id.parse()?;
                tracing::debug!(network = %self.network, "Network selected from NETWORK_ID");
            }
            Err(_) => {
                tracing::warn!(
                    network = %self.network,
                    "NETWORK_ID not set, using configured network"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_parses_known_ids() {
        assert_eq!(
            "base-sepolia".parse::<Network>().unwrap(),
            Network::BaseSepolia
        );
        assert_eq!(
            "ARBITRUM-SEPOLIA".parse::<Network>().unwrap(),
            Network::ArbitrumSepolia
        );
        assert_eq!("31337".parse::<Network>().unwrap(), Network::Localhost);
        assert!(matches!(
            "base-mainnet".parse::<Network>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn network_chain_ids_round_trip() {
        for network in Network::ALL {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(Network::from_chain_id(1), None);
    }

    #[test]
    fn config_deserialize_defaults() {
        let parsed: Config = serde_json::from_value(serde_json::json!({})).expect("parse config");
        assert_eq!(parsed.network, Network::BaseSepolia);
        assert_eq!(parsed.market.min_deadline_days, 3);
        assert_eq!(parsed.market.phase_source, PhaseSource::Contract);
        assert_eq!(parsed.market.ai_marker, AiMarker::ZeroIsAgent);
        assert!(parsed.chain.simulate_writes);
    }

    #[test]
    fn config_deserialize_explicit() {
        let value = serde_json::json!({
            "network": "arbitrum-sepolia",
            "market": {
                "min_fee_eth": "0.002",
                "max_fee_eth": "0.004",
                "default_fee_eth": "0.002",
                "min_deadline_days": 1,
                "max_deadline_days": 10,
                "default_deadline_days": 5,
                "phase_source": "local",
                "ai_marker": "non_zero_is_agent"
            },
            "guards": {
                "write_cooldown_seconds": 0,
                "max_daily_fees_eth": "1",
                "audit_log_path": null
            }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::ArbitrumSepolia);
        assert_eq!(parsed.market.phase_source, PhaseSource::Local);
        assert_eq!(parsed.market.ai_marker, AiMarker::NonZeroIsAgent);
        assert_eq!(parsed.guards.write_cooldown_seconds, 0);
        assert!(parsed.guards.audit_log_path.is_none());
    }

    #[test]
    fn default_feeds_cover_testnets() {
        let feeds = FeedSettings::default();
        assert!(feeds.subgraph_urls.contains_key(&Network::BaseSepolia));
        assert!(feeds.subgraph_urls.contains_key(&Network::ArbitrumSepolia));
        assert!(!feeds.subgraph_urls.contains_key(&Network::Localhost));
    }
}
