//! Agent runner module
//!
//! Assembles the action surface from configuration: chain client, market
//! gateway, data feeds, guardrail pipeline and the action registry.

use crate::chain::{ChainClient, RpcChainClient};
use crate::config::{Config, RpcConfig};
use crate::contracts::{ContractName, ContractRegistry};
use crate::feeds::{self, ExchangeClient, SubgraphClient};
use crate::interceptors::{
    AuditLogInterceptor, CooldownInterceptor, InterceptorPipeline, SpendLimitInterceptor,
};
use crate::market::units::parse_ether;
use crate::market::{FeePolicy, MarketGateway};
use crate::tools::{
    ActionRegistry, CreateMarketAction, MarketCreatedHistoryAction, MarketDataAction,
    MarketSettledHistoryAction, ParticipateAction, ReadAgentBalanceAction, ReadMarketAction,
    SettleMarketAction, SignMessageAction, WithdrawBalancesAction, ACTION_PARTICIPATE,
    WRITE_ACTIONS,
};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::Address;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Agent runner that wires the action surface together
pub struct AgentRunner {
    config: Config,
    rpc: RpcConfig,
    wallet: Option<Arc<SecureWallet>>,
    contracts: ContractRegistry,
    exchange_api_key: Option<SecretString>,
}

impl AgentRunner {
    /// Create a new agent runner against the known deployments
    pub fn new(config: Config, rpc: RpcConfig) -> Self {
        Self {
            config,
            rpc,
            wallet: None,
            contracts: ContractRegistry::deployed(),
            exchange_api_key: None,
        }
    }

    /// Set the wallet for transaction signing
    pub fn with_wallet(mut self, wallet: SecureWallet) -> Self {
        self.wallet = Some(Arc::new(wallet));
        self
    }

    /// Override the deployment registry
    pub fn with_contracts(mut self, contracts: ContractRegistry) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn with_exchange_api_key(mut self, key: SecretString) -> Self {
        self.exchange_api_key = Some(key);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn can_write(&self) -> bool {
        self.wallet.is_some()
    }

    /// RPC client for the configured network.
    ///
    /// Without a wallet the client is read-only and reads are made on behalf
    /// of the zero address.
    pub fn chain_client(&self) -> Result<Arc<dyn ChainClient>> {
        let chain_id = self.config.network.chain_id();
        let timeout = Duration::from_millis(self.config.chain.request_timeout_ms);

        let client = match &self.wallet {
            Some(wallet) => RpcChainClient::with_wallet(&self.rpc, chain_id, wallet, timeout)?,
            None => {
                warn!("No wallet configured; write actions are disabled");
                RpcChainClient::read_only(&self.rpc, chain_id, Address::ZERO, timeout)?
            }
        };

        Ok(Arc::new(
            client.with_simulation(self.config.chain.simulate_writes),
        ))
    }

    /// Market gateway over the given chain client
    pub fn gateway(&self, chain: Arc<dyn ChainClient>) -> Result<Arc<MarketGateway>> {
        let deployment = self
            .contracts
            .get(chain.chain_id(), ContractName::RektPredictionMarket)?;
        info!(
            network = %self.config.network,
            contract = %deployment.address,
            "Using RektPredictionMarket deployment"
        );
        Ok(Arc::new(MarketGateway::new(chain, deployment, &self.config)?))
    }

    /// Guardrails from `config.guards`
    pub fn pipeline(&self) -> Result<InterceptorPipeline> {
        let guards = &self.config.guards;
        let mut pipeline = InterceptorPipeline::new();

        if let Some(path) = &guards.audit_log_path {
            info!(path = %path, "Audit logging enabled");
            pipeline = pipeline.with(AuditLogInterceptor::new(path));
        }

        pipeline = pipeline.with(CooldownInterceptor::new(
            guards.write_cooldown_seconds,
            WRITE_ACTIONS.to_vec(),
        ));

        let max_daily = parse_ether(&guards.max_daily_fees_eth).map_err(|e| {
            Error::Config(format!(
                "Invalid max_daily_fees_eth {:?}: {}",
                guards.max_daily_fees_eth, e
            ))
        })?;
        pipeline = pipeline.with(SpendLimitInterceptor::new(
            ACTION_PARTICIPATE,
            max_daily,
            FeePolicy::from_config(&self.config.market)?,
        ));

        info!(
            interceptors = pipeline.len(),
            cooldown_seconds = guards.write_cooldown_seconds,
            max_daily_fees_eth = %guards.max_daily_fees_eth,
            "Guardrail pipeline built"
        );
        Ok(pipeline)
    }

    /// Full action registry over the configured RPC endpoint
    pub fn build_registry(&self) -> Result<ActionRegistry> {
        let chain = self.chain_client()?;
        self.build_registry_with_chain(chain)
    }

    /// Full action registry over a caller-supplied chain client
    pub fn build_registry_with_chain(&self, chain: Arc<dyn ChainClient>) -> Result<ActionRegistry> {
        let gateway = self.gateway(chain)?;
        let http = feeds::http_client(&self.config.feeds)?;
        let mut registry = ActionRegistry::new(self.pipeline()?);

        registry.register(ReadMarketAction::new(gateway.clone()))?;
        registry.register(ReadAgentBalanceAction::new(gateway.clone()))?;

        if let Some(wallet) = &self.wallet {
            registry.register(CreateMarketAction::new(gateway.clone()))?;
            registry.register(ParticipateAction::new(gateway.clone()))?;
            registry.register(SettleMarketAction::new(gateway.clone()))?;
            registry.register(WithdrawBalancesAction::new(gateway))?;
            registry.register(SignMessageAction::new(wallet.clone()))?;
        }

        let exchange = ExchangeClient::new(
            http.clone(),
            self.config.feeds.exchange_base_url.clone(),
            self.exchange_api_key.clone(),
        );
        registry.register(MarketDataAction::new(Arc::new(exchange)))?;

        match SubgraphClient::for_network(http, &self.config.feeds, self.config.network) {
            Ok(subgraph) => {
                let subgraph = Arc::new(subgraph);
                registry.register(MarketCreatedHistoryAction::new(subgraph.clone()))?;
                registry.register(MarketSettledHistoryAction::new(subgraph))?;
            }
            Err(e) => warn!(error = %e, "Subgraph actions disabled"),
        }

        info!(
            network = %self.config.network,
            actions = ?registry.names(),
            "Action registry ready"
        );
        Ok(registry)
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("network", &self.config.network)
            .field("wallet", &self.wallet)
            .field("exchange_api_key", &self.exchange_api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
