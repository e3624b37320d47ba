//! Action registry
//!
//! Owns the registered actions and the interceptor pipeline. Arguments
//! arrive as JSON, are checked against the action's input type, and the
//! outcome leaves as JSON: the action's result or an error payload that
//! says how far the call got.

use super::MarketAction;
use crate::interceptors::{InterceptorPipeline, ToolCallContext};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;

/// Type-erased view of a [`MarketAction`]
#[async_trait]
trait DynAction: Send + Sync {
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn call(&self, args: Value) -> Result<Value>;
}

struct Erased<A>(A);

#[async_trait]
impl<A: MarketAction> DynAction for Erased<A> {
    fn description(&self) -> &'static str {
        self.0.description()
    }

    fn input_schema(&self) -> Value {
        schemars::schema_for!(A::Input).into()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: A::Input = serde_json::from_value(args)
            .map_err(|e| Error::Validation(format!("Invalid arguments for {}: {}", A::NAME, e)))?;
        self.0.execute(input).await
    }
}

/// Published description of one action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Registered actions behind one interceptor pipeline
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, Box<dyn DynAction>>,
    pipeline: InterceptorPipeline,
}

impl ActionRegistry {
    pub fn new(pipeline: InterceptorPipeline) -> Self {
        Self {
            actions: BTreeMap::new(),
            pipeline,
        }
    }

    pub fn register<A: MarketAction>(&mut self, action: A) -> Result<()> {
        if self.actions.contains_key(A::NAME) {
            return Err(Error::Config(format!("Action {} registered twice", A::NAME)));
        }
        tracing::debug!(action = A::NAME, "Registered action");
        self.actions.insert(A::NAME, Box::new(Erased(action)));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.actions.keys().copied().collect()
    }

    /// Name, description and argument schema of every action
    pub fn list(&self) -> Vec<ActionDescriptor> {
        self.actions
            .iter()
            .map(|(name, action)| ActionDescriptor {
                name: *name,
                description: action.description(),
                input_schema: action.input_schema(),
            })
            .collect()
    }

    /// Run one action through the pipeline
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| Error::Validation(format!("Unknown action: {}", name)))?;

        let args = if args.is_null() { json!({}) } else { args };
        let context = ToolCallContext::new(name, args);

        if let Err(blocked) = self.pipeline.before(&context).await {
            let result = Err(blocked);
            self.pipeline.after(&context, &result, 0).await;
            return result;
        }

        let started = Instant::now();
        let result = action.call(context.args.clone()).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.pipeline.after(&context, &result, duration_ms).await;

        match &result {
            Ok(_) => tracing::info!(
                action = name,
                call_id = %context.call_id,
                duration_ms,
                "Action completed"
            ),
            Err(e) => tracing::warn!(
                action = name,
                call_id = %context.call_id,
                kind = e.kind(),
                reached_chain = e.reached_chain(),
                error = %e,
                "Action failed"
            ),
        }

        result
    }

    /// String in, string out. Failures become `{"error": {...}}`.
    pub async fn invoke_json(&self, name: &str, args: &str) -> String {
        let outcome = match parse_args(args) {
            Ok(args) => self.invoke(name, args).await,
            Err(e) => Err(e),
        };
        let body = match outcome {
            Ok(value) => value,
            Err(e) => json!({ "error": e.payload() }),
        };
        body.to_string()
    }
}

fn parse_args(args: &str) -> Result<Value> {
    if args.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(args)
        .map_err(|e| Error::Validation(format!("Arguments are not valid JSON: {}", e)))
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockChain, MockMarket, CONTRACT};
    use crate::chain::RetryPolicy;
    use crate::config::Config;
    use crate::contracts::{ContractName, Deployment};
    use crate::interceptors::{AuditLogInterceptor, CooldownInterceptor};
    use crate::market::MarketGateway;
    use crate::tools::{
        CreateMarketAction, ParticipateAction, ReadAgentBalanceAction, ReadMarketAction,
        SettleMarketAction, WithdrawBalancesAction, ACTION_PARTICIPATE, ACTION_READ_MARKET,
        ACTION_SETTLE_MARKET, WRITE_ACTIONS,
    };
    use alloy::primitives::U256;
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000;
    const DAY: u64 = 86_400;
    const MILLI_ETH: u64 = 1_000_000_000_000_000;

    fn gateway(mock: &MockChain) -> Arc<MarketGateway> {
        let mut config = Config::default();
        config.chain.read_retry = RetryPolicy {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        };
        let deployment = Deployment {
            name: ContractName::RektPredictionMarket,
            chain_id: 31337,
            address: CONTRACT,
        };
        Arc::new(MarketGateway::new(Arc::new(mock.clone()), deployment, &config).unwrap())
    }

    fn registry(mock: &MockChain, pipeline: InterceptorPipeline) -> ActionRegistry {
        let gateway = gateway(mock);
        let mut registry = ActionRegistry::new(pipeline);
        registry.register(ReadMarketAction::new(gateway.clone())).unwrap();
        registry.register(CreateMarketAction::new(gateway.clone())).unwrap();
        registry.register(ParticipateAction::new(gateway.clone())).unwrap();
        registry.register(SettleMarketAction::new(gateway.clone())).unwrap();
        registry.register(ReadAgentBalanceAction::new(gateway.clone())).unwrap();
        registry.register(WithdrawBalancesAction::new(gateway)).unwrap();
        registry
    }

    fn open_market(mock: &MockChain) -> u64 {
        mock.seed_market(MockMarket {
            start_time: NOW,
            deadline: NOW + 7 * DAY,
            entrance_fee: U256::from(MILLI_ETH),
            name: "ETH above 4k".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_lists_schemas_in_name_order() {
        let mock = MockChain::new(NOW);
        let registry = registry(&mock, InterceptorPipeline::new());

        let descriptors = registry.list();
        let names: Vec<_> = descriptors.iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(descriptors.len(), 6);

        let read = descriptors.iter().find(|s| s.name == ACTION_READ_MARKET).unwrap();
        assert!(read.input_schema["properties"].get("marketId").is_some());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mock = MockChain::new(NOW);
        let mut registry = registry(&mock, InterceptorPipeline::new());
        let err = registry
            .register(ReadMarketAction::new(gateway(&mock)))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_read_accepts_numeric_id() {
        let mock = MockChain::new(NOW);
        let id = open_market(&mock);
        let registry = registry(&mock, InterceptorPipeline::new());

        let snapshot = registry
            .invoke(ACTION_READ_MARKET, json!({ "marketId": id }))
            .await
            .unwrap();

        assert_eq!(snapshot["marketId"], id.to_string());
        assert_eq!(snapshot["phase"], "PREDICTION");
        assert_eq!(snapshot["entranceFee"], MILLI_ETH.to_string());
    }

    #[tokio::test]
    async fn test_bad_arguments_never_reach_chain() {
        let mock = MockChain::new(NOW);
        let registry = registry(&mock, InterceptorPipeline::new());

        let err = registry
            .invoke(ACTION_PARTICIPATE, json!({ "predictionPrice": "1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.read_count(), 0);

        let err = registry.invoke("placeBet", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_invoke_json_reports_error_payload() {
        let mock = MockChain::new(NOW);
        let id = open_market(&mock);
        let registry = registry(&mock, InterceptorPipeline::new());

        let args = json!({ "marketId": id.to_string(), "finalPrice": "6500000000000" });
        let out = registry
            .invoke_json(ACTION_SETTLE_MARKET, &args.to_string())
            .await;
        let out: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(out["error"]["kind"], "precondition_failed");
        assert_eq!(out["error"]["reachedChain"], false);
        assert!(mock.sent().is_empty());
        assert!(!mock.market(id).unwrap().settled);
    }

    #[tokio::test]
    async fn test_invoke_json_rejects_malformed_arguments() {
        let mock = MockChain::new(NOW);
        let registry = registry(&mock, InterceptorPipeline::new());

        let out = registry.invoke_json(ACTION_READ_MARKET, "{marketId:").await;
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["error"]["kind"], "validation_error");
    }

    #[tokio::test]
    async fn test_cooldown_keys_numeric_and_string_ids_alike() {
        let mock = MockChain::new(NOW);
        let first = open_market(&mock);
        let second = open_market(&mock);
        let pipeline =
            InterceptorPipeline::new().with(CooldownInterceptor::new(60, WRITE_ACTIONS.to_vec()));
        let registry = registry(&mock, pipeline);

        let price = "6500000000000";
        registry
            .invoke(ACTION_PARTICIPATE, json!({ "marketId": first, "predictionPrice": price }))
            .await
            .unwrap();

        // Another market is not held back by the first write
        let out = registry
            .invoke(ACTION_PARTICIPATE, json!({ "marketId": second, "predictionPrice": price }))
            .await
            .unwrap();
        assert_eq!(out["marketId"], second.to_string());

        // The same market spelled as a string is still cooling down
        let err = registry
            .invoke(
                ACTION_PARTICIPATE,
                json!({ "marketId": first.to_string(), "predictionPrice": price }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
        assert_eq!(mock.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_repeat_write_and_is_audited() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        let mock = MockChain::new(NOW);
        let id = open_market(&mock);
        let pipeline = InterceptorPipeline::new()
            .with(AuditLogInterceptor::new(&log_path))
            .with(CooldownInterceptor::new(60, WRITE_ACTIONS.to_vec()));
        let registry = registry(&mock, pipeline);

        let args = json!({ "marketId": id.to_string(), "predictionPrice": "6500000000000" });
        let first = registry.invoke(ACTION_PARTICIPATE, args.clone()).await.unwrap();
        assert_eq!(first["status"], "submitted");

        let err = registry.invoke(ACTION_PARTICIPATE, args).await.unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
        assert_eq!(mock.sent().len(), 1);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let entries: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3]["status"], "error");
        assert_eq!(entries[3]["error_kind"], "blocked");
    }
}
