//! Cooldown interceptor
//!
//! Enforces a minimum time between writes against the same market, so an
//! agent loop cannot resubmit the same write before the first is mined.

use super::{InterceptorDecision, ToolCallContext, ToolInterceptor};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Key for writes not tied to a market (create, withdraw)
const NO_MARKET: &str = "-";

/// Interceptor that enforces cooldown between writes
pub struct CooldownInterceptor {
    cooldown_duration: Duration,
    /// Actions the cooldown applies to
    write_actions: Vec<&'static str>,
    /// Last successful write per (action, market id)
    last_write: Arc<RwLock<HashMap<(String, String), Instant>>>,
}

impl CooldownInterceptor {
    /// # Arguments
    /// * `cooldown_seconds` - Minimum seconds between writes on one market
    /// * `write_actions` - Action names that count as writes
    pub fn new(cooldown_seconds: u64, write_actions: Vec<&'static str>) -> Self {
        Self {
            cooldown_duration: Duration::from_secs(cooldown_seconds),
            write_actions,
            last_write: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn key(&self, context: &ToolCallContext) -> Option<(String, String)> {
        if !self.write_actions.contains(&context.tool_name.as_str()) {
            return None;
        }
        let market = context
            .arg_text("marketId")
            .unwrap_or_else(|| NO_MARKET.to_string());
        Some((context.tool_name.clone(), market))
    }
}

#[async_trait]
impl ToolInterceptor for CooldownInterceptor {
    async fn intercept_tool_call(&self, context: &ToolCallContext) -> Result<InterceptorDecision> {
        let Some(key) = self.key(context) else {
            return Ok(InterceptorDecision::Allow);
        };

        let last_write = self.last_write.read().await;
        if let Some(last) = last_write.get(&key) {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown_duration {
                let remaining = self.cooldown_duration - elapsed;
                return Ok(InterceptorDecision::Block(format!(
                    "{} on market {} is cooling down. Please wait {} more seconds.",
                    key.0,
                    key.1,
                    remaining.as_secs().max(1)
                )));
            }
        }

        tracing::debug!(
            tool = %key.0,
            market_id = %key.1,
            cooldown_seconds = self.cooldown_duration.as_secs(),
            "Cooldown check passed"
        );

        Ok(InterceptorDecision::Allow)
    }

    async fn on_tool_call_complete(
        &self,
        context: &ToolCallContext,
        result: &Result<Value>,
        _duration_ms: u64,
    ) {
        let Some(key) = self.key(context) else {
            return;
        };

        if result.is_ok() {
            tracing::debug!(tool = %key.0, market_id = %key.1, "Recorded write for cooldown");
            self.last_write.write().await.insert(key, Instant::now());
        }
    }
}
