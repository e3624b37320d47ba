//! Spend limit interceptor
//!
//! Caps the entrance fees the agent attaches per UTC day. The fee a call
//! will attach is estimated with the same clamp policy the gateway applies
//! and reserved before the call runs, so concurrent calls cannot both fit
//! into the same remaining budget.

use super::{InterceptorDecision, ToolCallContext, ToolInterceptor};
use crate::market::units::{format_ether, parse_integer};
use crate::market::FeePolicy;
use crate::Result;
use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tracks daily spending
struct DailySpending {
    /// Total attached today (wei)
    total: U256,
    /// UTC date of the current tracking period
    date: NaiveDate,
    /// Number of paid calls today
    count: usize,
    /// Fees held for calls still in flight, by call id
    reserved: HashMap<String, U256>,
}

impl DailySpending {
    fn new(today: NaiveDate) -> Self {
        Self {
            total: U256::ZERO,
            date: today,
            count: 0,
            reserved: HashMap::new(),
        }
    }

    fn roll(&mut self, today: NaiveDate) {
        if today != self.date {
            // In-flight reservations carry over into the new day
            let reserved = std::mem::take(&mut self.reserved);
            *self = Self::new(today);
            self.reserved = reserved;
        }
    }

    fn add(&mut self, today: NaiveDate, amount: U256) {
        self.roll(today);
        self.total += amount;
        self.count += 1;
    }

    fn current_total(&mut self, today: NaiveDate) -> U256 {
        self.roll(today);
        self.total
    }

    fn reserved_total(&self) -> U256 {
        self.reserved.values().fold(U256::ZERO, |acc, v| acc + *v)
    }

    /// Hold `amount` for `call_id` if it fits under `limit`.
    ///
    /// Returns the committed and reserved totals seen at check time.
    fn try_reserve(
        &mut self,
        today: NaiveDate,
        call_id: &str,
        amount: U256,
        limit: U256,
    ) -> std::result::Result<(), (U256, U256)> {
        let committed = self.current_total(today);
        let reserved = self.reserved_total();
        if committed + reserved + amount > limit {
            return Err((committed, reserved));
        }
        self.reserved.insert(call_id.to_string(), amount);
        Ok(())
    }

    fn release(&mut self, call_id: &str) -> Option<U256> {
        self.reserved.remove(call_id)
    }
}

/// Interceptor that enforces a daily fee budget on a value-bearing action
pub struct SpendLimitInterceptor {
    action: &'static str,
    max_daily: U256,
    fees: FeePolicy,
    daily_spent: Arc<RwLock<DailySpending>>,
}

impl SpendLimitInterceptor {
    /// # Arguments
    /// * `action` - Name of the action that attaches value
    /// * `max_daily` - Maximum wei attached per UTC day
    /// * `fees` - Clamp policy used to predict the attached fee
    pub fn new(action: &'static str, max_daily: U256, fees: FeePolicy) -> Self {
        Self {
            action,
            max_daily,
            fees,
            daily_spent: Arc::new(RwLock::new(DailySpending::new(today()))),
        }
    }

    /// Fee the call will attach; `None` when the argument is malformed and
    /// the action itself will reject it
    fn estimate_fee(&self, context: &ToolCallContext) -> Option<U256> {
        let requested = context.arg_text("entranceFee");
        self.fees
            .resolve(requested.as_deref())
            .ok()
            .map(|c| c.effective)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[async_trait]
impl ToolInterceptor for SpendLimitInterceptor {
    async fn intercept_tool_call(&self, context: &ToolCallContext) -> Result<InterceptorDecision> {
        if context.tool_name != self.action {
            return Ok(InterceptorDecision::Allow);
        }

        let Some(fee) = self.estimate_fee(context) else {
            return Ok(InterceptorDecision::Allow);
        };

        let mut daily_spent = self.daily_spent.write().await;
        if let Err((committed, reserved)) =
            daily_spent.try_reserve(today(), &context.call_id, fee, self.max_daily)
        {
            return Ok(InterceptorDecision::Block(format!(
                "Entrance fee would exceed daily limit. Spent today: {} ETH, In flight: {} ETH, This call: {} ETH, Limit: {} ETH",
                format_ether(committed),
                format_ether(reserved),
                format_ether(fee),
                format_ether(self.max_daily)
            )));
        }

        tracing::debug!(
            fee_wei = %fee,
            daily_total_wei = %daily_spent.total,
            max_daily_wei = %self.max_daily,
            "Spend limit check passed; fee reserved"
        );

        Ok(InterceptorDecision::Allow)
    }

    async fn on_tool_call_complete(
        &self,
        context: &ToolCallContext,
        result: &Result<Value>,
        _duration_ms: u64,
    ) {
        if context.tool_name != self.action {
            return;
        }

        let mut daily_spent = self.daily_spent.write().await;
        let reserved = daily_spent.release(&context.call_id);

        let Ok(output) = result else {
            return;
        };

        // Prefer the value the gateway actually attached
        let attached = output
            .get("value")
            .and_then(|v| v.as_str())
            .and_then(|v| parse_integer(v, "value").ok())
            .or(reserved)
            .or_else(|| self.estimate_fee(context));

        if let Some(fee) = attached {
            daily_spent.add(today(), fee);
            tracing::info!(
                fee_wei = %fee,
                daily_total_wei = %daily_spent.total,
                paid_calls = daily_spent.count,
                "Updated daily fee tracker"
            );
        }
    }
}
