//! Action guardrails
//!
//! Every action call passes through this pipeline. Interceptors can block a
//! call before it runs and observe its outcome afterwards. They enforce
//! write pacing and fee budgets, and record an audit trail.

mod audit_log;
mod cooldown;
mod spend_limit;

pub use audit_log::AuditLogInterceptor;
pub use cooldown::CooldownInterceptor;
pub use spend_limit::SpendLimitInterceptor;

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// The call being intercepted
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    pub tool_name: String,
    /// Unique per invocation; ties start and completion audit entries together
    pub call_id: String,
    pub args: Value,
}

impl ToolCallContext {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: uuid::Uuid::new_v4().to_string(),
            args,
        }
    }

    /// Argument by key as text, read the way the actions read it: a JSON
    /// string (trimmed) or a bare number
    pub fn arg_text(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorDecision {
    Allow,
    Block(String),
}

#[async_trait]
pub trait ToolInterceptor: Send + Sync {
    /// Decide whether the call may proceed
    async fn intercept_tool_call(&self, context: &ToolCallContext) -> Result<InterceptorDecision>;

    /// Observe the outcome of a call that was allowed
    async fn on_tool_call_complete(
        &self,
        _context: &ToolCallContext,
        _result: &Result<Value>,
        _duration_ms: u64,
    ) {
    }
}

/// Ordered interceptor chain
#[derive(Default, Clone)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn ToolInterceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: impl ToolInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every interceptor in order; the first block wins
    pub async fn before(&self, context: &ToolCallContext) -> Result<()> {
        for interceptor in &self.interceptors {
            if let InterceptorDecision::Block(reason) =
                interceptor.intercept_tool_call(context).await?
            {
                tracing::warn!(
                    tool = %context.tool_name,
                    call_id = %context.call_id,
                    reason = %reason,
                    "Action blocked"
                );
                return Err(Error::Blocked(reason));
            }
        }
        Ok(())
    }

    pub async fn after(&self, context: &ToolCallContext, result: &Result<Value>, duration_ms: u64) {
        for interceptor in &self.interceptors {
            interceptor
                .on_tool_call_complete(context, result, duration_ms)
                .await;
        }
    }
}

impl std::fmt::Debug for InterceptorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorPipeline")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
