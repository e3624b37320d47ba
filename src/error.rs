//! Error types for the prediction market agent
//!
//! Every failure is classified by how far the call got: rejected locally,
//! lost in transport, or evaluated by the chain and reverted. Callers pick a
//! recovery strategy from that classification.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Market {0} not found")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Chain read failed: {0}")]
    ChainRead(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Transaction not submitted: {0}")]
    WriteNotSubmitted(String),

    #[error("Transaction submission outcome unknown: {0}")]
    SubmissionUnknown(String),

    #[error("Transaction reverted ({stage}): {reason}")]
    Reverted { stage: RevertStage, reason: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Data feed error: {0}")]
    Feed(String),

    #[error("Action blocked: {0}")]
    Blocked(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a revert was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertStage {
    /// `eth_call` pre-flight; nothing was broadcast
    Simulation,
    /// Mined transaction with a failed status
    Execution,
}

impl std::fmt::Display for RevertStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevertStage::Simulation => write!(f, "simulation"),
            RevertStage::Execution => write!(f, "execution"),
        }
    }
}

/// Revert reasons the contract raises when a concurrent caller got there first
const DUPLICATE_MARKERS: &[&str] = &[
    "already settled",
    "already participated",
    "already predicted",
    "already joined",
];

impl Error {
    /// Short machine-readable tag for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Precondition(_) => "precondition_failed",
            Error::ChainRead(_) => "chain_read_error",
            Error::Timeout(_) => "timeout",
            Error::WriteNotSubmitted(_) => "write_not_submitted",
            Error::SubmissionUnknown(_) => "submission_unknown",
            Error::Reverted { .. } => "reverted",
            Error::Wallet(_) => "wallet_error",
            Error::Feed(_) => "feed_error",
            Error::Blocked(_) => "blocked",
            Error::Network(_) => "network_error",
            Error::Json(_) => "json_error",
            Error::Io(_) => "io_error",
        }
    }

    /// Whether the chain evaluated the call and rejected it.
    ///
    /// A simulated revert counts: the node ran the call against current
    /// state, even though no transaction was broadcast.
    pub fn reached_chain(&self) -> bool {
        matches!(self, Error::Reverted { .. })
    }

    /// Whether gas may have been spent on this failure
    pub fn consumed_gas(&self) -> bool {
        matches!(
            self,
            Error::Reverted {
                stage: RevertStage::Execution,
                ..
            }
        )
    }

    /// Safe to retry without re-evaluating state. Only reads qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ChainRead(_) | Error::Timeout(_))
    }

    /// A revert caused by a racing caller (already settled / already participated)
    pub fn is_duplicate_submission(&self) -> bool {
        match self {
            Error::Reverted { reason, .. } => {
                let reason = reason.to_lowercase();
                DUPLICATE_MARKERS.iter().any(|m| reason.contains(m))
            }
            _ => false,
        }
    }

    /// Payload returned to the action caller in place of a result
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            reached_chain: self.reached_chain(),
            consumed_gas: self.consumed_gas(),
            retryable: self.is_retryable(),
            duplicate_submission: self.is_duplicate_submission(),
        }
    }
}

/// Serialized error shape at the action boundary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
    pub reached_chain: bool,
    pub consumed_gas: bool,
    pub retryable: bool,
    pub duplicate_submission: bool,
}

pub type Result<T> = std::result::Result<T, Error>;
