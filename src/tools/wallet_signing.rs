//! Message signing action.
//!
//! SECURITY NOTE:
//! - Uses SecureWallet signing only; no private key exposure.
//! - Returns signatures and hashes, never raw key material.

use super::{MarketAction, ACTION_SIGN_MESSAGE};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::hex;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SignMessageInput {
    /// UTF-8 message to sign
    pub message: String,
}

pub struct SignMessageAction {
    wallet: Arc<SecureWallet>,
}

impl SignMessageAction {
    pub fn new(wallet: Arc<SecureWallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl MarketAction for SignMessageAction {
    const NAME: &'static str = ACTION_SIGN_MESSAGE;
    type Input = SignMessageInput;

    fn description(&self) -> &'static str {
        "Sign a message with the agent wallet (EIP-191). Returns the signature and message hash."
    }

    async fn execute(&self, input: Self::Input) -> Result<Value> {
        if input.message.is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }

        let (hash, signature) = self.wallet.sign_message(input.message.as_bytes())?;

        Ok(json!({
            "address": self.wallet.address_string(),
            "messageHash": hash.to_string(),
            "signature": hex::encode_prefixed(signature.as_bytes())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Signature;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_signature_recovers_agent_address() {
        let wallet = Arc::new(SecureWallet::from_hex(TEST_KEY).unwrap());
        let action = SignMessageAction::new(wallet.clone());

        let out = action
            .execute(SignMessageInput {
                message: "gm".to_string(),
            })
            .await
            .unwrap();

        let bytes = hex::decode(out["signature"].as_str().unwrap()).unwrap();
        let signature = Signature::try_from(bytes.as_slice()).unwrap();
        let recovered = signature.recover_address_from_msg("gm").unwrap();
        assert_eq!(recovered, wallet.address());
        assert_eq!(out["address"], wallet.address_string());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let wallet = Arc::new(SecureWallet::from_hex(TEST_KEY).unwrap());
        let err = SignMessageAction::new(wallet)
            .execute(SignMessageInput {
                message: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
