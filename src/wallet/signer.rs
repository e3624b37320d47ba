//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys are held in alloy's PrivateKeySigner which handles crypto securely
//! - Keys are never serialized to JSON
//! - Keys are never logged

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::{eip191_hash_message, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, SignerSync};

/// Secure wallet that protects private keys
///
/// The private key is:
/// - Stored in alloy's PrivateKeySigner (handles crypto securely)
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations
pub struct SecureWallet {
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create a wallet from an environment variable
    ///
    /// # Security
    /// The environment variable should contain a hex-encoded private key.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::Wallet(format!(
                "Environment variable {} not set. Required for wallet initialization.",
                var_name
            ))
        })?;

        Self::from_hex(&key_hex)
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());

        Ok(Self {
            signer,
            address,
            wallet,
        })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    ///
    /// This is safe because EthereumWallet only exposes signing operations,
    /// not the raw private key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }

    /// Sign a 32-byte hash
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }

    /// Sign a message with the EIP-191 personal-message prefix.
    ///
    /// Returns the prefixed message hash alongside the signature.
    pub fn sign_message(&self, message: &[u8]) -> Result<(B256, Signature)> {
        let hash = eip191_hash_message(message);
        Ok((hash, self.sign_hash(&hash)?))
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // anvil account 0 (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_key_is_wallet_error() {
        let err = SecureWallet::from_hex("0x1234").unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_sign_message_recovers_signer() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let (hash, signature) = wallet.sign_message(b"hello rekt").unwrap();
        assert_eq!(hash, eip191_hash_message(b"hello rekt"));
        let recovered = signature.recover_address_from_prehash(&hash).unwrap();
        assert_eq!(recovered, wallet.address());
    }
}
