//! Secure wallet management
//!
//! This module handles private key storage and signing.
//! The private key NEVER leaves this module.

mod signer;

pub use signer::SecureWallet;
