//! Wallet Keypair Management
//!
//! Loads the signing keypair from a file in either the standard JSON byte
//! array format (`solana-keygen` output) or a raw base58 string.

use std::fs;
use std::path::Path;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to load keypair from file: {0}")]
    LoadError(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
}

/// Wallet manager for loading and signing with Solana keypairs
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load keypair from a file containing either a JSON byte array or a
    /// base58-encoded secret key
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::LoadError(format!("Failed to read file: {}", e)))?;
        let contents = contents.trim();

        if contents.starts_with('[') {
            let bytes: Vec<u8> = serde_json::from_str(contents)
                .map_err(|e| WalletError::LoadError(format!("Invalid JSON format: {}", e)))?;
            Self::from_bytes(&bytes)
        } else {
            let bytes = bs58::decode(contents)
                .into_vec()
                .map_err(|e| WalletError::LoadError(format!("Invalid base58: {}", e)))?;
            Self::from_bytes(&bytes)
        }
    }

    /// Load keypair from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair =
            Keypair::try_from(bytes).map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;

        Ok(Self { keypair })
    }

    /// Create a new random keypair (paper trading, tests)
    pub fn new_random() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    /// Get the public key as a string
    pub fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    /// Get the public key as Pubkey
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get keypair reference for transaction signing
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Export keypair as bytes (use with caution)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.keypair.to_bytes().to_vec()
    }
}
