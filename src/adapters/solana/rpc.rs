//! Solana RPC Client
//!
//! Async-compatible wrapper around the sync RPC client. Every call goes
//! through `spawn_blocking` so the runtime never stalls on the network.

use std::str::FromStr;
use std::sync::Arc;

use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
}

impl SolanaClient {
    /// Create a new Solana RPC client
    pub fn new(rpc_url: String, commitment: &str) -> Self {
        let commitment = match commitment {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        };
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self { client }
    }

    /// Fetch a raw account (owner program + data)
    pub async fn get_account(&self, pubkey: &str) -> Result<Account, SolanaClientError> {
        let pubkey = Pubkey::from_str(pubkey)
            .map_err(|e| SolanaClientError::InvalidPublicKey(e.to_string()))?;

        // Spawn blocking to make sync RPC call async-compatible
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_account(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Whole-token balance of `owner`'s holdings of `mint`. Returns 0 when
    /// the owner has no token account for the mint.
    pub async fn get_token_balance(
        &self,
        owner: &str,
        mint: &str,
    ) -> Result<f64, SolanaClientError> {
        let owner = Pubkey::from_str(owner)
            .map_err(|e| SolanaClientError::InvalidPublicKey(e.to_string()))?;
        let mint = Pubkey::from_str(mint)
            .map_err(|e| SolanaClientError::InvalidPublicKey(e.to_string()))?;

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let accounts = client
                .get_token_accounts_by_owner(&owner, TokenAccountsFilter::Mint(mint))
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?;

            let Some(keyed) = accounts.first() else {
                return Ok(0.0);
            };
            let token_account = Pubkey::from_str(&keyed.pubkey)
                .map_err(|e| SolanaClientError::InvalidPublicKey(e.to_string()))?;

            client
                .get_token_account_balance(&token_account)
                .map(|balance| balance.ui_amount.unwrap_or(0.0))
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Submit a signed versioned transaction to the network
    pub async fn send_versioned_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<String, SolanaClientError> {
        let tx = transaction.clone();
        let client = Arc::clone(&self.client);

        tokio::task::spawn_blocking(move || {
            client
                .send_transaction(&tx)
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SolanaClient::new(
            "https://api.devnet.solana.com".to_string(),
            "confirmed",
        );
        assert!(std::mem::size_of_val(&client) > 0);
    }

    #[tokio::test]
    async fn test_invalid_pubkey_rejected_locally() {
        let client = SolanaClient::new(
            "https://api.devnet.solana.com".to_string(),
            "confirmed",
        );
        assert!(matches!(
            client.get_account("not-a-pubkey").await,
            Err(SolanaClientError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = SolanaClientError::RpcError("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));
    }
}
