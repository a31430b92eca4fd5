//! Jupiter Token Metadata Lookup
//!
//! Resolves name/symbol/decimals for a mint from Jupiter's Token API.
//! Brand-new listings are usually not indexed yet, so `NotFound` here is
//! the common case and callers fall back to placeholder metadata.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use async_trait::async_trait;

use crate::domain::candidate::TokenMetadata;
use crate::ports::inspector::{MetadataError, MetadataSource};

/// Configuration for the token metadata fetcher
#[derive(Debug, Clone)]
pub struct TokenApiConfig {
    /// Base URL for the Token API
    pub api_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TokenApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://lite-api.jup.ag/tokens/v2".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Token information from the Jupiter Token API
#[derive(Debug, Clone, Deserialize)]
struct TokenApiEntry {
    name: String,
    symbol: String,
    decimals: u8,
}

pub struct JupiterMetadata {
    config: TokenApiConfig,
    http: Client,
}

impl JupiterMetadata {
    pub fn new(config: TokenApiConfig) -> Result<Self, MetadataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetadataError::Lookup(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl MetadataSource for JupiterMetadata {
    async fn resolve(&self, mint: &str) -> Result<TokenMetadata, MetadataError> {
        let url = format!("{}/search?query={}", self.config.api_url, mint);

        let mut req = self.http.get(&url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| MetadataError::Lookup(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound(mint.to_string()));
        }
        if !response.status().is_success() {
            return Err(MetadataError::Lookup(format!(
                "token API returned {}",
                response.status()
            )));
        }

        let entries: Vec<TokenApiEntry> = response
            .json()
            .await
            .map_err(|e| MetadataError::Lookup(format!("failed to parse response: {}", e)))?;

        entries
            .into_iter()
            .next()
            .map(|entry| TokenMetadata {
                name: entry.name,
                symbol: entry.symbol,
                decimals: entry.decimals,
            })
            .ok_or_else(|| MetadataError::NotFound(mint.to_string()))
    }
}
