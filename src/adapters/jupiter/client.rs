//! Jupiter API Client
//!
//! HTTP client for the Jupiter DEX aggregator. Handles quote fetching and
//! swap transaction building, with retry on rate limits and server errors.
//! Responses are classified into the gateway error taxonomy here so callers
//! never look at status codes.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::ports::gateway::{GatewayError, SwapRejection};

use super::quote::{QuoteRequest, QuoteResponse};
use super::swap::{SwapRequest, SwapResponse};

/// Jupiter API client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    /// Base URL for Jupiter API
    pub api_base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Number of retry attempts
    pub max_retries: u32,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Jupiter DEX aggregator client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

impl JupiterClient {
    pub fn new(config: JupiterConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Fatal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Get a quote for a token swap
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, GatewayError> {
        let url = format!("{}/quote", self.config.api_base_url);

        let mut req = self.http.get(&url).query(&[
            ("inputMint", &request.input_mint),
            ("outputMint", &request.output_mint),
            ("amount", &request.amount.to_string()),
            ("slippageBps", &request.slippage_bps.to_string()),
        ]);

        if request.only_direct_routes {
            req = req.query(&[("onlyDirectRoutes", "true")]);
        }

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self
            .execute_with_retry(|| async {
                req.try_clone()
                    .ok_or_else(|| GatewayError::Fatal("failed to clone request".into()))?
                    .send()
                    .await
                    .map_err(|e| GatewayError::Transient(e.to_string()))
            })
            .await?;

        self.handle_response(response).await
    }

    /// Build the swap transaction for a quote
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, GatewayError> {
        let url = format!("{}/swap", self.config.api_base_url);

        let mut req = self.http.post(&url).json(request);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self
            .execute_with_retry(|| async {
                req.try_clone()
                    .ok_or_else(|| GatewayError::Fatal("failed to clone request".into()))?
                    .send()
                    .await
                    .map_err(|e| GatewayError::Transient(e.to_string()))
            })
            .await?;

        self.handle_response(response).await
    }

    /// Execute request with retry logic and rate limit handling
    async fn execute_with_retry<F, Fut>(&self, request_fn: F) -> Result<reqwest::Response, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, GatewayError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match request_fn().await {
                Ok(response) => {
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1)); // 2s, 4s, 8s
                        warn!(
                            "rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            self.config.max_retries
                        );
                        last_error =
                            Some(GatewayError::Transient("rate limit exceeded".into()));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if response.status().is_server_error() {
                        last_error = Some(GatewayError::Transient(format!(
                            "server error: {}",
                            response.status()
                        )));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1)))
                            .await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) if err.is_transient() => {
                    last_error = Some(err);
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| GatewayError::Transient("max retries exceeded".into())))
    }

    /// Deserialize a response, mapping API failures to the error taxonomy.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(GatewayError::Fatal(format!(
                    "API credentials rejected ({}): {}",
                    status, error_text
                )));
            }

            // No viable route is the usual answer for a pool that just
            // rugged or never had the pair indexed yet.
            if error_text.contains("Could not find any route")
                || error_text.contains("COULD_NOT_FIND_ANY_ROUTE")
            {
                return Err(GatewayError::Rejected(SwapRejection::NoRoute));
            }

            if error_text.contains("SlippageToleranceExceeded") || error_text.contains("6001") {
                return Err(GatewayError::Rejected(SwapRejection::SlippageExceeded));
            }

            if error_text.contains("insufficient funds")
                || error_text.contains("InsufficientFunds")
            {
                return Err(GatewayError::Rejected(SwapRejection::InsufficientFunds));
            }

            return Err(GatewayError::Transient(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Transient(format!("failed to parse response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jupiter_config_default() {
        let config = JupiterConfig::default();
        assert_eq!(config.api_base_url, "https://api.jup.ag/swap/v1");
        assert!(config.api_key.is_none());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_jupiter_client_creation() {
        assert!(JupiterClient::new(JupiterConfig::default()).is_ok());
    }
}
