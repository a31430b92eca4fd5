//! Jupiter Swap Types
//!
//! Request and response structures for the Jupiter swap API, which turns a
//! quote into a signable serialized transaction.

use serde::{Deserialize, Serialize};

/// Request parameters for building a swap transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    /// User's public key (wallet address)
    pub user_public_key: String,
    /// The full quote response from the quote endpoint
    pub quote_response: serde_json::Value,
    /// Optional prioritization fee in lamports for faster inclusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritization_fee_lamports: Option<u64>,
    /// Whether to use dynamic compute unit limit calculation
    pub dynamic_compute_unit_limit: bool,
}

impl SwapRequest {
    pub fn new(user_public_key: String, quote_response: serde_json::Value) -> Self {
        Self {
            user_public_key,
            quote_response,
            prioritization_fee_lamports: None,
            dynamic_compute_unit_limit: true,
        }
    }

    /// Set prioritization fee for faster transaction inclusion
    pub fn with_priority_fee(mut self, lamports: u64) -> Self {
        self.prioritization_fee_lamports = Some(lamports);
        self
    }
}

/// Response from the Jupiter swap API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 encoded serialized transaction ready to sign and send
    pub swap_transaction: String,
    /// Last valid block height for this transaction
    pub last_valid_block_height: u64,
    /// Prioritization fee applied (in lamports)
    #[serde(default)]
    pub prioritization_fee_lamports: u64,
}

impl SwapResponse {
    /// Get the transaction bytes from base64
    pub fn transaction_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.swap_transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_request_serialization() {
        let quote = serde_json::json!({"inAmount": "1000"});
        let req = SwapRequest::new("wallet123".to_string(), quote).with_priority_fee(5000);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["userPublicKey"], "wallet123");
        assert_eq!(json["prioritizationFeeLamports"], 5000);
        assert_eq!(json["dynamicComputeUnitLimit"], true);
        assert_eq!(json["quoteResponse"]["inAmount"], "1000");
    }

    #[test]
    fn test_swap_request_omits_missing_fee() {
        let req = SwapRequest::new("wallet123".to_string(), serde_json::json!({}));
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("prioritizationFeeLamports").is_none());
    }

    #[test]
    fn test_swap_response_parsing() {
        let json = r#"{
            "swapTransaction": "AQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=",
            "lastValidBlockHeight": 123456789,
            "prioritizationFeeLamports": 5000
        }"#;

        let response: SwapResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.last_valid_block_height, 123456789);
        assert_eq!(response.prioritization_fee_lamports, 5000);
        assert!(response.transaction_bytes().is_ok());
    }

    #[test]
    fn test_transaction_bytes_rejects_bad_base64() {
        let response = SwapResponse {
            swap_transaction: "!!!not base64!!!".to_string(),
            last_valid_block_height: 0,
            prioritization_fee_lamports: 0,
        };
        assert!(response.transaction_bytes().is_err());
    }
}
