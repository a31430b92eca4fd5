//! Trade Candidates
//!
//! A candidate is an immutable snapshot of a newly listed token as seen by
//! the listing detector, before any admission decision has been made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolved token metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token name (e.g., "Bonk")
    pub name: String,
    /// Token symbol (e.g., "BONK")
    pub symbol: String,
    /// Token decimals
    pub decimals: u8,
}

impl TokenMetadata {
    /// Fallback metadata when the resolver has nothing for a brand-new mint.
    /// Uses a truncated mint as the symbol so logs stay readable.
    pub fn placeholder(mint: &str) -> Self {
        let short: String = mint.chars().take(8).collect();
        Self {
            name: format!("Unknown ({})", short),
            symbol: short,
            decimals: 9,
        }
    }
}

/// A newly listed token emitted by the listing detector.
///
/// Immutable once created; the mint address is the unique external id and
/// the source signature identifies the pool-creation transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeCandidate {
    /// Token mint address (base58)
    pub mint: String,
    /// Resolved (or placeholder) metadata
    pub metadata: TokenMetadata,
    /// When the listing was detected
    pub detected_at: DateTime<Utc>,
    /// Signature of the pool-creation transaction
    pub source_signature: String,
}

impl TradeCandidate {
    pub fn new(mint: String, metadata: TokenMetadata, source_signature: String) -> Self {
        Self {
            mint,
            metadata,
            detected_at: Utc::now(),
            source_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_metadata() {
        let meta = TokenMetadata::placeholder("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
        assert_eq!(meta.symbol, "DezXAZ8z");
        assert!(meta.name.contains("DezXAZ8z"));
        assert_eq!(meta.decimals, 9);
    }

    #[test]
    fn test_candidate_new() {
        let meta = TokenMetadata {
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            decimals: 6,
        };
        let candidate = TradeCandidate::new("mint123".to_string(), meta, "sig456".to_string());
        assert_eq!(candidate.mint, "mint123");
        assert_eq!(candidate.source_signature, "sig456");
        assert!(candidate.detected_at <= Utc::now());
    }
}
