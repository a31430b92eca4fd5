//! Token Inspection and Metadata Ports
//!
//! On-chain safety checks used by the admission guards, plus the metadata
//! lookup the detector runs for every accepted listing.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::candidate::TokenMetadata;

/// Errors from token inspection.
#[derive(Debug, Clone, Error)]
pub enum InspectError {
    /// Network or RPC hiccup; the candidate is dropped, not rejected.
    #[error("transient inspection failure: {0}")]
    Transient(String),

    /// The mint address itself is malformed.
    #[error("invalid mint address: {0}")]
    InvalidMint(String),

    /// Misconfiguration; propagates to the supervisor.
    #[error("fatal inspection failure: {0}")]
    Fatal(String),
}

/// Venue and mint-level checks behind the admission guards.
#[async_trait]
pub trait TokenInspector: Send + Sync {
    /// Estimated pool depth in USDC, probed with a quote of `probe_usdc`.
    async fn liquidity_depth_usdc(&self, mint: &str, probe_usdc: f64)
        -> Result<f64, InspectError>;

    /// Whether the mint has renounced both mint and freeze authority.
    async fn is_verified(&self, mint: &str) -> Result<bool, InspectError>;

    /// Whether the mint carries anti-bot style transfer restrictions
    /// (Token-2022 transfer hooks/fees, or an unknown owner program).
    async fn has_antibot(&self, mint: &str) -> Result<bool, InspectError>;
}

/// Errors from metadata resolution.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    #[error("metadata lookup failed: {0}")]
    Lookup(String),

    #[error("no metadata for mint: {0}")]
    NotFound(String),
}

/// Resolves name/symbol/decimals for a mint. Brand-new listings frequently
/// miss from every index, so callers fall back to placeholder metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn resolve(&self, mint: &str) -> Result<TokenMetadata, MetadataError>;
}
