//! Execution Gateway Port
//!
//! The quote -> simulate -> execute -> price pipeline used for both entry
//! and exit. Errors carry the retry policy in the type: transient failures
//! may be retried, semantic rejections never are, fatal errors halt the
//! component that hit them.

use async_trait::async_trait;
use thiserror::Error;

/// Semantic reasons a swap is refused before submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwapRejection {
    #[error("no viable route")]
    NoRoute,

    #[error("price impact {pct:.2}% exceeds {max_pct:.2}% limit")]
    PriceImpact { pct: f64, max_pct: f64 },

    #[error("route uses disallowed venue: {venue}")]
    VenueNotAllowed { venue: String },

    #[error("insufficient funds for swap")]
    InsufficientFunds,

    #[error("slippage tolerance exceeded")]
    SlippageExceeded,

    #[error("simulation failed: {0}")]
    Simulation(String),
}

/// Gateway error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Network timeout, rate limit, 5xx, invalid price reading. Safe to
    /// retry on the next scheduled attempt.
    #[error("transient gateway failure: {0}")]
    Transient(String),

    /// The venue said no. Retrying will not change the answer.
    #[error("swap rejected: {0}")]
    Rejected(#[from] SwapRejection),

    /// Misconfiguration or authentication failure. Propagates to the
    /// supervisor; never degrades into silent retries.
    #[error("fatal gateway failure: {0}")]
    Fatal(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Rejected(_))
    }
}

/// A priced route returned by the aggregator, ready to simulate or execute.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    /// Input token mint
    pub input_mint: String,
    /// Output token mint
    pub output_mint: String,
    /// Input amount in base units
    pub in_amount: u64,
    /// Expected output amount in base units
    pub out_amount: u64,
    /// Price impact of this trade, in percent
    pub price_impact_pct: f64,
    /// Venue labels along the route (e.g. "Raydium")
    pub route: Vec<String>,
    /// Slippage tolerance the quote was priced with
    pub slippage_bps: u16,
    /// Full aggregator payload, passed back verbatim when building the swap
    pub raw: serde_json::Value,
}

impl SwapQuote {
    /// Semantic validation shared by every gateway implementation: route
    /// viability, venue filter, and the price-impact honeypot heuristic.
    pub fn validate(
        &self,
        max_impact_pct: f64,
        allowed_venues: &[String],
    ) -> Result<(), SwapRejection> {
        if self.route.is_empty() || self.out_amount == 0 {
            return Err(SwapRejection::NoRoute);
        }

        if !allowed_venues.is_empty() {
            if let Some(venue) = self
                .route
                .iter()
                .find(|label| !allowed_venues.iter().any(|v| v.eq_ignore_ascii_case(label)))
            {
                return Err(SwapRejection::VenueNotAllowed {
                    venue: venue.clone(),
                });
            }
        }

        if self.price_impact_pct >= max_impact_pct {
            return Err(SwapRejection::PriceImpact {
                pct: self.price_impact_pct,
                max_pct: max_impact_pct,
            });
        }

        Ok(())
    }
}

/// Pipeline to the swap aggregator, the wallet signer, and the price oracle.
///
/// Each operation is idempotent-safe to retry for transient failures only;
/// `execute` returns an irrevocable transaction signature and must never be
/// cancelled once in flight.
#[async_trait]
pub trait SwapGateway: Send + Sync {
    /// Price a swap of `amount` base units of `input_mint` into `output_mint`.
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, GatewayError>;

    /// Dry-run validation of a quote. `Err(Rejected(_))` is a final answer.
    async fn simulate(&self, quote: &SwapQuote) -> Result<(), GatewayError>;

    /// Sign and submit. Returns the transaction signature.
    async fn execute(
        &self,
        quote: &SwapQuote,
        priority_fee_lamports: u64,
    ) -> Result<String, GatewayError>;

    /// Current valuation of one whole token in USDC. A zero or negative
    /// reading surfaces as `Transient`, never as an actual price.
    async fn price(&self, mint: &str, decimals: u8) -> Result<f64, GatewayError>;

    /// Wallet balance of the quote asset, in whole USDC.
    async fn quote_balance_usdc(&self) -> Result<f64, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let transient = GatewayError::Transient("timeout".to_string());
        assert!(transient.is_transient());
        assert!(!transient.is_rejection());

        let rejected = GatewayError::Rejected(SwapRejection::NoRoute);
        assert!(rejected.is_rejection());
        assert!(!rejected.is_transient());

        let fatal = GatewayError::Fatal("bad credentials".to_string());
        assert!(!fatal.is_transient());
        assert!(!fatal.is_rejection());
    }

    #[test]
    fn test_rejection_messages() {
        let err = SwapRejection::PriceImpact {
            pct: 20.0,
            max_pct: 15.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("20.00%"));
        assert!(msg.contains("15.00%"));
    }

    fn quote_with_impact(impact_pct: f64) -> SwapQuote {
        SwapQuote {
            input_mint: "USDC".to_string(),
            output_mint: "TOKEN".to_string(),
            in_amount: 10_000_000,
            out_amount: 200_000_000,
            price_impact_pct: impact_pct,
            route: vec!["Raydium".to_string()],
            slippage_bps: 100,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_honeypot_impact_threshold() {
        // 20% impact rejected, 5% passes at the 15% default
        let high = quote_with_impact(20.0);
        assert!(matches!(
            high.validate(15.0, &[]),
            Err(SwapRejection::PriceImpact { .. })
        ));

        let low = quote_with_impact(5.0);
        assert!(low.validate(15.0, &[]).is_ok());

        // at-threshold is rejected
        let edge = quote_with_impact(15.0);
        assert!(edge.validate(15.0, &[]).is_err());
    }

    #[test]
    fn test_empty_route_is_no_route() {
        let mut q = quote_with_impact(1.0);
        q.route.clear();
        assert_eq!(q.validate(15.0, &[]), Err(SwapRejection::NoRoute));

        let mut q = quote_with_impact(1.0);
        q.out_amount = 0;
        assert_eq!(q.validate(15.0, &[]), Err(SwapRejection::NoRoute));
    }

    #[test]
    fn test_venue_filter() {
        let q = quote_with_impact(1.0);
        assert!(q.validate(15.0, &["raydium".to_string()]).is_ok());

        let denied = q.validate(15.0, &["Orca".to_string()]);
        assert!(matches!(
            denied,
            Err(SwapRejection::VenueNotAllowed { venue }) if venue == "Raydium"
        ));
    }
}
