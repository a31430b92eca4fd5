//! Jupiter Quote Types
//!
//! Request and response structures for the Jupiter quote API.

use serde::{Deserialize, Serialize};

/// Request parameters for getting a swap quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Input token mint address
    pub input_mint: String,
    /// Output token mint address
    pub output_mint: String,
    /// Amount in base units
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
    /// Only use direct routes (no intermediate tokens)
    #[serde(default)]
    pub only_direct_routes: bool,
}

impl QuoteRequest {
    pub fn new(input_mint: String, output_mint: String, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            only_direct_routes: false,
        }
    }

    /// Restrict routing to direct pools. Brand-new listings only have the
    /// one pool anyway, and direct routes fail faster when it is gone.
    pub fn with_direct_routes(mut self, direct: bool) -> Self {
        self.only_direct_routes = direct;
        self
    }
}

/// Response from the Jupiter quote API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// Input token mint address
    pub input_mint: String,
    /// Output token mint address
    pub output_mint: String,
    /// Input amount in base units
    pub in_amount: String,
    /// Output amount in base units
    pub out_amount: String,
    /// Minimum output amount after slippage (otherAmountThreshold)
    pub other_amount_threshold: String,
    /// Swap mode (ExactIn or ExactOut)
    pub swap_mode: String,
    /// Slippage in basis points
    pub slippage_bps: u16,
    /// Price impact percentage (as string)
    #[serde(default)]
    pub price_impact_pct: String,
    /// Route plan with swap details
    pub route_plan: Vec<RoutePlanStep>,
    /// Context slot for the quote
    #[serde(default)]
    pub context_slot: Option<u64>,
    /// Catch-all for any additional fields from the API; the full payload
    /// goes back verbatim to the swap endpoint
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl QuoteResponse {
    /// Get input amount as u64
    pub fn input_amount(&self) -> u64 {
        self.in_amount.parse().unwrap_or(0)
    }

    /// Get output amount as u64
    pub fn output_amount(&self) -> u64 {
        self.out_amount.parse().unwrap_or(0)
    }

    /// Get price impact as f64 percentage
    pub fn price_impact(&self) -> f64 {
        self.price_impact_pct.parse().unwrap_or(0.0)
    }

    /// Venue labels along the route, in hop order
    pub fn route_labels(&self) -> Vec<String> {
        self.route_plan
            .iter()
            .map(|step| step.swap_info.label.clone())
            .collect()
    }
}

/// A step in the route plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    /// Swap information for this step
    pub swap_info: SwapInfo,
    /// Percentage of the trade going through this route
    pub percent: u8,
}

/// Information about a single swap in the route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    /// AMM key (pool identifier)
    pub amm_key: String,
    /// Label for the DEX (e.g., "Raydium", "Orca")
    pub label: String,
    /// Input mint for this hop
    pub input_mint: String,
    /// Output mint for this hop
    pub output_mint: String,
    /// Input amount for this hop
    pub in_amount: String,
    /// Output amount for this hop
    pub out_amount: String,
    /// Fee amount charged (not always returned)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<String>,
    /// Fee mint token (not always returned)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_mint: Option<String>,
}
