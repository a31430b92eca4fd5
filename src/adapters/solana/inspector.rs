//! On-chain Token Inspection
//!
//! Implements the admission-guard checks against live chain state: pool
//! depth estimated from a probe quote, authority verification, and
//! Token-2022 transfer restriction detection.

use async_trait::async_trait;

use crate::adapters::jupiter::client::JupiterClient;
use crate::adapters::jupiter::quote::QuoteRequest;
use crate::adapters::solana::mint;
use crate::adapters::solana::rpc::{SolanaClient, SolanaClientError};
use crate::ports::gateway::GatewayError;
use crate::ports::inspector::{InspectError, TokenInspector};

/// Floor on the probe impact fraction, capping the depth estimate at
/// 10000x the probe size.
const MIN_IMPACT_FRACTION: f64 = 0.0001;

pub struct OnchainInspector {
    solana: SolanaClient,
    jupiter: JupiterClient,
    quote_mint: String,
    quote_decimals: u8,
    slippage_bps: u16,
}

impl OnchainInspector {
    pub fn new(
        solana: SolanaClient,
        jupiter: JupiterClient,
        quote_mint: String,
        quote_decimals: u8,
        slippage_bps: u16,
    ) -> Self {
        Self {
            solana,
            jupiter,
            quote_mint,
            quote_decimals,
            slippage_bps,
        }
    }

    async fn fetch_mint_account(
        &self,
        mint_address: &str,
    ) -> Result<solana_sdk::account::Account, InspectError> {
        self.solana
            .get_account(mint_address)
            .await
            .map_err(|err| match err {
                SolanaClientError::InvalidPublicKey(msg) => InspectError::InvalidMint(msg),
                other => InspectError::Transient(other.to_string()),
            })
    }
}

#[async_trait]
impl TokenInspector for OnchainInspector {
    /// Depth estimate from a probe quote: a pool that absorbs `probe_usdc`
    /// with impact fraction `f` holds roughly `probe / f` on the quote
    /// side. No route at all means no measurable depth.
    async fn liquidity_depth_usdc(
        &self,
        mint_address: &str,
        probe_usdc: f64,
    ) -> Result<f64, InspectError> {
        let probe_units =
            ((probe_usdc * 10f64.powi(self.quote_decimals as i32)) as u64).max(1);
        let request = QuoteRequest::new(
            self.quote_mint.clone(),
            mint_address.to_string(),
            probe_units,
            self.slippage_bps,
        );

        match self.jupiter.get_quote(&request).await {
            Ok(quote) => {
                let impact_fraction = (quote.price_impact() / 100.0).max(MIN_IMPACT_FRACTION);
                Ok(probe_usdc / impact_fraction)
            }
            Err(GatewayError::Rejected(_)) => Ok(0.0),
            Err(GatewayError::Transient(msg)) => Err(InspectError::Transient(msg)),
            Err(GatewayError::Fatal(msg)) => Err(InspectError::Fatal(msg)),
        }
    }

    /// Verified means nobody can mint more supply or freeze holders.
    async fn is_verified(&self, mint_address: &str) -> Result<bool, InspectError> {
        let account = self.fetch_mint_account(mint_address).await?;
        let authorities = mint::parse_authorities(&account.data)
            .map_err(|e| InspectError::InvalidMint(e.to_string()))?;
        Ok(authorities.renounced())
    }

    /// Anti-bot restrictions: an owner program we do not understand, or a
    /// Token-2022 mint carrying transfer-restricting extensions.
    async fn has_antibot(&self, mint_address: &str) -> Result<bool, InspectError> {
        let account = self.fetch_mint_account(mint_address).await?;

        if !mint::is_known_token_program(&account.owner) {
            return Ok(true);
        }
        if mint::is_token_2022(&account.owner) {
            return Ok(mint::has_restricted_extensions(&account.data));
        }
        Ok(false)
    }
}
