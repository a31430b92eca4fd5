//! Jupiter Swap Gateway
//!
//! Wires the aggregator client, the wallet, and the RPC client into the
//! quote -> simulate -> execute -> price pipeline. Simulation is semantic
//! validation against the live risk parameters; execution builds the swap
//! transaction, re-signs it with the local keypair, and submits it.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::transaction::VersionedTransaction;
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::solana::rpc::{SolanaClient, SolanaClientError};
use crate::adapters::solana::wallet::WalletManager;
use crate::domain::risk::RiskConfig;
use crate::ports::gateway::{GatewayError, SwapGateway, SwapQuote, SwapRejection};

use super::client::JupiterClient;
use super::quote::QuoteRequest;
use super::swap::SwapRequest;

pub struct JupiterGateway {
    client: JupiterClient,
    solana: SolanaClient,
    wallet: Arc<WalletManager>,
    /// Live risk parameters, shared with the engine so hot reloads apply
    /// to validation too.
    risk: Arc<RwLock<RiskConfig>>,
    quote_mint: String,
    quote_decimals: u8,
}

impl JupiterGateway {
    pub fn new(
        client: JupiterClient,
        solana: SolanaClient,
        wallet: Arc<WalletManager>,
        risk: Arc<RwLock<RiskConfig>>,
        quote_mint: String,
        quote_decimals: u8,
    ) -> Self {
        Self {
            client,
            solana,
            wallet,
            risk,
            quote_mint,
            quote_decimals,
        }
    }

    fn map_send_error(err: SolanaClientError) -> GatewayError {
        let msg = err.to_string();
        if msg.contains("insufficient funds") || msg.contains("insufficient lamports") {
            return GatewayError::Rejected(SwapRejection::InsufficientFunds);
        }
        if msg.contains("SlippageToleranceExceeded") || msg.contains("6001") {
            return GatewayError::Rejected(SwapRejection::SlippageExceeded);
        }
        GatewayError::Transient(msg)
    }
}

#[async_trait]
impl SwapGateway for JupiterGateway {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, GatewayError> {
        let request = QuoteRequest::new(
            input_mint.to_string(),
            output_mint.to_string(),
            amount,
            slippage_bps,
        );
        let response = self.client.get_quote(&request).await?;

        let raw = serde_json::to_value(&response)
            .map_err(|e| GatewayError::Transient(format!("quote serialization: {}", e)))?;

        Ok(SwapQuote {
            input_mint: response.input_mint.clone(),
            output_mint: response.output_mint.clone(),
            in_amount: response.input_amount(),
            out_amount: response.output_amount(),
            price_impact_pct: response.price_impact(),
            route: response.route_labels(),
            slippage_bps: response.slippage_bps,
            raw,
        })
    }

    async fn simulate(&self, quote: &SwapQuote) -> Result<(), GatewayError> {
        let risk = self.risk.read().await;
        quote
            .validate(risk.max_price_impact_pct, &risk.allowed_venues)
            .map_err(GatewayError::Rejected)
    }

    async fn execute(
        &self,
        quote: &SwapQuote,
        priority_fee_lamports: u64,
    ) -> Result<String, GatewayError> {
        let request = SwapRequest::new(self.wallet.public_key(), quote.raw.clone())
            .with_priority_fee(priority_fee_lamports);

        let swap = self.client.get_swap_transaction(&request).await?;
        let bytes = swap
            .transaction_bytes()
            .map_err(|e| GatewayError::Transient(format!("transaction decode: {}", e)))?;

        let unsigned: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| GatewayError::Transient(format!("transaction deserialize: {}", e)))?;

        let signed =
            VersionedTransaction::try_new(unsigned.message, &[self.wallet.keypair()])
                .map_err(|e| GatewayError::Fatal(format!("transaction signing: {}", e)))?;

        let signature = self
            .solana
            .send_versioned_transaction(&signed)
            .await
            .map_err(Self::map_send_error)?;

        debug!(
            input = %quote.input_mint,
            output = %quote.output_mint,
            amount = quote.in_amount,
            %signature,
            "swap submitted"
        );
        Ok(signature)
    }

    /// Value of one whole token in USDC, derived from a quote for a
    /// single-token swap.
    async fn price(&self, mint: &str, decimals: u8) -> Result<f64, GatewayError> {
        let one_token = 10u64.pow(decimals as u32);
        let slippage_bps = self.risk.read().await.slippage_bps;

        let quote = self
            .quote(mint, &self.quote_mint, one_token, slippage_bps)
            .await?;

        let price = quote.out_amount as f64 / 10f64.powi(self.quote_decimals as i32);
        if price <= 0.0 {
            return Err(GatewayError::Transient(format!(
                "zero price reading for {}",
                mint
            )));
        }
        Ok(price)
    }

    async fn quote_balance_usdc(&self) -> Result<f64, GatewayError> {
        self.solana
            .get_token_balance(&self.wallet.public_key(), &self.quote_mint)
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))
    }
}
