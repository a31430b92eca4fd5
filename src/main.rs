//! Listing Sniper - New-Listing Trading Bot for Solana/Raydium
//!
//! Detects Raydium pool creation in real time and trades new tokens via
//! the Jupiter aggregator.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::RwLock;
use tracing_subscriber::{fmt, EnvFilter};

use listing_sniper::adapters::cli::{CliApp, Command, QuoteCmd, RunCmd, StatusCmd};
use listing_sniper::adapters::jupiter::{
    JupiterClient, JupiterConfig, JupiterGateway, JupiterMetadata, QuoteRequest, TokenApiConfig,
};
use listing_sniper::adapters::raydium::RaydiumListener;
use listing_sniper::adapters::solana::{OnchainInspector, SolanaClient, WalletManager};
use listing_sniper::application::{
    AlertEvent, DetectorConfig, EngineConfig, SniperEngine,
};
use listing_sniper::config::{load_config, Config};
use listing_sniper::domain::risk::RiskConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let verbose = app.verbose;
    let debug = app.debug;

    match app.command {
        Command::Run(cmd) => run_command(cmd, verbose, debug).await,
        Command::Status(cmd) => status_command(cmd, verbose, debug).await,
        Command::Quote(cmd) => quote_command(cmd, verbose, debug).await,
    }
}

/// CLI flags override the configured log level.
fn init_logging(config: &Config, verbose: bool, debug: bool) {
    let level = if debug {
        "debug".to_string()
    } else if verbose {
        "info".to_string()
    } else {
        config.logging.level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).init();
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let mut config = load_config(&cmd.config).context("Failed to load configuration")?;
    if let Some(rpc_url) = cmd.rpc_url {
        config.solana.rpc_url = rpc_url;
    }
    if let Some(ws_url) = cmd.ws_url {
        config.solana.ws_url = ws_url;
    }

    init_logging(&config, verbose, debug);
    tracing::info!("Starting listing sniper...");

    // Expand keypair path (handles ~ for home directory)
    let keypair_path = shellexpand::tilde(&config.solana.get_keypair_path()).to_string();
    let wallet = match load_wallet_with_context(&keypair_path) {
        Ok(w) => w,
        Err(e) => {
            if cmd.paper {
                tracing::warn!(
                    "Wallet not found at '{}' - using random wallet, every candidate will \
                     be rejected for insufficient balance",
                    keypair_path
                );
                WalletManager::new_random()
            } else {
                return Err(e);
            }
        }
    };
    tracing::info!(wallet = %wallet.public_key(), "wallet loaded");

    let risk = Arc::new(RwLock::new(RiskConfig::from(&config)));

    let jupiter = JupiterClient::new(JupiterConfig {
        api_base_url: config.jupiter.api_url.clone(),
        api_key: config.jupiter.get_api_key(),
        ..JupiterConfig::default()
    })
    .context("Failed to create Jupiter client")?;

    let solana = SolanaClient::new(config.solana.get_rpc_url(), &config.solana.commitment);

    let quote_mint = config.tokens.quote_mint.clone();
    let quote_decimals = config.tokens.quote_decimals;

    let gateway = Arc::new(JupiterGateway::new(
        jupiter.clone(),
        solana.clone(),
        Arc::new(wallet),
        Arc::clone(&risk),
        quote_mint.clone(),
        quote_decimals,
    ));
    let inspector = Arc::new(OnchainInspector::new(
        solana,
        jupiter,
        quote_mint,
        quote_decimals,
        config.risk.slippage_bps,
    ));
    let metadata = Arc::new(
        JupiterMetadata::new(TokenApiConfig {
            api_key: config.jupiter.get_api_key(),
            ..TokenApiConfig::default()
        })
        .context("Failed to create metadata client")?,
    );
    let listener = Arc::new(RaydiumListener::new(
        config.solana.get_ws_url(),
        config.solana.commitment.clone(),
        config.detector.channel_capacity,
    ));

    let engine = Arc::new(SniperEngine::with_shared_config(
        risk,
        DetectorConfig::from(&config),
        EngineConfig::from(&config),
        config.token_filters(),
        gateway,
        inspector,
        metadata,
        listener,
    ));

    spawn_alert_logger(&engine);

    engine.start().await.context("Failed to start engine")?;
    tracing::info!("engine running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    let report = engine.stop().await;
    for outcome in &report.resolved {
        tracing::info!(
            mint = %outcome.mint,
            reason = outcome.reason.as_str(),
            pnl_pct = outcome.pnl_pct,
            "position closed"
        );
    }
    if !report.unresolved.is_empty() {
        tracing::warn!(
            mints = ?report.unresolved,
            "positions still unresolved at shutdown, check wallet manually"
        );
    }

    tracing::info!("Listing sniper stopped");
    Ok(())
}

/// Mirror alert events into the log.
fn spawn_alert_logger(engine: &Arc<SniperEngine>) {
    let mut alerts = engine.alerts().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = alerts.recv().await {
            match event {
                AlertEvent::Listed { mint, symbol } => {
                    tracing::info!(%mint, %symbol, "new listing detected");
                }
                AlertEvent::Admitted { mint, amount_usdc } => {
                    tracing::info!(%mint, amount_usdc, "candidate admitted");
                }
                AlertEvent::Rejected { mint, reason } => {
                    tracing::info!(%mint, %reason, "candidate rejected");
                }
                AlertEvent::Bought {
                    mint,
                    symbol,
                    price,
                    amount_usdc,
                    tx,
                } => {
                    tracing::info!(%mint, %symbol, price, amount_usdc, %tx, "position opened");
                }
                AlertEvent::Sold {
                    mint,
                    symbol,
                    reason,
                    pnl_pct,
                    tx,
                } => {
                    tracing::info!(%mint, %symbol, %reason, pnl_pct, %tx, "position closed");
                }
                AlertEvent::Error { context } => {
                    tracing::error!(%context, "engine error");
                }
            }
        }
    });
}

async fn status_command(cmd: StatusCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    init_logging(&config, verbose, debug);

    let keypair_path = shellexpand::tilde(&config.solana.get_keypair_path()).to_string();
    let wallet = load_wallet_with_context(&keypair_path)?;

    let solana = SolanaClient::new(config.solana.get_rpc_url(), &config.solana.commitment);
    let balance = solana
        .get_token_balance(&wallet.public_key(), &config.tokens.quote_mint)
        .await
        .context("Failed to fetch quote token balance")?;

    println!("Wallet:  {}", wallet.public_key());
    println!("Balance: {:.2} (quote token)", balance);

    Ok(())
}

async fn quote_command(cmd: QuoteCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    init_logging(&config, verbose, debug);

    let jupiter = JupiterClient::new(JupiterConfig {
        api_base_url: config.jupiter.api_url.clone(),
        api_key: config.jupiter.get_api_key(),
        ..JupiterConfig::default()
    })?;

    let units = (cmd.amount * 10f64.powi(config.tokens.quote_decimals as i32)) as u64;
    let request = QuoteRequest::new(
        config.tokens.quote_mint.clone(),
        cmd.mint.clone(),
        units,
        cmd.slippage,
    );

    let quote = jupiter.get_quote(&request).await.context("Quote failed")?;

    println!(
        "Quote: {} quote units -> {} of {}",
        quote.input_amount(),
        quote.output_amount(),
        cmd.mint
    );
    println!("Price impact: {:.4}%", quote.price_impact());
    println!("Route: {}", quote.route_labels().join(" -> "));

    Ok(())
}

/// Load wallet with helpful error messages
fn load_wallet_with_context(keypair_path: &str) -> Result<WalletManager> {
    let path = Path::new(keypair_path);

    if !path.exists() {
        bail!(
            "Wallet file not found: {}\n\n\
             To create a new wallet, run:\n  \
             solana-keygen new --outfile {}\n\n\
             Or if you have an existing wallet, update 'keypair_path' in your config.toml",
            keypair_path,
            keypair_path
        );
    }

    WalletManager::from_file(keypair_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load wallet from '{}': {}\n\n\
             Expected format: JSON array of bytes (e.g., [1,2,3,...]) or a \
             base58-encoded secret key",
            keypair_path,
            e
        )
    })
}
