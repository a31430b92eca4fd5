//! CLI Command Definitions
//!
//! Argument structures for the sniper binary, parsed with clap derive
//! macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// New-listing sniper for Solana/Raydium
#[derive(Parser, Debug)]
#[command(
    name = "listing-sniper",
    version = env!("CARGO_PKG_VERSION"),
    about = "New-listing sniper for Solana/Raydium",
    long_about = "Watches the Raydium AMM program for pool creation, screens new \
                  tokens through admission guards, and trades them via the Jupiter \
                  aggregator with automated exit management."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the sniper engine
    Run(RunCmd),

    /// Show wallet address and quote-token balance
    Status(StatusCmd),

    /// Get a quote for buying a token with the quote currency
    Quote(QuoteCmd),
}

/// Start the sniper engine
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Observe without funds: missing wallet falls back to a random key
    #[arg(short, long)]
    pub paper: bool,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Override websocket URL
    #[arg(long, value_name = "URL")]
    pub ws_url: Option<String>,
}

/// Show wallet status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

/// Get a swap quote
#[derive(Parser, Debug)]
pub struct QuoteCmd {
    /// Output token mint address
    #[arg(value_name = "MINT")]
    pub mint: String,

    /// Amount of quote currency to spend
    #[arg(value_name = "AMOUNT")]
    pub amount: f64,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Slippage tolerance in basis points
    #[arg(long, value_name = "BPS", default_value = "100")]
    pub slippage: u16,
}
