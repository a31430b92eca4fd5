//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Raydium: websocket transaction stream for pool detection
//! - Jupiter: DEX aggregator API client and metadata lookup
//! - Solana: RPC client, wallet management, and mint inspection
//! - CLI: Command-line interface

pub mod cli;
pub mod jupiter;
pub mod raydium;
pub mod solana;

pub use cli::CliApp;
pub use jupiter::{JupiterClient, JupiterGateway, JupiterMetadata};
pub use raydium::RaydiumListener;
pub use solana::{OnchainInspector, SolanaClient, WalletManager};
