//! Listing Sniper - New-Listing Trading Engine for Solana/Raydium
//!
//! Watches the Raydium AMM program for pool creation, screens new tokens
//! through a fixed sequence of admission guards, enters positions via the
//! Jupiter aggregator, and manages exits per position until shutdown.
//!
//! # Modules
//!
//! - `domain`: Core types (TradeCandidate, TradeRecord, RiskConfig, admission guards)
//! - `ports`: Trait abstractions (SwapGateway, ChainEventSource, TokenInspector)
//! - `adapters`: External implementations (Raydium, Jupiter, Solana, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Engine, detector, monitors, and the trade registry

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
