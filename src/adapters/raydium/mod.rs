//! Raydium Adapter
//!
//! Websocket subscription to AMM program transactions and the wire types
//! for the `transactionSubscribe` RPC method.

pub mod listener;
pub mod types;

pub use listener::RaydiumListener;
