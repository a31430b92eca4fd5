//! Jupiter Adapter
//!
//! Implementation of the swap gateway against the Jupiter aggregator API:
//! quote fetching, swap transaction building, signing and submission, plus
//! token metadata lookup.

pub mod client;
pub mod gateway;
pub mod metadata;
pub mod quote;
pub mod swap;

pub use client::{JupiterClient, JupiterConfig};
pub use gateway::JupiterGateway;
pub use metadata::{JupiterMetadata, TokenApiConfig};
pub use quote::{QuoteRequest, QuoteResponse};
pub use swap::{SwapRequest, SwapResponse};
