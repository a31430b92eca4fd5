//! Core domain types and decision logic.
//!
//! Everything here is deterministic given its inputs; network access happens
//! behind the port traits and only where the admission guards require it.

pub mod admission;
pub mod candidate;
pub mod dedup;
pub mod risk;
pub mod trade;

pub use admission::{
    check_guards, size_position, AdmissionDecision, AdmissionState, RejectReason, TokenFilters,
};
pub use candidate::{TokenMetadata, TradeCandidate};
pub use dedup::SignatureCache;
pub use risk::{ExitLevels, RiskConfig};
pub use trade::{ExitReason, TradeRecord, TradeStatus};
