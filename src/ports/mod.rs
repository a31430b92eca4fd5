//! Port traits: the seams between the engine and its collaborators.
//!
//! Adapters implement these against real services; tests use the recording
//! mocks in [`mocks`].

pub mod chain_events;
pub mod gateway;
pub mod inspector;
pub mod mocks;

pub use chain_events::{ChainEventError, ChainEventSource, ParsedInstruction, ParsedTxEvent};
pub use gateway::{GatewayError, SwapGateway, SwapQuote, SwapRejection};
pub use inspector::{InspectError, MetadataError, MetadataSource, TokenInspector};
