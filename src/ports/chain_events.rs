//! Chain Event Source Port
//!
//! Narrow seam between the websocket adapter and the listing detector. The
//! adapter handles connection lifecycle and reconnection; the detector only
//! ever sees already-parsed transaction events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// One parsed instruction from a transaction notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    /// Program the instruction targets (base58)
    pub program_id: String,
    /// Account addresses in instruction order
    pub accounts: Vec<String>,
}

/// A transaction event delivered by the chain event source.
#[derive(Debug, Clone)]
pub struct ParsedTxEvent {
    /// Transaction signature (dedup key)
    pub signature: String,
    /// Whether the transaction failed on-chain
    pub failed: bool,
    /// Top-level parsed instructions
    pub instructions: Vec<ParsedInstruction>,
    /// Program log messages
    pub logs: Vec<String>,
}

/// Errors from the chain event source.
#[derive(Debug, Error)]
pub enum ChainEventError {
    /// Connection-level failure; the adapter retries these internally.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Credentials rejected. Fatal: propagates to the engine supervisor.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The node refused the subscription request. Fatal.
    #[error("subscription refused: {0}")]
    Subscription(String),

    /// A single message could not be parsed; logged and skipped.
    #[error("failed to parse event: {0}")]
    Parse(String),

    /// Downstream consumer went away.
    #[error("event channel closed")]
    ChannelClosed,
}

impl ChainEventError {
    /// Fatal errors halt detection instead of triggering a reconnect.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainEventError::Authentication(_) | ChainEventError::Subscription(_)
        )
    }
}

/// Source of parsed transaction events for one program id.
#[async_trait]
pub trait ChainEventSource: Send + Sync {
    /// Subscribe to transactions touching `program_id`. The returned
    /// receiver yields events until the source shuts down; the source owns
    /// reconnection with backoff internally.
    async fn subscribe(
        &self,
        program_id: &str,
    ) -> Result<mpsc::Receiver<ParsedTxEvent>, ChainEventError>;
}
