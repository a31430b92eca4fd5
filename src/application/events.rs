//! Alert Events
//!
//! Broadcast notifications for the significant moments of a trade's life.
//! Consumers (log sink, future notification channels) subscribe to the bus;
//! a bus with no subscribers drops events without blocking the engine.

use tokio::sync::broadcast;

/// Notable lifecycle moments, emitted as they happen.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    /// A new pool listing passed the detector's local checks.
    Listed { mint: String, symbol: String },

    /// A candidate cleared every admission guard and a buy was dispatched.
    Admitted { mint: String, amount_usdc: f64 },

    /// A candidate was turned away at admission.
    Rejected { mint: String, reason: String },

    /// Entry swap confirmed.
    Bought {
        mint: String,
        symbol: String,
        price: f64,
        amount_usdc: f64,
        tx: String,
    },

    /// Exit swap confirmed.
    Sold {
        mint: String,
        symbol: String,
        reason: String,
        pnl_pct: f64,
        tx: String,
    },

    /// Something went wrong that an operator should see.
    Error { context: String },
}

/// Fan-out channel for [`AlertEvent`]s.
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Lossy by design when no receiver is attached.
    pub fn publish(&self, event: AlertEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(64)
    }
}
