//! Trade Records
//!
//! The per-position bookkeeping unit. A `TradeRecord` is created when a buy
//! lands, owned by its position monitor for the rest of its life, and visible
//! read-only to everyone else through the trade registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Buy landed, entry price not yet confirmed by the oracle
    Entering,
    /// Position open, monitor polling for exit conditions
    Open,
    /// Exit condition hit, sell in progress
    Exiting,
    /// Position fully unwound (terminal)
    Closed,
}

impl TradeStatus {
    /// Whether the position still holds tokens
    pub fn is_live(&self) -> bool {
        !matches!(self, TradeStatus::Closed)
    }
}

/// Why a position was (or is being) exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Target profit price reached
    Target,
    /// Stop-loss price breached
    StopLoss,
    /// Maximum holding time elapsed
    MaxHoldTime,
    /// Single-interval price move exceeded the spike threshold
    VolatilitySpike,
    /// Engine shutdown forced the exit
    Shutdown,
    /// Operator-requested close
    Manual,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Target => "target",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::MaxHoldTime => "max_hold_time",
            ExitReason::VolatilitySpike => "volatility_spike",
            ExitReason::Shutdown => "shutdown",
            ExitReason::Manual => "manual",
        }
    }
}

/// State of one open position, keyed by token mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Token mint address (registry key)
    pub mint: String,
    /// Token symbol for logging
    pub symbol: String,
    /// Token decimals (needed to size the exit swap)
    pub decimals: u8,
    /// Entry price in USDC per whole token
    pub entry_price: f64,
    /// USDC committed at entry
    pub amount_spent_usdc: f64,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Signature of the entry transaction
    pub entry_tx: String,
    /// Current lifecycle status
    pub status: TradeStatus,
}

impl TradeRecord {
    pub fn new(
        mint: String,
        symbol: String,
        decimals: u8,
        entry_price: f64,
        amount_spent_usdc: f64,
        entry_tx: String,
    ) -> Self {
        Self {
            mint,
            symbol,
            decimals,
            entry_price,
            amount_spent_usdc,
            entry_time: Utc::now(),
            entry_tx,
            status: TradeStatus::Entering,
        }
    }

    /// Profit/loss percentage at the given price
    pub fn pnl_pct(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (current_price - self.entry_price) / self.entry_price * 100.0
    }

    /// Estimated token quantity held, in whole tokens.
    ///
    /// We never query the token account directly; the quantity is derived
    /// from what was spent at the recorded entry price.
    pub fn estimated_tokens(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.amount_spent_usdc / self.entry_price
    }

    /// Estimated token quantity in base units for the exit swap
    pub fn estimated_base_units(&self) -> u64 {
        let whole = self.estimated_tokens();
        (whole * 10f64.powi(self.decimals as i32)) as u64
    }

    /// Seconds since entry
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.entry_time).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entry_price: f64, spent: f64) -> TradeRecord {
        TradeRecord::new(
            "mint123".to_string(),
            "TST".to_string(),
            6,
            entry_price,
            spent,
            "tx789".to_string(),
        )
    }

    #[test]
    fn test_new_record_is_entering() {
        let r = record(0.05, 10.0);
        assert_eq!(r.status, TradeStatus::Entering);
        assert!(r.status.is_live());
    }

    #[test]
    fn test_pnl_pct() {
        let r = record(100.0, 10.0);
        assert!((r.pnl_pct(110.0) - 10.0).abs() < 1e-9);
        assert!((r.pnl_pct(95.0) - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_pnl_pct_zero_entry() {
        let r = record(0.0, 10.0);
        assert_eq!(r.pnl_pct(1.0), 0.0);
    }

    #[test]
    fn test_estimated_tokens() {
        // 10 USDC at 0.05 USDC/token = 200 tokens
        let r = record(0.05, 10.0);
        assert!((r.estimated_tokens() - 200.0).abs() < 1e-9);
        // 6 decimals -> 200_000_000 base units
        assert_eq!(r.estimated_base_units(), 200_000_000);
    }

    #[test]
    fn test_closed_is_not_live() {
        let mut r = record(1.0, 1.0);
        r.status = TradeStatus::Closed;
        assert!(!r.status.is_live());
    }

    #[test]
    fn test_exit_reason_labels() {
        assert_eq!(ExitReason::Target.as_str(), "target");
        assert_eq!(ExitReason::StopLoss.as_str(), "stop_loss");
        assert_eq!(ExitReason::Shutdown.as_str(), "shutdown");
    }
}
