//! Risk Configuration
//!
//! Immutable per-evaluation snapshot of every tunable that gates admission
//! and drives exit decisions. The engine holds the live copy behind a lock;
//! consumers clone a snapshot so a hot-reload never changes a decision
//! mid-evaluation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default honeypot heuristic: reject quotes whose price impact is at or
/// above this percentage.
pub const DEFAULT_MAX_PRICE_IMPACT_PCT: f64 = 15.0;

/// Default single-interval volatility spike threshold (percent)
pub const DEFAULT_VOLATILITY_SPIKE_PCT: f64 = 10.0;

/// Risk parameters applied at admission and during monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Minimum pool depth in USDC for a candidate to be admitted
    pub min_liquidity_usdc: f64,
    /// Slippage tolerance in basis points for both entry and exit swaps
    pub slippage_bps: u16,
    /// Venue labels allowed in swap routes (empty = any venue)
    pub allowed_venues: Vec<String>,
    /// Require renounced mint/freeze authority before entry
    pub require_verified: bool,
    /// Reject tokens with anti-bot style transfer restrictions
    pub reject_antibot: bool,
    /// Target profit percentage (exit at entry * (1 + pct/100))
    pub target_profit_pct: f64,
    /// Stop loss percentage (exit at entry * (1 - pct/100))
    pub stop_loss_pct: f64,
    /// Maximum holding time before a forced exit
    pub max_holding: Duration,
    /// Volatility spike threshold in percent per interval
    pub volatility_spike_pct: f64,
    /// Whether the volatility spike exit is armed
    pub volatility_exit_enabled: bool,
    /// Fraction of wallet balance committed per trade (percent)
    pub position_size_pct: f64,
    /// Maximum number of simultaneously open trades
    pub max_open_trades: usize,
    /// Minimum time between consecutive admitted trades
    pub cooldown: Duration,
    /// Configured swap amount in USDC (upper bound on sizing)
    pub swap_amount_usdc: f64,
    /// Price polling cadence for position monitors
    pub price_check_interval: Duration,
    /// Honeypot heuristic: maximum acceptable quote price impact (percent)
    pub max_price_impact_pct: f64,
    /// Priority fee attached to executed transactions, in lamports
    pub priority_fee_lamports: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usdc: 1_000.0,
            slippage_bps: 100,
            allowed_venues: Vec::new(),
            require_verified: false,
            reject_antibot: true,
            target_profit_pct: 20.0,
            stop_loss_pct: 10.0,
            max_holding: Duration::from_secs(4 * 3600),
            volatility_spike_pct: DEFAULT_VOLATILITY_SPIKE_PCT,
            volatility_exit_enabled: true,
            position_size_pct: 5.0,
            max_open_trades: 3,
            cooldown: Duration::from_secs(30),
            swap_amount_usdc: 10.0,
            price_check_interval: Duration::from_secs(5),
            max_price_impact_pct: DEFAULT_MAX_PRICE_IMPACT_PCT,
            priority_fee_lamports: 10_000,
        }
    }
}

/// Price levels that trigger an exit, derived once per position at entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    /// Take-profit price
    pub target_price: f64,
    /// Stop-loss price
    pub stop_price: f64,
}

impl RiskConfig {
    /// Derive the exit price levels for an entry price.
    pub fn exit_levels(&self, entry_price: f64) -> ExitLevels {
        ExitLevels {
            target_price: entry_price * (1.0 + self.target_profit_pct / 100.0),
            stop_price: entry_price * (1.0 - self.stop_loss_pct / 100.0),
        }
    }

    /// Whether a single-interval price move counts as a volatility spike.
    pub fn is_volatility_spike(&self, previous: f64, current: f64) -> bool {
        if !self.volatility_exit_enabled || previous <= 0.0 {
            return false;
        }
        let move_pct = ((current - previous) / previous).abs() * 100.0;
        move_pct > self.volatility_spike_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_levels() {
        let config = RiskConfig {
            target_profit_pct: 20.0,
            stop_loss_pct: 10.0,
            ..Default::default()
        };
        let levels = config.exit_levels(100.0);
        assert!((levels.target_price - 120.0).abs() < 1e-9);
        assert!((levels.stop_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_spike_detection() {
        let config = RiskConfig {
            volatility_spike_pct: 10.0,
            volatility_exit_enabled: true,
            ..Default::default()
        };
        // 15% drop triggers, 5% move does not
        assert!(config.is_volatility_spike(100.0, 85.0));
        assert!(config.is_volatility_spike(100.0, 115.0));
        assert!(!config.is_volatility_spike(100.0, 105.0));
        // exactly at threshold does not trigger
        assert!(!config.is_volatility_spike(100.0, 110.0));
    }

    #[test]
    fn test_volatility_spike_disabled() {
        let config = RiskConfig {
            volatility_exit_enabled: false,
            ..Default::default()
        };
        assert!(!config.is_volatility_spike(100.0, 50.0));
    }

    #[test]
    fn test_volatility_spike_invalid_previous() {
        let config = RiskConfig::default();
        assert!(!config.is_volatility_spike(0.0, 100.0));
    }
}
