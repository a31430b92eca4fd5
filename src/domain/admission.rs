//! Admission Control
//!
//! Decides whether a trade candidate becomes a position. Guards run in a
//! fixed, cost-ascending order and short-circuit on the first failure, so
//! cheap local checks always run before anything that touches the network.
//! Admission never mutates the registry; the caller does that after the buy.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::domain::candidate::TradeCandidate;
use crate::domain::risk::RiskConfig;
use crate::ports::inspector::{InspectError, TokenInspector};

/// Why a candidate was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Token already has a trade record
    Duplicate,
    /// Last admission was too recent
    Cooldown,
    /// Open trade count at the configured maximum
    Capacity,
    /// Whitelist/blacklist filtered the token out
    Filtered,
    /// Pool depth below the configured minimum
    Illiquid,
    /// Mint or freeze authority not renounced
    Unverified,
    /// Anti-bot style transfer restrictions detected
    AntiBot,
    /// Sized position came out to nothing
    InsufficientBalance,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Duplicate => "duplicate",
            RejectReason::Cooldown => "cooldown",
            RejectReason::Capacity => "capacity",
            RejectReason::Filtered => "filtered",
            RejectReason::Illiquid => "illiquid",
            RejectReason::Unverified => "unverified",
            RejectReason::AntiBot => "antibot",
            RejectReason::InsufficientBalance => "insufficient_balance",
        }
    }
}

/// Outcome of an admission evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Enter with this many USDC
    Admit { amount_usdc: f64 },
    /// Do not enter
    Reject { reason: RejectReason },
}

/// Static allow/deny lists applied both at detection and admission.
#[derive(Debug, Clone, Default)]
pub struct TokenFilters {
    /// If non-empty, only these mints may trade
    pub whitelist: Vec<String>,
    /// These mints never trade
    pub blacklist: Vec<String>,
}

impl TokenFilters {
    pub fn allows(&self, mint: &str) -> bool {
        if !self.whitelist.is_empty() && !self.whitelist.iter().any(|m| m == mint) {
            return false;
        }
        !self.blacklist.iter().any(|m| m == mint)
    }
}

/// Read-only view of engine state at evaluation time.
#[derive(Debug, Clone)]
pub struct AdmissionState {
    /// Token already has a record in the registry
    pub already_tracked: bool,
    /// Number of live (open or exiting) trades
    pub open_count: usize,
    /// When the last candidate was admitted, if any
    pub last_admitted_at: Option<Instant>,
}

/// Run the local and network guards in order. `Ok(None)` means every guard
/// passed; `Ok(Some(reason))` is a semantic rejection. Inspector failures
/// bubble up so the caller can treat them as transient.
pub async fn check_guards(
    candidate: &TradeCandidate,
    state: &AdmissionState,
    config: &RiskConfig,
    filters: &TokenFilters,
    inspector: &dyn TokenInspector,
) -> Result<Option<RejectReason>, InspectError> {
    // 1. already tracked
    if state.already_tracked {
        return Ok(Some(RejectReason::Duplicate));
    }

    // 2. cooldown since the last admitted trade
    if let Some(last) = state.last_admitted_at {
        if last.elapsed() < config.cooldown {
            return Ok(Some(RejectReason::Cooldown));
        }
    }

    // 3. capacity
    if state.open_count >= config.max_open_trades {
        return Ok(Some(RejectReason::Capacity));
    }

    // 4. allow/deny lists
    if !filters.allows(&candidate.mint) {
        return Ok(Some(RejectReason::Filtered));
    }

    // 5. liquidity depth probe
    let depth = inspector
        .liquidity_depth_usdc(&candidate.mint, config.min_liquidity_usdc)
        .await?;
    if depth < config.min_liquidity_usdc {
        return Ok(Some(RejectReason::Illiquid));
    }

    // 6. authority verification
    if config.require_verified && !inspector.is_verified(&candidate.mint).await? {
        return Ok(Some(RejectReason::Unverified));
    }

    // 7. anti-bot transfer restrictions
    if config.reject_antibot && inspector.has_antibot(&candidate.mint).await? {
        return Ok(Some(RejectReason::AntiBot));
    }

    Ok(None)
}

/// Size the position once every guard has passed.
///
/// Commits the lesser of the configured swap amount and the position-size
/// fraction of the wallet balance.
pub fn size_position(config: &RiskConfig, wallet_balance_usdc: f64) -> AdmissionDecision {
    let sized = config
        .swap_amount_usdc
        .min(wallet_balance_usdc * config.position_size_pct / 100.0);

    if sized <= 0.0 {
        AdmissionDecision::Reject {
            reason: RejectReason::InsufficientBalance,
        }
    } else {
        AdmissionDecision::Admit { amount_usdc: sized }
    }
}
