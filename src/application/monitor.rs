//! Position Monitor
//!
//! One task per open position. Walks the trade through
//! Entering -> Open -> Exiting -> Closed: refines the entry price, polls the
//! oracle on a fixed cadence, and drives the exit swap when a condition
//! fires. The poll tick is the only suspension point, so a shutdown signal
//! is always observed between full evaluations, never in the middle of one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::application::events::{AlertBus, AlertEvent};
use crate::application::registry::TradeRegistry;
use crate::domain::risk::RiskConfig;
use crate::domain::trade::{ExitReason, TradeRecord, TradeStatus};
use crate::ports::gateway::{GatewayError, SwapGateway};

/// Attempts at refining the entry price before settling for the
/// quote-implied one.
const ENTRY_PRICE_ATTEMPTS: u32 = 5;
const ENTRY_PRICE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Terminal report for a monitored position.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub mint: String,
    pub reason: ExitReason,
    pub exit_tx: String,
    pub pnl_pct: f64,
}

/// First exit condition satisfied at this price reading, in priority order:
/// target, stop, holding deadline, volatility spike.
pub fn evaluate_exit(
    config: &RiskConfig,
    record: &TradeRecord,
    current: f64,
    previous: Option<f64>,
) -> Option<ExitReason> {
    let levels = config.exit_levels(record.entry_price);

    if current >= levels.target_price {
        return Some(ExitReason::Target);
    }
    if current <= levels.stop_price {
        return Some(ExitReason::StopLoss);
    }
    if record.age_seconds() >= config.max_holding.as_secs() as i64 {
        return Some(ExitReason::MaxHoldTime);
    }
    if previous.is_some_and(|prev| config.is_volatility_spike(prev, current)) {
        return Some(ExitReason::VolatilitySpike);
    }

    None
}

pub struct PositionMonitor {
    record: TradeRecord,
    gateway: Arc<dyn SwapGateway>,
    registry: Arc<TradeRegistry>,
    config: Arc<RwLock<RiskConfig>>,
    alerts: AlertBus,
    quote_mint: String,
    quote_decimals: u8,
    shutdown: watch::Receiver<bool>,
    commands: mpsc::Receiver<ExitReason>,
    /// Exit condition already fired but the sell has not landed yet.
    pending: Option<ExitReason>,
}

impl PositionMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record: TradeRecord,
        gateway: Arc<dyn SwapGateway>,
        registry: Arc<TradeRegistry>,
        config: Arc<RwLock<RiskConfig>>,
        alerts: AlertBus,
        quote_mint: String,
        quote_decimals: u8,
        shutdown: watch::Receiver<bool>,
        commands: mpsc::Receiver<ExitReason>,
    ) -> Self {
        Self {
            record,
            gateway,
            registry,
            config,
            alerts,
            quote_mint,
            quote_decimals,
            shutdown,
            commands,
            pending: None,
        }
    }

    /// Monitor until the position is unwound. Never abandons a live
    /// position: a failed sell reverts to Open and is retried on the next
    /// tick.
    pub async fn run(mut self) -> MonitorOutcome {
        self.refine_entry_price().await;

        self.record.status = TradeStatus::Open;
        self.registry
            .set_status(&self.record.mint, TradeStatus::Open)
            .await;

        info!(
            mint = %self.record.mint,
            symbol = %self.record.symbol,
            entry_price = self.record.entry_price,
            "position open"
        );

        let mut previous: Option<f64> = None;
        let mut sell_attempted = false;

        loop {
            let config = self.config.read().await.clone();

            if self.pending.is_none() && *self.shutdown.borrow() {
                self.pending = Some(ExitReason::Shutdown);
            }

            if self.pending.is_none() {
                tokio::select! {
                    _ = tokio::time::sleep(config.price_check_interval) => {}
                    changed = self.shutdown.changed() => {
                        if changed.is_err() {
                            // supervisor gone; treat as shutdown
                            self.pending = Some(ExitReason::Shutdown);
                        }
                        continue;
                    }
                }

                if let Ok(reason) = self.commands.try_recv() {
                    self.pending = Some(reason);
                } else {
                    match self.gateway.price(&self.record.mint, self.record.decimals).await {
                        Ok(current) => {
                            debug!(
                                mint = %self.record.mint,
                                price = current,
                                pnl_pct = self.record.pnl_pct(current),
                                "price check"
                            );
                            self.pending =
                                evaluate_exit(&config, &self.record, current, previous);
                            previous = Some(current);
                        }
                        Err(err) if err.is_transient() => {
                            debug!(mint = %self.record.mint, %err, "price check failed, will retry");
                            continue;
                        }
                        Err(err) => {
                            error!(mint = %self.record.mint, %err, "price check failed");
                            continue;
                        }
                    }
                }
            } else if sell_attempted {
                // pace re-attempts of a failed exit
                tokio::time::sleep(config.price_check_interval).await;
            }

            let Some(reason) = self.pending else {
                continue;
            };

            self.record.status = TradeStatus::Exiting;
            self.registry
                .set_status(&self.record.mint, TradeStatus::Exiting)
                .await;

            match self.try_sell(&config).await {
                Ok((exit_tx, pnl_pct)) => {
                    self.record.status = TradeStatus::Closed;
                    self.registry.remove(&self.record.mint).await;
                    info!(
                        mint = %self.record.mint,
                        symbol = %self.record.symbol,
                        reason = reason.as_str(),
                        pnl_pct,
                        tx = %exit_tx,
                        "position closed"
                    );
                    self.alerts.publish(AlertEvent::Sold {
                        mint: self.record.mint.clone(),
                        symbol: self.record.symbol.clone(),
                        reason: reason.as_str().to_string(),
                        pnl_pct,
                        tx: exit_tx.clone(),
                    });
                    return MonitorOutcome {
                        mint: self.record.mint,
                        reason,
                        exit_tx,
                        pnl_pct,
                    };
                }
                Err(err) => {
                    sell_attempted = true;
                    warn!(
                        mint = %self.record.mint,
                        reason = reason.as_str(),
                        %err,
                        "exit swap failed, reverting to open for retry"
                    );
                    self.record.status = TradeStatus::Open;
                    self.registry
                        .set_status(&self.record.mint, TradeStatus::Open)
                        .await;
                    self.alerts.publish(AlertEvent::Error {
                        context: format!("exit swap for {} failed: {}", self.record.mint, err),
                    });
                }
            }
        }
    }

    /// The entry record carries the quote-implied price; replace it with an
    /// oracle reading when one can be had quickly.
    async fn refine_entry_price(&mut self) {
        for attempt in 0..ENTRY_PRICE_ATTEMPTS {
            match self.gateway.price(&self.record.mint, self.record.decimals).await {
                Ok(price) => {
                    self.record.entry_price = price;
                    return;
                }
                Err(err) if err.is_transient() => {
                    debug!(
                        mint = %self.record.mint,
                        attempt,
                        %err,
                        "entry price refinement failed"
                    );
                    tokio::time::sleep(ENTRY_PRICE_RETRY_DELAY).await;
                }
                Err(err) => {
                    warn!(mint = %self.record.mint, %err, "entry price refinement aborted");
                    return;
                }
            }
        }
    }

    /// Reverse swap of the estimated holdings. Runs to completion once
    /// started; the caller decides what a failure means.
    async fn try_sell(&self, config: &RiskConfig) -> Result<(String, f64), GatewayError> {
        let amount = self.record.estimated_base_units();

        let quote = self
            .gateway
            .quote(
                &self.record.mint,
                &self.quote_mint,
                amount,
                config.slippage_bps,
            )
            .await?;
        self.gateway.simulate(&quote).await?;
        let tx = self
            .gateway
            .execute(&quote, config.priority_fee_lamports)
            .await?;

        let proceeds_usdc =
            quote.out_amount as f64 / 10f64.powi(self.quote_decimals as i32);
        let tokens = self.record.estimated_tokens();
        let pnl_pct = if tokens > 0.0 {
            self.record.pnl_pct(proceeds_usdc / tokens)
        } else {
            0.0
        };

        Ok((tx, pnl_pct))
    }
}
