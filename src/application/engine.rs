//! Engine Supervisor
//!
//! Owns the listener, detector, dispatch task, and per-position monitors.
//! The dispatch task is the only place trades are admitted and entered, so
//! admission checks and the registry insert are never raced against each
//! other. Shutdown is two-phase: stop intake, then force every monitor into
//! a shutdown exit and wait for them within a bounded window.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::detector::{DetectorConfig, ListingDetector};
use crate::application::events::{AlertBus, AlertEvent};
use crate::application::monitor::{MonitorOutcome, PositionMonitor};
use crate::application::registry::TradeRegistry;
use crate::domain::admission::{
    check_guards, size_position, AdmissionDecision, AdmissionState, TokenFilters,
};
use crate::domain::candidate::TradeCandidate;
use crate::domain::risk::RiskConfig;
use crate::domain::trade::{ExitReason, TradeRecord};
use crate::ports::chain_events::{ChainEventError, ChainEventSource};
use crate::ports::gateway::{GatewayError, SwapGateway};
use crate::ports::inspector::{InspectError, MetadataSource, TokenInspector};

/// Lifecycle of the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Startup failed; the engine will not trade until restarted.
    Error,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Stopped => "stopped",
            EngineStatus::Starting => "starting",
            EngineStatus::Running => "running",
            EngineStatus::Stopping => "stopping",
            EngineStatus::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    AlreadyRunning,

    #[error("event subscription failed: {0}")]
    EventSource(#[from] ChainEventError),
}

/// Engine-level tuning, from the `[engine]` config section.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long `stop` waits for monitors to unwind their positions.
    pub shutdown_timeout: Duration,
    /// Decimals of the quote asset (6 for USDC).
    pub quote_decimals: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            quote_decimals: 6,
        }
    }
}

/// What `stop` managed to unwind before the deadline.
#[derive(Debug)]
pub struct ShutdownReport {
    pub resolved: Vec<MonitorOutcome>,
    /// Mints whose exit had not landed when the window closed. Their
    /// monitors keep running detached until the sell resolves.
    pub unresolved: Vec<String>,
}

struct MonitorEntry {
    generation: u64,
    handle: JoinHandle<MonitorOutcome>,
    commands: mpsc::Sender<ExitReason>,
}

pub struct SniperEngine {
    config: Arc<RwLock<RiskConfig>>,
    detector_config: DetectorConfig,
    engine_config: EngineConfig,
    filters: TokenFilters,
    registry: Arc<TradeRegistry>,
    alerts: AlertBus,
    gateway: Arc<dyn SwapGateway>,
    inspector: Arc<dyn TokenInspector>,
    metadata: Arc<dyn MetadataSource>,
    events: Arc<dyn ChainEventSource>,
    status: RwLock<EngineStatus>,
    monitors: Arc<Mutex<HashMap<String, MonitorEntry>>>,
    monitor_seq: AtomicU64,
    last_admitted: Mutex<Option<Instant>>,
    shutdown: watch::Sender<bool>,
    intake_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl SniperEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RiskConfig,
        detector_config: DetectorConfig,
        engine_config: EngineConfig,
        filters: TokenFilters,
        gateway: Arc<dyn SwapGateway>,
        inspector: Arc<dyn TokenInspector>,
        metadata: Arc<dyn MetadataSource>,
        events: Arc<dyn ChainEventSource>,
    ) -> Self {
        Self::with_shared_config(
            Arc::new(RwLock::new(config)),
            detector_config,
            engine_config,
            filters,
            gateway,
            inspector,
            metadata,
            events,
        )
    }

    /// Construct around an externally owned risk lock, so adapters that
    /// validate against live risk parameters see hot reloads too.
    #[allow(clippy::too_many_arguments)]
    pub fn with_shared_config(
        config: Arc<RwLock<RiskConfig>>,
        detector_config: DetectorConfig,
        engine_config: EngineConfig,
        filters: TokenFilters,
        gateway: Arc<dyn SwapGateway>,
        inspector: Arc<dyn TokenInspector>,
        metadata: Arc<dyn MetadataSource>,
        events: Arc<dyn ChainEventSource>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            detector_config,
            engine_config,
            filters,
            registry: Arc::new(TradeRegistry::new()),
            alerts: AlertBus::default(),
            gateway,
            inspector,
            metadata,
            events,
            status: RwLock::new(EngineStatus::Stopped),
            monitors: Arc::new(Mutex::new(HashMap::new())),
            monitor_seq: AtomicU64::new(0),
            last_admitted: Mutex::new(None),
            shutdown,
            intake_task: Mutex::new(None),
            dispatch_task: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> EngineStatus {
        *self.status.read().await
    }

    /// Registry contents, for control surfaces.
    pub async fn snapshot(&self) -> Vec<TradeRecord> {
        self.registry.snapshot().await
    }

    pub fn alerts(&self) -> &AlertBus {
        &self.alerts
    }

    /// Swap in new risk parameters. Takes effect on the next admission and
    /// the next monitor tick; decisions already in flight are unaffected.
    pub async fn apply_config(&self, config: RiskConfig) {
        *self.config.write().await = config;
        info!("risk configuration updated");
    }

    /// Request a manual close of one position.
    pub async fn close_position(&self, mint: &str) -> bool {
        let monitors = self.monitors.lock().await;
        match monitors.get(mint) {
            Some(entry) => entry.commands.send(ExitReason::Manual).await.is_ok(),
            None => false,
        }
    }

    /// Subscribe to the event stream, then spawn the detector and the
    /// dispatch task. Subscription failures are fatal here; there is no
    /// point running an engine that cannot see listings.
    pub async fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        {
            let mut status = self.status.write().await;
            if matches!(*status, EngineStatus::Starting | EngineStatus::Running) {
                return Err(EngineError::AlreadyRunning);
            }
            *status = EngineStatus::Starting;
        }
        let _ = self.shutdown.send(false);

        let events_rx = match self.events.subscribe(&self.detector_config.program_id).await {
            Ok(rx) => rx,
            Err(err) => {
                error!(%err, "event subscription failed");
                *self.status.write().await = EngineStatus::Error;
                return Err(EngineError::EventSource(err));
            }
        };

        let (candidate_tx, candidate_rx) =
            mpsc::channel(self.detector_config.channel_capacity.max(1));

        let detector = ListingDetector::new(
            self.detector_config.clone(),
            self.filters.clone(),
            Arc::clone(&self.metadata),
        );
        *self.intake_task.lock().await = Some(tokio::spawn(detector.run(events_rx, candidate_tx)));
        *self.dispatch_task.lock().await =
            Some(tokio::spawn(Arc::clone(self).dispatch_loop(candidate_rx)));

        *self.status.write().await = EngineStatus::Running;
        info!("engine running");
        Ok(())
    }

    /// Two-phase shutdown. Phase one halts intake; phase two signals every
    /// monitor to exit its position and waits for them, bounded by the
    /// shutdown timeout. Positions still unwinding at the deadline are
    /// reported, and their monitors are left running rather than aborted so
    /// an in-flight sell is never cancelled.
    pub async fn stop(&self) -> ShutdownReport {
        *self.status.write().await = EngineStatus::Stopping;
        info!("engine stopping");

        let _ = self.shutdown.send(true);

        // Intake first: the detector holds no positions and is safe to
        // abort. The dispatch task finishes its current candidate before
        // observing the signal, so it is awaited, not aborted.
        if let Some(task) = self.intake_task.lock().await.take() {
            task.abort();
        }
        let deadline = Instant::now() + self.engine_config.shutdown_timeout;
        if let Some(task) = self.dispatch_task.lock().await.take() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, task).await.is_err() {
                warn!("dispatch task did not stop within the shutdown window");
            }
        }

        let entries: Vec<(String, MonitorEntry)> =
            self.monitors.lock().await.drain().collect();

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for (mint, entry) in entries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, entry.handle).await {
                Ok(Ok(outcome)) => resolved.push(outcome),
                Ok(Err(join_err)) => {
                    error!(%mint, %join_err, "monitor task failed");
                    unresolved.push(mint);
                }
                Err(_) => {
                    warn!(%mint, "position not unwound within the shutdown window");
                    unresolved.push(mint);
                }
            }
        }

        if !unresolved.is_empty() {
            self.alerts.publish(AlertEvent::Error {
                context: format!("shutdown left {} position(s) unresolved", unresolved.len()),
            });
        }

        *self.status.write().await = EngineStatus::Stopped;
        info!(
            resolved = resolved.len(),
            unresolved = unresolved.len(),
            "engine stopped"
        );
        ShutdownReport {
            resolved,
            unresolved,
        }
    }

    async fn dispatch_loop(self: Arc<Self>, mut candidates: mpsc::Receiver<TradeCandidate>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                maybe = candidates.recv() => {
                    match maybe {
                        Some(candidate) => self.handle_candidate(candidate).await,
                        None => {
                            self.handle_intake_loss().await;
                            break;
                        }
                    }
                }
            }
        }
        info!("dispatch stopped");
    }

    /// The candidate channel only closes outside of shutdown when the
    /// listener or detector has died; an engine that can no longer see
    /// listings must not keep reporting itself healthy.
    async fn handle_intake_loss(&self) {
        let mut status = self.status.write().await;
        if *status != EngineStatus::Running {
            return;
        }
        *status = EngineStatus::Error;
        error!("candidate intake stopped while the engine was running");
        self.alerts.publish(AlertEvent::Error {
            context: "candidate intake stopped unexpectedly".to_string(),
        });
    }

    /// Admission, entry, registration, monitor spawn. One candidate at a
    /// time by construction.
    async fn handle_candidate(&self, candidate: TradeCandidate) {
        self.alerts.publish(AlertEvent::Listed {
            mint: candidate.mint.clone(),
            symbol: candidate.metadata.symbol.clone(),
        });

        let config = self.config.read().await.clone();
        let state = AdmissionState {
            already_tracked: self.registry.get(&candidate.mint).await.is_some(),
            open_count: self.registry.open_count().await,
            last_admitted_at: *self.last_admitted.lock().await,
        };

        match check_guards(&candidate, &state, &config, &self.filters, &*self.inspector).await
        {
            Ok(None) => {}
            Ok(Some(reason)) => {
                info!(mint = %candidate.mint, reason = reason.as_str(), "candidate rejected");
                self.alerts.publish(AlertEvent::Rejected {
                    mint: candidate.mint,
                    reason: reason.as_str().to_string(),
                });
                return;
            }
            Err(InspectError::Transient(msg)) => {
                warn!(mint = %candidate.mint, %msg, "inspection failed, dropping candidate");
                return;
            }
            Err(err) => {
                error!(mint = %candidate.mint, %err, "inspection failed");
                self.alerts.publish(AlertEvent::Error {
                    context: format!("inspection of {} failed: {}", candidate.mint, err),
                });
                return;
            }
        }

        let balance = match self.gateway.quote_balance_usdc().await {
            Ok(balance) => balance,
            Err(err) => {
                warn!(mint = %candidate.mint, %err, "balance check failed, dropping candidate");
                return;
            }
        };

        let amount_usdc = match size_position(&config, balance) {
            AdmissionDecision::Admit { amount_usdc } => amount_usdc,
            AdmissionDecision::Reject { reason } => {
                info!(mint = %candidate.mint, reason = reason.as_str(), "candidate rejected");
                self.alerts.publish(AlertEvent::Rejected {
                    mint: candidate.mint,
                    reason: reason.as_str().to_string(),
                });
                return;
            }
        };

        self.alerts.publish(AlertEvent::Admitted {
            mint: candidate.mint.clone(),
            amount_usdc,
        });

        let record = match self.buy(&candidate, amount_usdc, &config).await {
            Ok(record) => record,
            Err(err) => {
                warn!(mint = %candidate.mint, %err, "entry swap failed");
                self.alerts.publish(AlertEvent::Error {
                    context: format!("entry swap for {} failed: {}", candidate.mint, err),
                });
                return;
            }
        };

        if !self.registry.admit(record.clone()).await {
            // Should be unreachable while dispatch is single-task; the
            // tokens are in the wallet either way, so make it loud.
            error!(mint = %record.mint, "registry already tracks this mint after entry");
            self.alerts.publish(AlertEvent::Error {
                context: format!("duplicate registry entry for {}", record.mint),
            });
            return;
        }
        *self.last_admitted.lock().await = Some(Instant::now());

        info!(
            mint = %record.mint,
            symbol = %record.symbol,
            amount_usdc,
            entry_price = record.entry_price,
            tx = %record.entry_tx,
            "position entered"
        );
        self.alerts.publish(AlertEvent::Bought {
            mint: record.mint.clone(),
            symbol: record.symbol.clone(),
            price: record.entry_price,
            amount_usdc,
            tx: record.entry_tx.clone(),
        });

        self.spawn_monitor(record).await;
    }

    async fn buy(
        &self,
        candidate: &TradeCandidate,
        amount_usdc: f64,
        config: &RiskConfig,
    ) -> Result<TradeRecord, GatewayError> {
        let amount_units =
            (amount_usdc * 10f64.powi(self.engine_config.quote_decimals as i32)) as u64;

        let quote = self
            .gateway
            .quote(
                &self.detector_config.quote_mint,
                &candidate.mint,
                amount_units,
                config.slippage_bps,
            )
            .await?;
        self.gateway.simulate(&quote).await?;
        let tx = self
            .gateway
            .execute(&quote, config.priority_fee_lamports)
            .await?;

        // Quote-implied entry price; the monitor refines it while Entering.
        let tokens_out =
            quote.out_amount as f64 / 10f64.powi(candidate.metadata.decimals as i32);
        let entry_price = if tokens_out > 0.0 {
            amount_usdc / tokens_out
        } else {
            0.0
        };

        Ok(TradeRecord::new(
            candidate.mint.clone(),
            candidate.metadata.symbol.clone(),
            candidate.metadata.decimals,
            entry_price,
            amount_usdc,
            tx,
        ))
    }

    async fn spawn_monitor(&self, record: TradeRecord) {
        let mint = record.mint.clone();
        let (command_tx, command_rx) = mpsc::channel(4);

        let monitor = PositionMonitor::new(
            record,
            Arc::clone(&self.gateway),
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
            self.alerts.clone(),
            self.detector_config.quote_mint.clone(),
            self.engine_config.quote_decimals,
            self.shutdown.subscribe(),
            command_rx,
        );
        // A monitor that closes its position on its own prunes its map
        // entry, so `stop` only drains positions still open. The generation
        // check keeps a late prune from evicting a re-entered mint.
        let generation = self.monitor_seq.fetch_add(1, Ordering::Relaxed);
        let monitor_map = Arc::clone(&self.monitors);
        let cleanup_mint = mint.clone();
        let mut monitors = self.monitors.lock().await;
        let handle = tokio::spawn(async move {
            let outcome = monitor.run().await;
            let mut monitors = monitor_map.lock().await;
            if monitors
                .get(&cleanup_mint)
                .is_some_and(|entry| entry.generation == generation)
            {
                monitors.remove(&cleanup_mint);
            }
            outcome
        });
        monitors.insert(
            mint,
            MonitorEntry {
                generation,
                handle,
                commands: command_tx,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::TokenMetadata;
    use crate::ports::mocks::{MockEventSource, MockGateway, MockInspector, MockMetadata};

    const MINT: &str = "N3wM1ntAddr111111111111111111111111111111111";

    fn candidate() -> TradeCandidate {
        TradeCandidate::new(
            MINT.to_string(),
            TokenMetadata {
                name: "Test".to_string(),
                symbol: "TST".to_string(),
                decimals: 6,
            },
            "sig1".to_string(),
        )
    }

    fn fast_risk() -> RiskConfig {
        RiskConfig {
            price_check_interval: Duration::from_millis(50),
            cooldown: Duration::from_secs(0),
            ..Default::default()
        }
    }

    fn engine_with(gateway: MockGateway, inspector: MockInspector) -> Arc<SniperEngine> {
        engine_with_risk(gateway, inspector, RiskConfig::default())
    }

    fn engine_with_risk(
        gateway: MockGateway,
        inspector: MockInspector,
        risk: RiskConfig,
    ) -> Arc<SniperEngine> {
        let (events, _tx) = MockEventSource::channel(8);
        Arc::new(SniperEngine::new(
            risk,
            DetectorConfig::default(),
            EngineConfig::default(),
            TokenFilters::default(),
            Arc::new(gateway),
            Arc::new(inspector),
            Arc::new(MockMetadata::default()),
            Arc::new(events),
        ))
    }

    fn clean_inspector() -> MockInspector {
        MockInspector::new()
            .with_liquidity(5_000.0)
            .with_verified(true)
            .with_antibot(false)
    }

    #[tokio::test]
    async fn test_guard_rejection_publishes_reason() {
        let inspector = MockInspector::new()
            .with_liquidity(10.0)
            .with_verified(true)
            .with_antibot(false);
        let engine = engine_with(MockGateway::new(), inspector);
        let mut alerts = engine.alerts().subscribe();

        engine.handle_candidate(candidate()).await;

        assert!(matches!(
            alerts.recv().await.unwrap(),
            AlertEvent::Listed { .. }
        ));
        match alerts.recv().await.unwrap() {
            AlertEvent::Rejected { reason, .. } => assert_eq!(reason, "illiquid"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(engine.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_wallet_rejects_with_insufficient_balance() {
        let gateway = MockGateway::new().with_balance(0.0);
        let engine = engine_with(gateway, clean_inspector());
        let mut alerts = engine.alerts().subscribe();

        engine.handle_candidate(candidate()).await;

        let mut rejected_reason = None;
        while let Ok(event) = alerts.try_recv() {
            if let AlertEvent::Rejected { reason, .. } = event {
                rejected_reason = Some(reason);
            }
        }
        assert_eq!(rejected_reason.as_deref(), Some("insufficient_balance"));
    }

    #[tokio::test]
    async fn test_admitted_candidate_is_bought_and_tracked() {
        let gateway = MockGateway::new().with_price_sequence(MINT, &[1.0]);
        let engine = engine_with(gateway, clean_inspector());

        engine.handle_candidate(candidate()).await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].mint, MINT);
        assert!(engine.last_admitted.lock().await.is_some());
        assert_eq!(engine.monitors.lock().await.len(), 1);

        // second sighting of the same mint is a duplicate
        let mut alerts = engine.alerts().subscribe();
        engine.handle_candidate(candidate()).await;
        let mut rejected_reason = None;
        while let Ok(event) = alerts.try_recv() {
            if let AlertEvent::Rejected { reason, .. } = event {
                rejected_reason = Some(reason);
            }
        }
        assert_eq!(rejected_reason.as_deref(), Some("duplicate"));

        let report = engine.stop().await;
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].reason, ExitReason::Shutdown);
        assert!(report.unresolved.is_empty());
        assert!(engine.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_entry_swap_failure_leaves_no_record() {
        let gateway = MockGateway::new().with_price_sequence(MINT, &[1.0]);
        gateway.fail_next_executes(10);
        let engine = engine_with(gateway, clean_inspector());

        engine.handle_candidate(candidate()).await;
        assert!(engine.snapshot().await.is_empty());
        assert!(engine.monitors.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_fails_when_subscription_fails() {
        let (events, _tx) = MockEventSource::channel(8);
        events.fail_subscribe(ChainEventError::Authentication(
            "bad api key".to_string(),
        ));
        let engine = Arc::new(SniperEngine::new(
            RiskConfig::default(),
            DetectorConfig::default(),
            EngineConfig::default(),
            TokenFilters::default(),
            Arc::new(MockGateway::new()),
            Arc::new(clean_inspector()),
            Arc::new(MockMetadata::default()),
            Arc::new(events),
        ));

        assert!(engine.start().await.is_err());
        assert_eq!(engine.status().await, EngineStatus::Error);
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let engine = engine_with(MockGateway::new(), clean_inspector());
        let report = engine.stop().await;
        assert!(report.resolved.is_empty());
        assert!(report.unresolved.is_empty());
        assert_eq!(engine.status().await, EngineStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_closed_position_is_pruned_before_stop() {
        let gateway = MockGateway::new().with_price_sequence(MINT, &[100.0, 110.0, 125.0]);
        let engine = engine_with_risk(gateway, clean_inspector(), fast_risk());

        engine.handle_candidate(candidate()).await;
        assert_eq!(engine.monitors.lock().await.len(), 1);

        let mut pruned = false;
        for _ in 0..500 {
            if engine.monitors.lock().await.is_empty() {
                pruned = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(pruned, "monitor entry still present after target exit");
        assert!(!engine.close_position(MINT).await);

        // nothing was open at stop time, so nothing to report
        let report = engine.stop().await;
        assert!(report.resolved.is_empty());
        assert!(report.unresolved.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_event_stream_surfaces_as_error() {
        let (events, events_tx) = MockEventSource::channel(8);
        let engine = Arc::new(SniperEngine::new(
            RiskConfig::default(),
            DetectorConfig::default(),
            EngineConfig::default(),
            TokenFilters::default(),
            Arc::new(MockGateway::new()),
            Arc::new(clean_inspector()),
            Arc::new(MockMetadata::default()),
            Arc::new(events),
        ));
        let mut alerts = engine.alerts().subscribe();

        engine.start().await.unwrap();
        drop(events_tx);

        let mut status = engine.status().await;
        for _ in 0..500 {
            status = engine.status().await;
            if status == EngineStatus::Error {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, EngineStatus::Error);

        match alerts.recv().await.unwrap() {
            AlertEvent::Error { context } => assert!(context.contains("intake")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_manual_close() {
        let gateway = MockGateway::new().with_price_sequence(MINT, &[1.0]);
        let engine = engine_with(gateway, clean_inspector());

        engine.handle_candidate(candidate()).await;
        assert!(engine.close_position(MINT).await);
        assert!(!engine.close_position("unknown").await);
    }
}
