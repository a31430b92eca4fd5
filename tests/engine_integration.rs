//! End-to-end engine tests against scripted ports: websocket-style events
//! in, admission and swaps observed on the mocks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use listing_sniper::application::{
    AlertEvent, DetectorConfig, EngineConfig, SniperEngine,
};
use listing_sniper::domain::admission::TokenFilters;
use listing_sniper::domain::risk::RiskConfig;
use listing_sniper::domain::trade::ExitReason;
use listing_sniper::ports::chain_events::{ParsedInstruction, ParsedTxEvent};
use listing_sniper::ports::gateway::SwapGateway;
use listing_sniper::ports::inspector::TokenInspector;
use listing_sniper::ports::mocks::{
    MockEventSource, MockGateway, MockInspector, MockMetadata, MOCK_QUOTE_MINT,
};

const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
const MINT_A: &str = "M1ntAaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const MINT_B: &str = "M1ntBbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// A pool-creation transaction as the listener would deliver it: the
/// initialize2 instruction carries 21 accounts with the two mints at
/// positions 8 and 9.
fn init2_event(sig: &str, coin: &str, pc: &str) -> ParsedTxEvent {
    let mut accounts: Vec<String> = (0..21).map(|i| format!("acct{i}")).collect();
    accounts[8] = coin.to_string();
    accounts[9] = pc.to_string();

    ParsedTxEvent {
        signature: sig.to_string(),
        failed: false,
        instructions: vec![ParsedInstruction {
            program_id: RAYDIUM_AMM_V4.to_string(),
            accounts,
        }],
        logs: vec!["Program log: initialize2: InitializeInstruction2".to_string()],
    }
}

fn fast_risk() -> RiskConfig {
    RiskConfig {
        price_check_interval: Duration::from_millis(50),
        cooldown: Duration::from_secs(0),
        ..Default::default()
    }
}

struct Rig {
    engine: Arc<SniperEngine>,
    gateway: Arc<MockGateway>,
    inspector: Arc<MockInspector>,
    events_tx: mpsc::Sender<ParsedTxEvent>,
}

fn rig(gateway: MockGateway, risk: RiskConfig, filters: TokenFilters) -> Rig {
    let gateway = Arc::new(gateway);
    let inspector = Arc::new(
        MockInspector::new()
            .with_liquidity(5_000.0)
            .with_verified(true)
            .with_antibot(false),
    );
    let (events, events_tx) = MockEventSource::channel(16);

    let engine = Arc::new(SniperEngine::new(
        risk,
        DetectorConfig {
            quote_mint: MOCK_QUOTE_MINT.to_string(),
            ..Default::default()
        },
        EngineConfig {
            shutdown_timeout: Duration::from_secs(5),
            quote_decimals: 6,
        },
        filters,
        Arc::clone(&gateway) as Arc<dyn SwapGateway>,
        Arc::clone(&inspector) as Arc<dyn TokenInspector>,
        Arc::new(MockMetadata::default()),
        Arc::new(events),
    ));

    Rig {
        engine,
        gateway,
        inspector,
        events_tx,
    }
}

/// Poll until the condition holds; paused-clock sleeps advance virtual time.
async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn test_listing_flows_from_event_to_open_position() {
    let gateway = MockGateway::new().with_price_sequence(MINT_A, &[1.0]);
    let r = rig(gateway, fast_risk(), TokenFilters::default());

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let engine = Arc::clone(&r.engine);
    wait_for(|| {
        let engine = Arc::clone(&engine);
        async move { engine.snapshot().await.len() == 1 }
    })
    .await;

    let snapshot = r.engine.snapshot().await;
    assert_eq!(snapshot[0].mint, MINT_A);
    assert_eq!(r.gateway.buy_count(), 1);
    // the entry swap spends the quote asset
    assert_eq!(r.gateway.executed()[0].0, MOCK_QUOTE_MINT);
    assert!(r.inspector.liquidity_calls() >= 1);

    let report = r.engine.stop().await;
    assert_eq!(report.resolved.len(), 1);
    assert_eq!(report.resolved[0].reason, ExitReason::Shutdown);
    assert!(report.unresolved.is_empty());
    assert_eq!(r.gateway.sell_count(), 1);
    assert!(r.engine.snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_same_mint_is_entered_once() {
    let gateway = MockGateway::new().with_price_sequence(MINT_A, &[1.0]);
    let r = rig(gateway, fast_risk(), TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    // same signature twice (dedup), then the same pool under a fresh
    // signature (admission duplicate)
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();
    r.events_tx
        .send(init2_event("sig2", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let mut rejected = None;
    while rejected.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Rejected { reason, .. } => rejected = Some(reason),
            _ => {}
        }
    }
    assert_eq!(rejected.as_deref(), Some("duplicate"));
    assert_eq!(r.engine.snapshot().await.len(), 1);
    assert_eq!(r.gateway.buy_count(), 1);

    r.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_capacity_guard_limits_open_trades() {
    let risk = RiskConfig {
        max_open_trades: 1,
        ..fast_risk()
    };
    let gateway = MockGateway::new()
        .with_price_sequence(MINT_A, &[1.0])
        .with_price_sequence(MINT_B, &[1.0]);
    let r = rig(gateway, risk, TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();
    r.events_tx
        .send(init2_event("sig2", MINT_B, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let mut rejected = None;
    while rejected.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Rejected { mint, reason } => {
                assert_eq!(mint, MINT_B);
                rejected = Some(reason);
            }
            _ => {}
        }
    }
    assert_eq!(rejected.as_deref(), Some("capacity"));
    assert_eq!(r.engine.snapshot().await.len(), 1);

    r.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_guard_spaces_entries() {
    let risk = RiskConfig {
        cooldown: Duration::from_secs(30),
        ..fast_risk()
    };
    let gateway = MockGateway::new()
        .with_price_sequence(MINT_A, &[1.0])
        .with_price_sequence(MINT_B, &[1.0]);
    let r = rig(gateway, risk, TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();
    r.events_tx
        .send(init2_event("sig2", MINT_B, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let mut rejected = None;
    while rejected.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Rejected { mint, reason } => {
                assert_eq!(mint, MINT_B);
                rejected = Some(reason);
            }
            _ => {}
        }
    }
    assert_eq!(rejected.as_deref(), Some("cooldown"));

    r.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_blacklisted_mint_never_surfaces() {
    let filters = TokenFilters {
        whitelist: Vec::new(),
        blacklist: vec![MINT_A.to_string()],
    };
    let gateway = MockGateway::new()
        .with_price_sequence(MINT_A, &[1.0])
        .with_price_sequence(MINT_B, &[1.0]);
    let r = rig(gateway, fast_risk(), filters);
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();
    r.events_tx
        .send(init2_event("sig2", MINT_B, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    // only the allowed mint ever produces a Listed event
    loop {
        match alerts.recv().await.unwrap() {
            AlertEvent::Listed { mint, .. } => {
                assert_eq!(mint, MINT_B);
                break;
            }
            _ => {}
        }
    }
    let snapshot = r.engine.snapshot().await;
    assert!(snapshot.iter().all(|t| t.mint != MINT_A));

    r.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_target_exit_resolves_without_shutdown() {
    // entry refine 100, hold at 110, target at 125
    let gateway = MockGateway::new().with_price_sequence(MINT_A, &[100.0, 110.0, 125.0]);
    let r = rig(gateway, fast_risk(), TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let mut sold_reason = None;
    while sold_reason.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Sold { reason, .. } => sold_reason = Some(reason),
            _ => {}
        }
    }
    assert_eq!(sold_reason.as_deref(), Some("target"));
    assert_eq!(r.gateway.sell_count(), 1);
    assert!(r.engine.snapshot().await.is_empty());

    let report = r.engine.stop().await;
    // position already closed on its own, nothing left to unwind
    assert!(report.resolved.is_empty());
    assert!(report.unresolved.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_honeypot_impact_blocks_entry() {
    // every quote reports 20% impact, above the 15% honeypot threshold
    let gateway = MockGateway::new()
        .with_price_sequence(MINT_A, &[1.0])
        .with_quote_impact(20.0);
    let r = rig(gateway, fast_risk(), TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    // admitted by the guards, then turned away at simulation
    let mut entry_error = None;
    while entry_error.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Error { context } => entry_error = Some(context),
            AlertEvent::Bought { .. } => panic!("honeypot quote must not execute"),
            _ => {}
        }
    }
    assert!(r.engine.snapshot().await.is_empty());
    assert_eq!(r.gateway.buy_count(), 0);

    r.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_positions_that_cannot_sell() {
    let gateway = MockGateway::new().with_price_sequence(MINT_A, &[100.0]);
    let r = rig(
        gateway,
        fast_risk(),
        TokenFilters::default(),
    );

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let engine = Arc::clone(&r.engine);
    wait_for(|| {
        let engine = Arc::clone(&engine);
        async move { engine.snapshot().await.len() == 1 }
    })
    .await;

    // every exit attempt fails from here on
    r.gateway.fail_next_executes(u32::MAX);

    let report = r.engine.stop().await;
    assert!(report.resolved.is_empty());
    assert_eq!(report.unresolved, vec![MINT_A.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_close_through_engine() {
    let gateway = MockGateway::new().with_price_sequence(MINT_A, &[100.0]);
    let r = rig(gateway, fast_risk(), TokenFilters::default());
    let mut alerts = r.engine.alerts().subscribe();

    r.engine.start().await.unwrap();
    r.events_tx
        .send(init2_event("sig1", MINT_A, MOCK_QUOTE_MINT))
        .await
        .unwrap();

    let engine = Arc::clone(&r.engine);
    wait_for(|| {
        let engine = Arc::clone(&engine);
        async move { engine.snapshot().await.len() == 1 }
    })
    .await;

    assert!(r.engine.close_position(MINT_A).await);

    let mut sold_reason = None;
    while sold_reason.is_none() {
        match alerts.recv().await.unwrap() {
            AlertEvent::Sold { reason, .. } => sold_reason = Some(reason),
            _ => {}
        }
    }
    assert_eq!(sold_reason.as_deref(), Some("manual"));

    r.engine.stop().await;
}
