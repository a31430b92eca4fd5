//! Hand-rolled port mocks shared by unit and integration tests.
//!
//! Each mock records its calls and plays back scripted responses, so tests
//! stay deterministic with no network access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::candidate::TokenMetadata;
use crate::ports::chain_events::{ChainEventError, ChainEventSource, ParsedTxEvent};
use crate::ports::gateway::{GatewayError, SwapGateway, SwapQuote, SwapRejection};
use crate::ports::inspector::{InspectError, MetadataError, MetadataSource, TokenInspector};

/// Mint string the mock gateway treats as the quote asset.
pub const MOCK_QUOTE_MINT: &str = "MockUSDC11111111111111111111111111111111111";

/// Scripted swap gateway.
///
/// Prices are played back per mint from a queue; when a queue runs dry the
/// last value repeats. Executes are counted and can be made to fail.
#[derive(Debug, Default)]
pub struct MockGateway {
    prices: Mutex<HashMap<String, VecDeque<f64>>>,
    last_price: Mutex<HashMap<String, f64>>,
    quote_impact_pct: Mutex<f64>,
    simulate_rejection: Mutex<Option<SwapRejection>>,
    execute_failures_remaining: Mutex<u32>,
    balance_usdc: Mutex<f64>,
    executes: Mutex<Vec<(String, String, u64)>>,
    tx_counter: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        let gw = Self::default();
        *gw.balance_usdc.lock().unwrap() = 1_000.0;
        gw
    }

    /// Queue a price sequence for a mint; one value is consumed per
    /// `price()` call, then the last value repeats.
    pub fn with_price_sequence(self, mint: &str, prices: &[f64]) -> Self {
        self.prices
            .lock()
            .unwrap()
            .insert(mint.to_string(), prices.iter().copied().collect());
        self
    }

    pub fn with_balance(self, usdc: f64) -> Self {
        *self.balance_usdc.lock().unwrap() = usdc;
        self
    }

    /// Price impact every quote reports.
    pub fn with_quote_impact(self, pct: f64) -> Self {
        *self.quote_impact_pct.lock().unwrap() = pct;
        self
    }

    /// Force the next `n` execute calls to fail transiently.
    pub fn fail_next_executes(&self, n: u32) {
        *self.execute_failures_remaining.lock().unwrap() = n;
    }

    /// Force every simulate call to reject with this reason.
    pub fn reject_simulations(&self, rejection: SwapRejection) {
        *self.simulate_rejection.lock().unwrap() = Some(rejection);
    }

    pub fn clear_simulation_rejection(&self) {
        *self.simulate_rejection.lock().unwrap() = None;
    }

    /// All (input_mint, output_mint, amount) triples passed to execute.
    pub fn executed(&self) -> Vec<(String, String, u64)> {
        self.executes.lock().unwrap().clone()
    }

    /// Number of executed sells (swaps out of a non-quote asset).
    pub fn sell_count(&self) -> usize {
        self.executes
            .lock()
            .unwrap()
            .iter()
            .filter(|(input, _, _)| input != MOCK_QUOTE_MINT)
            .count()
    }

    /// Number of executed buys (swaps out of the quote asset).
    pub fn buy_count(&self) -> usize {
        self.executes
            .lock()
            .unwrap()
            .iter()
            .filter(|(input, _, _)| input == MOCK_QUOTE_MINT)
            .count()
    }
}

#[async_trait]
impl SwapGateway for MockGateway {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, GatewayError> {
        Ok(SwapQuote {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            in_amount: amount,
            out_amount: amount.max(1),
            price_impact_pct: *self.quote_impact_pct.lock().unwrap(),
            route: vec!["MockVenue".to_string()],
            slippage_bps,
            raw: serde_json::Value::Null,
        })
    }

    async fn simulate(&self, quote: &SwapQuote) -> Result<(), GatewayError> {
        if let Some(rejection) = self.simulate_rejection.lock().unwrap().clone() {
            return Err(GatewayError::Rejected(rejection));
        }
        quote.validate(15.0, &[]).map_err(GatewayError::Rejected)
    }

    async fn execute(
        &self,
        quote: &SwapQuote,
        _priority_fee_lamports: u64,
    ) -> Result<String, GatewayError> {
        {
            let mut failures = self.execute_failures_remaining.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(GatewayError::Transient("mock execute failure".to_string()));
            }
        }
        self.executes.lock().unwrap().push((
            quote.input_mint.clone(),
            quote.output_mint.clone(),
            quote.in_amount,
        ));
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock-tx-{}", n))
    }

    async fn price(&self, mint: &str, _decimals: u8) -> Result<f64, GatewayError> {
        let mut prices = self.prices.lock().unwrap();
        if let Some(queue) = prices.get_mut(mint) {
            if let Some(price) = queue.pop_front() {
                self.last_price
                    .lock()
                    .unwrap()
                    .insert(mint.to_string(), price);
                if price <= 0.0 {
                    return Err(GatewayError::Transient(format!(
                        "invalid price reading for {}",
                        mint
                    )));
                }
                return Ok(price);
            }
        }
        match self.last_price.lock().unwrap().get(mint) {
            Some(price) if *price > 0.0 => Ok(*price),
            _ => Err(GatewayError::Transient(format!("no price for {}", mint))),
        }
    }

    async fn quote_balance_usdc(&self) -> Result<f64, GatewayError> {
        Ok(*self.balance_usdc.lock().unwrap())
    }
}

/// Scripted token inspector with call counters.
#[derive(Debug)]
pub struct MockInspector {
    liquidity_usdc: Mutex<f64>,
    verified: Mutex<bool>,
    antibot: Mutex<bool>,
    fail_transient: Mutex<bool>,
    liquidity_calls: AtomicUsize,
}

impl Default for MockInspector {
    fn default() -> Self {
        Self {
            liquidity_usdc: Mutex::new(10_000.0),
            verified: Mutex::new(true),
            antibot: Mutex::new(false),
            fail_transient: Mutex::new(false),
            liquidity_calls: AtomicUsize::new(0),
        }
    }
}

impl MockInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_liquidity(self, usdc: f64) -> Self {
        *self.liquidity_usdc.lock().unwrap() = usdc;
        self
    }

    pub fn with_verified(self, verified: bool) -> Self {
        *self.verified.lock().unwrap() = verified;
        self
    }

    pub fn with_antibot(self, antibot: bool) -> Self {
        *self.antibot.lock().unwrap() = antibot;
        self
    }

    /// Make every check fail transiently.
    pub fn fail_transiently(&self, fail: bool) {
        *self.fail_transient.lock().unwrap() = fail;
    }

    pub fn liquidity_calls(&self) -> usize {
        self.liquidity_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), InspectError> {
        if *self.fail_transient.lock().unwrap() {
            Err(InspectError::Transient("mock inspector failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenInspector for MockInspector {
    async fn liquidity_depth_usdc(
        &self,
        _mint: &str,
        _probe_usdc: f64,
    ) -> Result<f64, InspectError> {
        self.liquidity_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(*self.liquidity_usdc.lock().unwrap())
    }

    async fn is_verified(&self, _mint: &str) -> Result<bool, InspectError> {
        self.check_failure()?;
        Ok(*self.verified.lock().unwrap())
    }

    async fn has_antibot(&self, _mint: &str) -> Result<bool, InspectError> {
        self.check_failure()?;
        Ok(*self.antibot.lock().unwrap())
    }
}

/// Metadata source backed by a static map.
#[derive(Debug, Default)]
pub struct MockMetadata {
    entries: Mutex<HashMap<String, TokenMetadata>>,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, mint: &str, name: &str, symbol: &str, decimals: u8) -> Self {
        self.entries.lock().unwrap().insert(
            mint.to_string(),
            TokenMetadata {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }
}

#[async_trait]
impl MetadataSource for MockMetadata {
    async fn resolve(&self, mint: &str) -> Result<TokenMetadata, MetadataError> {
        self.entries
            .lock()
            .unwrap()
            .get(mint)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(mint.to_string()))
    }
}

/// Event source that hands out a pre-built channel once.
pub struct MockEventSource {
    receiver: Mutex<Option<mpsc::Receiver<ParsedTxEvent>>>,
    fail_with: Mutex<Option<ChainEventError>>,
}

impl MockEventSource {
    /// Returns the source and the sender used to inject events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Sender<ParsedTxEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                receiver: Mutex::new(Some(rx)),
                fail_with: Mutex::new(None),
            },
            tx,
        )
    }

    /// Make the next subscribe call fail (e.g. to test fatal auth errors).
    pub fn fail_subscribe(&self, err: ChainEventError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl ChainEventSource for MockEventSource {
    async fn subscribe(
        &self,
        _program_id: &str,
    ) -> Result<mpsc::Receiver<ParsedTxEvent>, ChainEventError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        self.receiver
            .lock()
            .unwrap()
            .take()
            .ok_or(ChainEventError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_price_sequence() {
        let gw = MockGateway::new().with_price_sequence("mint1", &[100.0, 110.0, 125.0]);

        assert_eq!(gw.price("mint1", 9).await.unwrap(), 100.0);
        assert_eq!(gw.price("mint1", 9).await.unwrap(), 110.0);
        assert_eq!(gw.price("mint1", 9).await.unwrap(), 125.0);
        // queue exhausted: last value repeats
        assert_eq!(gw.price("mint1", 9).await.unwrap(), 125.0);
    }

    #[tokio::test]
    async fn test_mock_gateway_zero_price_is_transient() {
        let gw = MockGateway::new().with_price_sequence("mint1", &[0.0, 50.0]);
        assert!(gw.price("mint1", 9).await.unwrap_err().is_transient());
        assert_eq!(gw.price("mint1", 9).await.unwrap(), 50.0);
    }

    #[tokio::test]
    async fn test_mock_gateway_counts_buys_and_sells() {
        let gw = MockGateway::new();
        let buy = gw
            .quote(MOCK_QUOTE_MINT, "token1", 1_000_000, 100)
            .await
            .unwrap();
        gw.execute(&buy, 0).await.unwrap();
        let sell = gw
            .quote("token1", MOCK_QUOTE_MINT, 500, 100)
            .await
            .unwrap();
        gw.execute(&sell, 0).await.unwrap();

        assert_eq!(gw.buy_count(), 1);
        assert_eq!(gw.sell_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_gateway_execute_failures() {
        let gw = MockGateway::new();
        gw.fail_next_executes(1);
        let quote = gw
            .quote(MOCK_QUOTE_MINT, "token1", 1_000, 100)
            .await
            .unwrap();
        assert!(gw.execute(&quote, 0).await.unwrap_err().is_transient());
        assert!(gw.execute(&quote, 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_metadata_fallback() {
        let meta = MockMetadata::new().with_token("mint1", "Test", "TST", 6);
        assert_eq!(meta.resolve("mint1").await.unwrap().symbol, "TST");
        assert!(matches!(
            meta.resolve("unknown").await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_event_source_single_subscribe() {
        let (source, _tx) = MockEventSource::channel(8);
        assert!(source.subscribe("program").await.is_ok());
        assert!(matches!(
            source.subscribe("program").await,
            Err(ChainEventError::ChannelClosed)
        ));
    }
}
