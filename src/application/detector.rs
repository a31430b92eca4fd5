//! Listing Detector
//!
//! Turns the raw parsed-transaction stream into trade candidates. Each event
//! runs through signature dedup, pool-initialization decoding, quote-pair
//! resolution, and the allow/deny lists before metadata is resolved and the
//! candidate is forwarded to the engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::admission::TokenFilters;
use crate::domain::candidate::{TokenMetadata, TradeCandidate};
use crate::domain::dedup::{self, SignatureCache};
use crate::ports::chain_events::ParsedTxEvent;
use crate::ports::inspector::MetadataSource;

/// Raydium AMM v4 program.
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Account positions in the Raydium `initialize2` instruction. The parsed
/// instruction carries 21 accounts; coin and pc mint sit at fixed offsets.
const INIT2_ACCOUNT_COUNT: usize = 21;
const INIT2_COIN_MINT_IDX: usize = 8;
const INIT2_PC_MINT_IDX: usize = 9;

/// Mint pair pulled out of a pool-initialization transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInit {
    pub coin_mint: String,
    pub pc_mint: String,
}

/// Detector tuning, filled in from the `[detector]` config section.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// AMM program whose transactions we watch.
    pub program_id: String,
    /// Quote-side mint; a new pool must pair against this.
    pub quote_mint: String,
    pub dedup_capacity: usize,
    pub dedup_ttl_secs: u64,
    /// Capacity of the candidate channel toward the engine.
    pub channel_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            program_id: RAYDIUM_AMM_V4.to_string(),
            quote_mint: crate::config::USDC_MINT.to_string(),
            dedup_capacity: dedup::DEFAULT_CAPACITY,
            dedup_ttl_secs: dedup::DEFAULT_TTL.as_secs(),
            channel_capacity: 64,
        }
    }
}

/// Decode a pool initialization out of a parsed transaction. Requires the
/// `initialize2` log line and an instruction against `program_id` carrying
/// the full account list.
pub fn decode_pool_init(event: &ParsedTxEvent, program_id: &str) -> Option<PoolInit> {
    if event.failed {
        return None;
    }

    if !event.logs.iter().any(|line| line.contains("initialize2")) {
        return None;
    }

    event
        .instructions
        .iter()
        .find(|ix| ix.program_id == program_id && ix.accounts.len() >= INIT2_ACCOUNT_COUNT)
        .map(|ix| PoolInit {
            coin_mint: ix.accounts[INIT2_COIN_MINT_IDX].clone(),
            pc_mint: ix.accounts[INIT2_PC_MINT_IDX].clone(),
        })
}

/// Exactly one side of the pool must be the quote mint; the other side is
/// the newly listed token. Pools not involving the quote asset are skipped.
pub fn resolve_new_token(pool: &PoolInit, quote_mint: &str) -> Option<String> {
    match (pool.coin_mint == quote_mint, pool.pc_mint == quote_mint) {
        (true, false) => Some(pool.pc_mint.clone()),
        (false, true) => Some(pool.coin_mint.clone()),
        _ => None,
    }
}

pub struct ListingDetector {
    config: DetectorConfig,
    filters: TokenFilters,
    metadata: Arc<dyn MetadataSource>,
    cache: SignatureCache,
}

impl ListingDetector {
    pub fn new(
        config: DetectorConfig,
        filters: TokenFilters,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        let cache = SignatureCache::new(
            config.dedup_capacity,
            std::time::Duration::from_secs(config.dedup_ttl_secs),
        );
        Self {
            config,
            filters,
            metadata,
            cache,
        }
    }

    /// Drain `events` until the source closes, forwarding candidates on
    /// `out`. When the engine falls behind, new candidates are dropped
    /// rather than queued without bound.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ParsedTxEvent>,
        out: mpsc::Sender<TradeCandidate>,
    ) {
        info!(program = %self.config.program_id, "listing detector started");

        while let Some(event) = events.recv().await {
            if let Some(candidate) = self.inspect_event(event).await {
                match out.try_send(candidate) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(dropped)) => {
                        warn!(mint = %dropped.mint, "candidate channel full, dropping listing");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        info!("candidate channel closed, detector stopping");
                        return;
                    }
                }
            }
        }

        info!("event stream ended, detector stopping");
    }

    async fn inspect_event(&mut self, event: ParsedTxEvent) -> Option<TradeCandidate> {
        if !self.cache.insert(&event.signature) {
            return None;
        }

        if event.failed {
            return None;
        }

        let pool = decode_pool_init(&event, &self.config.program_id)?;
        let mint = resolve_new_token(&pool, &self.config.quote_mint)?;

        if !self.filters.allows(&mint) {
            debug!(%mint, "listing filtered out");
            return None;
        }

        let metadata = match self.metadata.resolve(&mint).await {
            Ok(meta) => meta,
            Err(err) => {
                debug!(%mint, %err, "metadata lookup failed, using placeholder");
                TokenMetadata::placeholder(&mint)
            }
        };

        info!(%mint, symbol = %metadata.symbol, "new listing detected");
        Some(TradeCandidate::new(mint, metadata, event.signature))
    }
}
