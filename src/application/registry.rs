//! Trade Registry
//!
//! Single source of truth mapping token mint to trade state. Every mutation
//! goes through one mutex, so `admit` is the linearization point that keeps
//! concurrent admissions for the same token from both succeeding.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::trade::{TradeRecord, TradeStatus};

/// Serialized map of open trades.
#[derive(Debug, Default)]
pub struct TradeRegistry {
    inner: Mutex<HashMap<String, TradeRecord>>,
}

impl TradeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record keyed by its mint. Returns `false` (leaving the
    /// existing record untouched) if the token is already tracked.
    pub async fn admit(&self, record: TradeRecord) -> bool {
        let mut map = self.inner.lock().await;
        if map.contains_key(&record.mint) {
            return false;
        }
        map.insert(record.mint.clone(), record);
        true
    }

    /// Remove and return the record for a mint.
    pub async fn remove(&self, mint: &str) -> Option<TradeRecord> {
        self.inner.lock().await.remove(mint)
    }

    /// Read-only copy of one record.
    pub async fn get(&self, mint: &str) -> Option<TradeRecord> {
        self.inner.lock().await.get(mint).cloned()
    }

    /// Update the lifecycle status of a tracked record.
    pub async fn set_status(&self, mint: &str, status: TradeStatus) -> bool {
        match self.inner.lock().await.get_mut(mint) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }

    /// Copy of every tracked record, for control surfaces and shutdown.
    pub async fn snapshot(&self) -> Vec<TradeRecord> {
        self.inner.lock().await.values().cloned().collect()
    }

    /// Number of live (non-closed) records.
    pub async fn open_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .values()
            .filter(|r| r.status.is_live())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
