//! Bounded Signature Deduplication
//!
//! The listing detector sees every transaction touching the AMM program and
//! must not process the same signature twice. An unbounded seen-set would
//! leak for the lifetime of the process, so eviction is explicit: oldest
//! entries fall off when the cache is over capacity, and entries past the
//! TTL are expired on insert.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Default capacity bound
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default entry time-to-live
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Capacity- and TTL-bounded cache of recently seen signatures.
#[derive(Debug)]
pub struct SignatureCache {
    capacity: usize,
    ttl: Duration,
    seen: HashMap<String, Instant>,
    order: VecDeque<String>,
}

impl SignatureCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            seen: HashMap::with_capacity(capacity.max(1)),
            order: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Record a signature. Returns `true` if it was not already present
    /// (i.e. the caller should process the event).
    pub fn insert(&mut self, signature: &str) -> bool {
        self.evict(Instant::now());

        if self.seen.contains_key(signature) {
            return false;
        }

        self.seen.insert(signature.to_string(), Instant::now());
        self.order.push_back(signature.to_string());
        true
    }

    /// Whether a signature is currently tracked (ignoring pending eviction)
    pub fn contains(&self, signature: &str) -> bool {
        self.seen.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn evict(&mut self, now: Instant) {
        // Expired entries first (insertion order == age order)
        while let Some(front) = self.order.front() {
            let expired = self
                .seen
                .get(front)
                .is_some_and(|inserted| now.duration_since(*inserted) >= self.ttl);
            if !expired {
                break;
            }
            if let Some(sig) = self.order.pop_front() {
                self.seen.remove(&sig);
            }
        }

        // Then enforce the capacity bound
        while self.seen.len() >= self.capacity {
            match self.order.pop_front() {
                Some(sig) => {
                    self.seen.remove(&sig);
                }
                None => break,
            }
        }
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
