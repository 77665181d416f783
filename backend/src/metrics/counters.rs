use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::ids::UserId;
use crate::metrics::BulkMetrics;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub bulks_scheduled: Arc<AtomicU64>,
    pub pairs_scheduled: Arc<AtomicU64>,

    // rejection reasons
    pub bulks_rejected: Arc<AtomicU64>,
    pub tokens_rejected: Arc<AtomicU64>,
    pub bulks_invalid_input: Arc<AtomicU64>,
    pub bulks_collided: Arc<AtomicU64>,

    /// Pairs scheduled per owner.
    pub pairs_by_owner: Arc<Mutex<HashMap<UserId, u64>>>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn pairs_for(&self, owner: &UserId) -> u64 {
        self.pairs_by_owner.lock().get(owner).copied().unwrap_or(0)
    }
}

impl BulkMetrics for Counters {
    fn record_scheduled(&self, owner: &UserId, pairs: u64) -> anyhow::Result<()> {
        Self::add(&self.pairs_scheduled, pairs);
        *self.pairs_by_owner.lock().entry(owner.clone()).or_insert(0) += pairs;
        Ok(())
    }
}
