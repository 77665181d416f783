pub mod counters;

use crate::ids::UserId;

/// Observability sink for scheduled pairs.
///
/// Callers treat this as fire-and-forget: an `Err` is logged and dropped and
/// never affects the scheduling result.
pub trait BulkMetrics: Send + Sync {
    fn record_scheduled(&self, owner: &UserId, pairs: u64) -> anyhow::Result<()>;
}
