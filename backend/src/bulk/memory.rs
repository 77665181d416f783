use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::bulk::model::ScheduledBulk;
use crate::bulk::repository::{BulkRepository, RepositoryError};
use crate::ids::{BulkId, UserId};

/// In-memory bulk repository.
///
/// Check-and-insert happens under one lock, so two concurrent inserts cannot
/// both pass the collision check.
pub struct InMemoryBulkRepository {
    max_pending_per_owner: usize,
    bulks: Mutex<HashMap<BulkId, ScheduledBulk>>,
}

impl InMemoryBulkRepository {
    pub fn new(max_pending_per_owner: usize) -> Self {
        Self {
            max_pending_per_owner,
            bulks: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.bulks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bulks.lock().is_empty()
    }
}

#[async_trait]
impl BulkRepository for InMemoryBulkRepository {
    #[instrument(skip(self, bulk), target = "repository", fields(bulk_id = %bulk.id, owner = %bulk.owner))]
    async fn insert(&self, bulk: ScheduledBulk) -> Result<(), RepositoryError> {
        let mut bulks = self.bulks.lock();

        let pending: Vec<&ScheduledBulk> = bulks
            .values()
            .filter(|b| b.owner == bulk.owner && b.is_pending())
            .collect();

        if pending.len() >= self.max_pending_per_owner {
            warn!(pending = pending.len(), "owner has too many pending bulks");
            return Err(RepositoryError::TooManyPending {
                owner: bulk.owner.clone(),
                max: self.max_pending_per_owner,
            });
        }

        if let Some(existing) = pending.iter().find(|b| b.collides_with(&bulk)) {
            warn!(existing = %existing.id, "bulk collides with a pending bulk");
            return Err(RepositoryError::Collision {
                existing: existing.id.clone(),
            });
        }

        debug!(games = bulk.games.len(), "bulk inserted");
        bulks.insert(bulk.id.clone(), bulk);
        Ok(())
    }

    async fn list_pending(&self, owner: &UserId) -> Result<Vec<ScheduledBulk>, RepositoryError> {
        let mut out: Vec<ScheduledBulk> = self
            .bulks
            .lock()
            .values()
            .filter(|b| &b.owner == owner && b.is_pending())
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.pair_at, b.scheduled_at));
        Ok(out)
    }

    #[instrument(skip(self, at), target = "repository", fields(bulk_id = %id))]
    async fn mark_paired(
        &self,
        id: &BulkId,
        at: DateTime<Utc>,
    ) -> Result<ScheduledBulk, RepositoryError> {
        let mut bulks = self.bulks.lock();
        let bulk = bulks
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        if !bulk.mark_paired(at) {
            return Err(RepositoryError::AlreadyPaired(id.clone()));
        }

        debug!(paired_at = %at, "bulk marked paired");
        Ok(bulk.clone())
    }

    #[instrument(skip(self), target = "repository", fields(bulk_id = %id, owner = %owner))]
    async fn cancel(&self, owner: &UserId, id: &BulkId) -> Result<ScheduledBulk, RepositoryError> {
        let mut bulks = self.bulks.lock();

        match bulks.get(id) {
            Some(b) if &b.owner != owner => return Err(RepositoryError::NotFound(id.clone())),
            Some(b) if !b.is_pending() => return Err(RepositoryError::AlreadyPaired(id.clone())),
            Some(_) => {}
            None => return Err(RepositoryError::NotFound(id.clone())),
        }

        let removed = bulks
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        info!("pending bulk cancelled");
        Ok(removed)
    }
}
