use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::bulk::model::ScheduledBulk;
use crate::ids::{BulkId, UserId};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("bulk collides with pending bulk {existing}")]
    Collision { existing: BulkId },

    #[error("{owner} already has {max} pending bulks")]
    TooManyPending { owner: UserId, max: usize },

    #[error("bulk not found: {0}")]
    NotFound(BulkId),

    #[error("bulk already paired: {0}")]
    AlreadyPaired(BulkId),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence seam for scheduled bulks.
///
/// `insert` is the only place the collision rule is enforced: a bulk is
/// refused if it collides with any pending bulk of the same owner.
#[async_trait]
pub trait BulkRepository: Send + Sync {
    async fn insert(&self, bulk: ScheduledBulk) -> Result<(), RepositoryError>;

    async fn list_pending(&self, owner: &UserId) -> Result<Vec<ScheduledBulk>, RepositoryError>;

    async fn mark_paired(
        &self,
        id: &BulkId,
        at: DateTime<Utc>,
    ) -> Result<ScheduledBulk, RepositoryError>;

    async fn cancel(&self, owner: &UserId, id: &BulkId) -> Result<ScheduledBulk, RepositoryError>;
}
