use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::ids::{BulkId, GameId};

/// External allocator of game identifiers.
///
/// Called once per successful submission with the full count; a result that
/// does not hold exactly `count` ids is treated as a generation failure.
#[async_trait]
pub trait GameIdGenerator: Send + Sync + 'static {
    async fn allocate(&self, count: usize) -> anyhow::Result<Vec<GameId>>;
}

/// Source of fresh bulk identifiers.
pub trait BulkIdGenerator: Send + Sync + 'static {
    fn next_bulk_id(&self) -> BulkId;
}

/// Length of generated ids.
pub const ID_LEN: usize = 8;

/// Random short ids cut from v4 uuids. Unique within one allocation; global
/// uniqueness is left to whatever persists the games.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGenerator;

impl UuidIdGenerator {
    fn short_id() -> String {
        let mut s = Uuid::new_v4().simple().to_string();
        s.truncate(ID_LEN);
        s
    }
}

#[async_trait]
impl GameIdGenerator for UuidIdGenerator {
    async fn allocate(&self, count: usize) -> anyhow::Result<Vec<GameId>> {
        let mut seen = HashSet::with_capacity(count);
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let id = Self::short_id();
            if seen.insert(id.clone()) {
                out.push(GameId::new(id));
            }
        }
        Ok(out)
    }
}

impl BulkIdGenerator for UuidIdGenerator {
    fn next_bulk_id(&self) -> BulkId {
        BulkId::new(Self::short_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocates_exact_count_of_distinct_ids() {
        let ids = UuidIdGenerator.allocate(499).await.unwrap();
        assert_eq!(ids.len(), 499);
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), 499);
        assert!(ids.iter().all(|g| g.as_str().len() == ID_LEN));
    }

    #[tokio::test]
    async fn zero_count_allocates_nothing() {
        assert!(UuidIdGenerator.allocate(0).await.unwrap().is_empty());
    }

    #[test]
    fn bulk_ids_are_short() {
        let id = UuidIdGenerator.next_bulk_id();
        assert_eq!(id.as_str().len(), ID_LEN);
    }
}
