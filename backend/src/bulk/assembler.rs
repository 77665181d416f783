use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::bulk::ids::{BulkIdGenerator, GameIdGenerator};
use crate::bulk::model::{BulkSetup, Mode, ScheduledBulk, ScheduledGame};
use crate::error::ScheduleError;
use crate::ids::UserId;
use crate::logger::warn_if_slow;
use crate::metrics::BulkMetrics;
use crate::pairing::PlayerPair;

/// Turns authorized player pairs into a `ScheduledBulk`.
///
/// Game ids are requested in a single batch, only once every token has been
/// authorized; nothing is allocated for a rejected submission.
pub struct BulkAssembler {
    game_ids: Arc<dyn GameIdGenerator>,
    bulk_ids: Arc<dyn BulkIdGenerator>,
    metrics: Arc<dyn BulkMetrics>,
}

impl BulkAssembler {
    pub fn new(
        game_ids: Arc<dyn GameIdGenerator>,
        bulk_ids: Arc<dyn BulkIdGenerator>,
        metrics: Arc<dyn BulkMetrics>,
    ) -> Self {
        Self {
            game_ids,
            bulk_ids,
            metrics,
        }
    }

    #[instrument(
        skip(self, pairs, setup, now),
        target = "assembler",
        fields(owner = %owner, pairs = pairs.len())
    )]
    pub async fn assemble(
        &self,
        pairs: Vec<PlayerPair>,
        owner: &UserId,
        setup: &BulkSetup,
        now: DateTime<Utc>,
    ) -> Result<ScheduledBulk, ScheduleError> {
        let count = pairs.len();

        let game_ids = warn_if_slow("allocate_game_ids", Duration::from_millis(200), async {
            self.game_ids.allocate(count).await
        })
        .await
        .context("game id allocation failed")
        .map_err(ScheduleError::GenerationFailure)?;

        if game_ids.len() != count {
            return Err(ScheduleError::GenerationFailure(anyhow!(
                "generator returned {} ids for {} pairs",
                game_ids.len(),
                count
            )));
        }

        let games: Vec<ScheduledGame> = game_ids
            .into_iter()
            .zip(pairs)
            .map(|(id, p)| ScheduledGame {
                id,
                white: p.white,
                black: p.black,
            })
            .collect();

        let bulk = ScheduledBulk {
            id: self.bulk_ids.next_bulk_id(),
            owner: owner.clone(),
            games,
            variant: setup.variant,
            clock: setup.clock,
            mode: Mode::from_rated(setup.rated),
            rules: setup.rules.clone(),
            message: setup.message.clone(),
            pair_at: setup.pair_at.unwrap_or(now),
            start_clocks_at: setup.start_clocks_at,
            scheduled_at: now,
            paired_at: None,
        };

        // Fire-and-forget: a failing sink never fails the bulk.
        if let Err(e) = self.metrics.record_scheduled(owner, count as u64) {
            warn!(error = ?e, %owner, pairs = count, "failed to record scheduled pairs");
        }

        debug!(bulk_id = %bulk.id, games = bulk.games.len(), "bulk assembled");
        Ok(bulk)
    }
}
