//! Caller-facing bulk scheduling.
//!
//! Responsibilities:
//! - Validate raw token input and the bulk setup (no network calls on failure).
//! - Authorize every token with bounded concurrency.
//! - Rebuild player pairs in submission order and assemble the bulk.
//!
//! Non-responsibilities:
//! - Persisting the bulk or enforcing the collision rule (`BulkRepository`).
//! - Creating the games at `pair_at`.
//! - Retrying rejected tokens.
//!
//! Pipeline: extracted -> authorizing -> (rejected | authorized) -> assembled.
//! Each call runs it exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, field, info, instrument};

use crate::auth::{BadToken, Resolution, ScopeSet, TokenAuthorizer, bulk_pairing_scopes, resolve_all};
use crate::bulk::assembler::BulkAssembler;
use crate::bulk::ids::{BulkIdGenerator, GameIdGenerator};
use crate::bulk::model::{BulkSetup, ScheduledBulk};
use crate::config::AppConfig;
use crate::error::ScheduleError;
use crate::ids::UserId;
use crate::logger::warn_if_slow;
use crate::metrics::BulkMetrics;
use crate::metrics::counters::Counters;
use crate::pairing::reconstruct_pairs;
use crate::tokens::validate_pairs;

/// Result of a scheduling run that got past input validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled(ScheduledBulk),
    /// Every token the authorization service refused, in submission order.
    Rejected(Vec<BadToken>),
}

pub struct BulkScheduler {
    authorizer: Arc<dyn TokenAuthorizer>,
    assembler: BulkAssembler,

    /// Scopes every player token must carry.
    required: ScopeSet,

    /// Pair count bound (exclusive).
    max_games: usize,

    /// Authorization calls allowed in flight.
    auth_concurrency: usize,

    max_schedule_ahead: Duration,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl BulkScheduler {
    pub fn new(
        cfg: &AppConfig,
        authorizer: Arc<dyn TokenAuthorizer>,
        game_ids: Arc<dyn GameIdGenerator>,
        bulk_ids: Arc<dyn BulkIdGenerator>,
        metrics: Arc<dyn BulkMetrics>,
        counters: Counters,
    ) -> Self {
        Self {
            authorizer,
            assembler: BulkAssembler::new(game_ids, bulk_ids, metrics),
            required: bulk_pairing_scopes(),
            max_games: cfg.max_games,
            auth_concurrency: cfg.auth_concurrency.max(1),
            max_schedule_ahead: cfg.max_schedule_ahead,
            counters,
        }
    }

    /// Validates, authorizes and assembles one bulk for `owner`.
    ///
    /// Flow:
    /// 1) Extract pairs and apply the form-level checks.
    /// 2) Validate the setup against `now`.
    /// 3) Authorize all tokens; any refusal ends the run with `Rejected`.
    /// 4) Rebuild pairs in submission order.
    /// 5) Allocate game ids in one batch and build the bulk.
    #[instrument(
        skip(self, raw, setup, now),
        target = "scheduler",
        fields(owner = %owner, pairs = field::Empty, bulk_id = field::Empty)
    )]
    pub async fn schedule_bulk(
        &self,
        raw: &str,
        setup: &BulkSetup,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, ScheduleError> {
        let pairs = validate_pairs(raw, self.max_games)
            .and_then(|pairs| setup.validate(now, self.max_schedule_ahead).map(|_| pairs))
            .inspect_err(|e| {
                Counters::incr(&self.counters.bulks_invalid_input);
                info!(error = %e, "bulk input rejected");
            })?;

        tracing::Span::current().record("pairs", pairs.len());
        debug!("authorizing tokens");

        let resolution = warn_if_slow(
            "authorize_tokens",
            Duration::from_secs(2),
            resolve_all(
                self.authorizer.as_ref(),
                &pairs,
                &self.required,
                self.auth_concurrency,
            ),
        )
        .await;

        let identities = match resolution {
            Resolution::Authorized(identities) => identities,
            Resolution::Rejected(bad) => {
                Counters::incr(&self.counters.bulks_rejected);
                Counters::add(&self.counters.tokens_rejected, bad.len() as u64);
                info!(bad_tokens = bad.len(), "bulk rejected by token authorization");
                return Ok(ScheduleOutcome::Rejected(bad));
            }
        };

        let players = reconstruct_pairs(identities)?;

        let bulk = self.assembler.assemble(players, owner, setup, now).await?;

        tracing::Span::current().record("bulk_id", field::display(&bulk.id));
        Counters::incr(&self.counters.bulks_scheduled);

        info!(
            games = bulk.games.len(),
            pair_at = %bulk.pair_at,
            "scheduled bulk successfully"
        );

        Ok(ScheduleOutcome::Scheduled(bulk))
    }
}
