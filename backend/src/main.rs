use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use bulk_pairing::{
    auth::{AuthError, Identity, ScopeSet, TokenAuthorizer},
    bulk::{
        ids::UuidIdGenerator,
        memory::InMemoryBulkRepository,
        model::{BulkSetup, ClockConfig, Variant},
        repository::{BulkRepository, RepositoryError},
    },
    config::AppConfig,
    ids::UserId,
    logger::{TraceId, annotate_span, init_tracing, root_span},
    metrics::counters::Counters,
    scheduler::{BulkScheduler, ScheduleOutcome},
    time::now,
    tokens::TokenId,
};
use tracing::Instrument;

/// Token table read from `BULK_TOKEN_TABLE` (`token=user,token=user,...`).
struct StaticTokenAuthorizer {
    table: HashMap<TokenId, UserId>,
}

impl StaticTokenAuthorizer {
    fn from_env() -> Self {
        let raw = std::env::var("BULK_TOKEN_TABLE").unwrap_or_default();
        let table = raw
            .split(',')
            .filter_map(|entry| entry.split_once('='))
            .map(|(t, u)| (TokenId::from(t.trim()), UserId::from(u.trim())))
            .collect();
        Self { table }
    }
}

#[async_trait]
impl TokenAuthorizer for StaticTokenAuthorizer {
    async fn authorize(&self, token: &TokenId, required: &ScopeSet) -> Result<Identity, AuthError> {
        // TODO: Replace with the OAuth token introspection client.
        match self.table.get(token) {
            Some(user) => Ok(Identity {
                user: user.clone(),
                scopes: required.clone(),
            }),
            None => Err(AuthError::NoSuchToken),
        }
    }
}

fn setup_from_args(args: &[String]) -> anyhow::Result<BulkSetup> {
    let variant = match args.get(3) {
        Some(v) => v.parse::<Variant>()?,
        None => Variant::Standard,
    };
    Ok(BulkSetup::new(variant, ClockConfig::new(300, 3), true))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    let cfg = AppConfig::from_env();

    tracing::info!("Starting bulk pairing backend...");

    let args: Vec<String> = std::env::args().collect();
    let Some(raw_tokens) = args.get(1) else {
        anyhow::bail!("usage: bulk-pairing <white:black,...> [owner] [variant]");
    };
    let owner = UserId::new(args.get(2).cloned().unwrap_or_else(|| "organizer".to_string()));
    let setup = setup_from_args(&args)?;

    let counters = Counters::default();
    let ids = Arc::new(UuidIdGenerator);
    let scheduler = BulkScheduler::new(
        &cfg,
        Arc::new(StaticTokenAuthorizer::from_env()),
        ids.clone(),
        ids,
        Arc::new(counters.clone()),
        counters.clone(),
    );
    let repo = InMemoryBulkRepository::new(cfg.max_pending_per_owner);

    let span = root_span("schedule_bulk", &TraceId::random());
    async {
        annotate_span(owner.as_str(), None);

        match scheduler.schedule_bulk(raw_tokens, &setup, &owner, now()).await? {
            ScheduleOutcome::Scheduled(bulk) => {
                annotate_span(owner.as_str(), Some(bulk.id.as_str()));
                if let Err(e) = repo.insert(bulk.clone()).await {
                    if matches!(e, RepositoryError::Collision { .. }) {
                        Counters::incr(&counters.bulks_collided);
                    }
                    return Err(anyhow::Error::from(e));
                }
                tracing::info!(
                    variant = %bulk.variant,
                    clock = %bulk.clock,
                    games = bulk.games().len(),
                    "bulk stored"
                );
                println!("{}", serde_json::to_string_pretty(&bulk)?);
            }
            ScheduleOutcome::Rejected(bad) => {
                tracing::warn!(bad_tokens = bad.len(), "bulk rejected");
                println!("{}", serde_json::to_string_pretty(&bad)?);
            }
        }
        anyhow::Ok(())
    }
    .instrument(span)
    .await
}
