use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::auth::{BadToken, Identity, ScopeSet, TokenAuthorizer};
use crate::tokens::{Side, TokenPair};

/// Origin of a dispatched token: its pair index and side.
///
/// Carried through the concurrent stage so that results can be put back in
/// submission order no matter which call completes first. Ordering is by
/// pair, then white before black, which is the flattened submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot {
    pub pair: usize,
    pub side: Side,
}

/// Fan-in result of a whole submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Every token resolved; identities are in submission order.
    Authorized(Vec<(Slot, Identity)>),
    /// At least one token failed. Holds every failure, in submission order.
    Rejected(Vec<BadToken>),
}

/// Authorizes every token of `pairs` with at most `concurrency` calls
/// outstanding.
///
/// No call is cancelled once dispatched: the stream is drained to the end even
/// after a failure, and every failure is reported.
#[instrument(
    skip(authorizer, pairs, required),
    target = "auth",
    fields(pairs = pairs.len())
)]
pub async fn resolve_all<A>(
    authorizer: &A,
    pairs: &[TokenPair],
    required: &ScopeSet,
    concurrency: usize,
) -> Resolution
where
    A: TokenAuthorizer + ?Sized,
{
    let units = pairs.iter().enumerate().flat_map(|(pair, p)| {
        [Side::White, Side::Black]
            .into_iter()
            .map(move |side| (Slot { pair, side }, p.token(side)))
    });

    let mut completions = stream::iter(units)
        .map(|(slot, token)| async move {
            let result = authorizer.authorize(token, required).await;
            (slot, token, result)
        })
        .buffer_unordered(concurrency.max(1));

    let mut identities = Vec::with_capacity(pairs.len() * 2);
    let mut rejected = Vec::new();

    while let Some((slot, token, result)) = completions.next().await {
        match result {
            Ok(identity) => identities.push((slot, identity)),
            Err(error) => {
                warn!(
                    pair = slot.pair,
                    side = ?slot.side,
                    error = %error,
                    "token rejected by authorization service"
                );
                rejected.push((
                    slot,
                    BadToken {
                        token: token.clone(),
                        error,
                    },
                ));
            }
        }
    }

    if rejected.is_empty() {
        identities.sort_by_key(|(slot, _)| *slot);
        debug!(tokens = identities.len(), "all tokens authorized");
        Resolution::Authorized(identities)
    } else {
        rejected.sort_by_key(|(slot, _)| *slot);
        Resolution::Rejected(rejected.into_iter().map(|(_, bad)| bad).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::auth::{AuthError, bulk_pairing_scopes};
    use crate::ids::UserId;
    use crate::tokens::TokenId;

    /// Resolves `tok_<user>` to `<user>` after a per-token delay, tracking the
    /// peak number of concurrent calls.
    #[derive(Default)]
    struct DelayedAuthorizer {
        delays_ms: HashMap<String, u64>,
        failures: HashMap<String, AuthError>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenAuthorizer for DelayedAuthorizer {
        async fn authorize(
            &self,
            token: &TokenId,
            required: &ScopeSet,
        ) -> Result<Identity, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays_ms.get(token.as_str()).copied().unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(e) = self.failures.get(token.as_str()) {
                return Err(e.clone());
            }
            let user = token.as_str().trim_start_matches("tok_");
            Ok(Identity {
                user: UserId::from(user),
                scopes: required.clone(),
            })
        }
    }

    fn mk_pairs(n: usize) -> Vec<TokenPair> {
        (0..n)
            .map(|i| TokenPair::new(format!("tok_w{i}"), format!("tok_b{i}")))
            .collect()
    }

    fn users(res: &Resolution) -> Vec<String> {
        match res {
            Resolution::Authorized(ids) => ids.iter().map(|(_, i)| i.user.to_string()).collect(),
            Resolution::Rejected(bad) => panic!("unexpected rejection: {bad:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restores_submission_order_under_reversed_completion() {
        let pairs = mk_pairs(4);
        // Later tokens finish first.
        let delays_ms = pairs
            .iter()
            .flat_map(|p| [p.white.to_string(), p.black.to_string()])
            .enumerate()
            .map(|(i, t)| (t, 100 - i as u64 * 10))
            .collect();
        let auth = DelayedAuthorizer {
            delays_ms,
            ..Default::default()
        };

        let res = resolve_all(&auth, &pairs, &bulk_pairing_scopes(), 8).await;

        assert_eq!(
            users(&res),
            vec!["w0", "b0", "w1", "b1", "w2", "b2", "w3", "b3"]
        );
        if let Resolution::Authorized(ids) = res {
            assert_eq!(
                ids[3].0,
                Slot {
                    pair: 1,
                    side: Side::Black
                }
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_concurrency_cap() {
        let auth = Arc::new(DelayedAuthorizer::default());
        let pairs = mk_pairs(20);

        let res = resolve_all(auth.as_ref(), &pairs, &bulk_pairing_scopes(), 8).await;

        assert_eq!(users(&res).len(), 40);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 40);
        assert_eq!(auth.peak.load(Ordering::SeqCst), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn collects_every_failure_in_submission_order() {
        let pairs = mk_pairs(5);
        let auth = DelayedAuthorizer {
            // The later failure completes first.
            delays_ms: HashMap::from([("tok_b4".to_string(), 1), ("tok_w1".to_string(), 50)]),
            failures: HashMap::from([
                ("tok_w1".to_string(), AuthError::Expired),
                ("tok_b4".to_string(), AuthError::Revoked),
            ]),
            ..Default::default()
        };

        let res = resolve_all(&auth, &pairs, &bulk_pairing_scopes(), 8).await;

        assert_eq!(
            res,
            Resolution::Rejected(vec![
                BadToken {
                    token: TokenId::from("tok_w1"),
                    error: AuthError::Expired
                },
                BadToken {
                    token: TokenId::from("tok_b4"),
                    error: AuthError::Revoked
                },
            ])
        );
        // In-flight work is not cancelled after the first failure.
        assert_eq!(auth.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn empty_submission_resolves_to_nothing() {
        let auth = DelayedAuthorizer::default();
        let res = resolve_all(&auth, &[], &bulk_pairing_scopes(), 8).await;
        assert_eq!(res, Resolution::Authorized(vec![]));
    }
}
