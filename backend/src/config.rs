use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Hard cap on pairs per bulk. A bulk must hold strictly fewer pairs than this.
pub const MAX_GAMES: usize = 500;

/// Authorization calls allowed in flight at once.
pub const AUTH_CONCURRENCY: usize = 8;

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Input limits
    // =========================
    /// Pair count bound for a single submission.
    ///
    /// Submissions with `max_games` pairs or more are rejected with
    /// `TooManyTokens` before any token is authorized.
    pub max_games: usize,

    // =========================
    // Authorization fan-out
    // =========================
    /// Maximum number of token authorizations outstanding at any moment.
    ///
    /// This is a fixed bound, never derived from the input size:
    /// - protects the authorization service from bursts
    /// - keeps per-request latency predictable
    pub auth_concurrency: usize,

    // =========================
    // Pending bulks
    // =========================
    /// Maximum number of not-yet-paired bulks a single owner may hold.
    pub max_pending_per_owner: usize,

    /// How far in the future `pair_at` / `start_clocks_at` may be set.
    pub max_schedule_ahead: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_games: MAX_GAMES,
            auth_concurrency: AUTH_CONCURRENCY,
            max_pending_per_owner: 20,
            max_schedule_ahead: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_games: env_or("BULK_MAX_GAMES", defaults.max_games),
            auth_concurrency: env_or("BULK_AUTH_CONCURRENCY", defaults.auth_concurrency).max(1),
            max_pending_per_owner: env_or(
                "BULK_MAX_PENDING_PER_OWNER",
                defaults.max_pending_per_owner,
            ),
            max_schedule_ahead: Duration::from_secs(env_or(
                "BULK_MAX_SCHEDULE_AHEAD_SECS",
                defaults.max_schedule_ahead.as_secs(),
            )),
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &'static str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

/// Parses a raw setting, warning and falling back to `default` when it is unparsable.
/// Tracing must be initialized before this runs or the warning is lost.
fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &'static str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = %raw, fallback = %default, "unparsable config value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.max_games, 500);
        assert_eq!(cfg.auth_concurrency, 8);
        assert_eq!(cfg.max_pending_per_owner, 20);
        assert_eq!(cfg.max_schedule_ahead, Duration::from_secs(604_800));
    }

    #[test]
    fn env_or_falls_back_on_missing_key() {
        let v: usize = env_or("BULK_TEST_KEY_THAT_IS_NEVER_SET", 42);
        assert_eq!(v, 42);
    }

    #[test]
    #[traced_test]
    fn unparsable_value_warns_and_falls_back() {
        let v: usize = parse_or("BULK_MAX_GAMES", Some("abc".to_string()), 500);
        assert_eq!(v, 500);
        assert!(logs_contain("unparsable config value"));
        assert!(logs_contain("BULK_MAX_GAMES"));
    }

    #[test]
    fn parsable_value_is_trimmed_and_used() {
        let v: usize = parse_or("BULK_MAX_GAMES", Some(" 250 ".to_string()), 500);
        assert_eq!(v, 250);
    }
}
