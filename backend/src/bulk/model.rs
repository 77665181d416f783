use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::ids::{BulkId, GameId, UserId};

/// Longest message that may be attached to a bulk.
pub const MAX_MESSAGE_CHARS: usize = 400;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    #[default]
    Standard,
    Chess960,
    Crazyhouse,
    Antichess,
    Atomic,
    Horde,
    KingOfTheHill,
    RacingKings,
    ThreeCheck,
    FromPosition,
}

impl Variant {
    pub fn key(&self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::Chess960 => "chess960",
            Variant::Crazyhouse => "crazyhouse",
            Variant::Antichess => "antichess",
            Variant::Atomic => "atomic",
            Variant::Horde => "horde",
            Variant::KingOfTheHill => "kingOfTheHill",
            Variant::RacingKings => "racingKings",
            Variant::ThreeCheck => "threeCheck",
            Variant::FromPosition => "fromPosition",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Variant {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = match s {
            "standard" => Variant::Standard,
            "chess960" => Variant::Chess960,
            "crazyhouse" => Variant::Crazyhouse,
            "antichess" => Variant::Antichess,
            "atomic" => Variant::Atomic,
            "horde" => Variant::Horde,
            "kingOfTheHill" => Variant::KingOfTheHill,
            "racingKings" => Variant::RacingKings,
            "threeCheck" => Variant::ThreeCheck,
            "fromPosition" => Variant::FromPosition,
            other => return Err(InputError::InvalidSetup(format!("unknown variant: {other}"))),
        };
        Ok(v)
    }
}

/// Real-time clock: initial time plus per-move increment, both in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockConfig {
    pub limit_secs: u32,
    pub increment_secs: u32,
}

impl ClockConfig {
    pub const MAX_LIMIT_SECS: u32 = 3 * 60 * 60;
    pub const MAX_INCREMENT_SECS: u32 = 180;

    pub fn new(limit_secs: u32, increment_secs: u32) -> Self {
        Self {
            limit_secs,
            increment_secs,
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.limit_secs > Self::MAX_LIMIT_SECS {
            return Err(InputError::InvalidSetup(format!(
                "clock limit {}s exceeds {}s",
                self.limit_secs,
                Self::MAX_LIMIT_SECS
            )));
        }
        if self.increment_secs > Self::MAX_INCREMENT_SECS {
            return Err(InputError::InvalidSetup(format!(
                "clock increment {}s exceeds {}s",
                self.increment_secs,
                Self::MAX_INCREMENT_SECS
            )));
        }
        if self.limit_secs == 0 && self.increment_secs == 0 {
            return Err(InputError::InvalidSetup(
                "clock needs a limit or an increment".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ClockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.limit_secs / 60, self.increment_secs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Rated,
    Casual,
}

impl Mode {
    pub fn from_rated(rated: bool) -> Self {
        if rated { Mode::Rated } else { Mode::Casual }
    }
}

/// Optional restrictions applied to every game of a bulk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameRule {
    NoAbort,
    NoRematch,
    NoGiveTime,
    NoClaimWin,
    NoEarlyDraw,
}

/// Configuration shared by every game in a bulk, as produced by the form layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSetup {
    #[serde(default)]
    pub variant: Variant,
    pub clock: ClockConfig,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub pair_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_clocks_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rules: BTreeSet<GameRule>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BulkSetup {
    pub fn new(variant: Variant, clock: ClockConfig, rated: bool) -> Self {
        Self {
            variant,
            clock,
            rated,
            pair_at: None,
            start_clocks_at: None,
            rules: BTreeSet::new(),
            message: None,
        }
    }

    /// Checks the setup against `now`. Rejects timestamps further ahead than
    /// `max_ahead` and clocks that start before pairing.
    pub fn validate(&self, now: DateTime<Utc>, max_ahead: Duration) -> Result<(), InputError> {
        self.clock.validate()?;

        let horizon = chrono::Duration::from_std(max_ahead)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let pair_at = self.pair_at.unwrap_or(now);
        if pair_at > horizon {
            return Err(InputError::InvalidSetup(format!(
                "pairAt {pair_at} is beyond {horizon}"
            )));
        }

        if let Some(start) = self.start_clocks_at {
            if start > horizon {
                return Err(InputError::InvalidSetup(format!(
                    "startClocksAt {start} is beyond {horizon}"
                )));
            }
            if start < pair_at {
                return Err(InputError::InvalidSetup(format!(
                    "startClocksAt {start} precedes pairAt {pair_at}"
                )));
            }
        }

        if let Some(msg) = &self.message {
            if msg.chars().count() > MAX_MESSAGE_CHARS {
                return Err(InputError::InvalidSetup(format!(
                    "message longer than {MAX_MESSAGE_CHARS} characters"
                )));
            }
        }

        Ok(())
    }
}

/// One concrete game to be created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub id: GameId,
    pub white: UserId,
    pub black: UserId,
}

/// A batch of games scheduled together.
///
/// Immutable after construction except for `paired_at`, which is stamped once
/// through `mark_paired` when the games are actually created. Outside this
/// crate both `games` and `paired_at` are read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBulk {
    pub id: BulkId,
    pub owner: UserId,
    pub(crate) games: Vec<ScheduledGame>,
    pub variant: Variant,
    pub clock: ClockConfig,
    pub mode: Mode,
    pub rules: BTreeSet<GameRule>,
    pub message: Option<String>,
    pub pair_at: DateTime<Utc>,
    pub start_clocks_at: Option<DateTime<Utc>>,
    pub scheduled_at: DateTime<Utc>,
    pub(crate) paired_at: Option<DateTime<Utc>>,
}

impl ScheduledBulk {
    pub fn games(&self) -> &[ScheduledGame] {
        &self.games
    }

    pub fn paired_at(&self) -> Option<DateTime<Utc>> {
        self.paired_at
    }

    /// Every user playing in this bulk.
    pub fn user_set(&self) -> HashSet<&UserId> {
        self.games
            .iter()
            .flat_map(|g| [&g.white, &g.black])
            .collect()
    }

    /// Two bulks collide when they pair (or start clocks) at the same moment
    /// and share at least one player.
    ///
    /// `start_clocks_at` only counts when both bulks set it.
    pub fn collides_with(&self, other: &ScheduledBulk) -> bool {
        let same_start = matches!(
            (self.start_clocks_at, other.start_clocks_at),
            (Some(a), Some(b)) if a == b
        );

        if self.pair_at != other.pair_at && !same_start {
            return false;
        }

        let mine = self.user_set();
        other
            .games
            .iter()
            .any(|g| mine.contains(&g.white) || mine.contains(&g.black))
    }

    pub fn is_pending(&self) -> bool {
        self.paired_at.is_none()
    }

    /// Stamps `paired_at`. Returns false if the bulk was already paired.
    pub fn mark_paired(&mut self, at: DateTime<Utc>) -> bool {
        if self.paired_at.is_some() {
            return false;
        }
        self.paired_at = Some(at);
        true
    }
}
