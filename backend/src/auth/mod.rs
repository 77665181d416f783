//! Authorization seam: the external token authorizer and the bounded
//! fan-out/fan-in that resolves a whole submission through it.

mod fanout;

pub use fanout::{Resolution, Slot, resolve_all};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::UserId;
use crate::tokens::TokenId;

/// Named permission a token must carry to be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "challenge:write")]
    ChallengeWrite,
    #[serde(rename = "challenge:bulk")]
    ChallengeBulk,
    #[serde(rename = "board:play")]
    BoardPlay,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ChallengeWrite => "challenge:write",
            Scope::ChallengeBulk => "challenge:bulk",
            Scope::BoardPlay => "board:play",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "challenge:write" => Ok(Scope::ChallengeWrite),
            "challenge:bulk" => Ok(Scope::ChallengeBulk),
            "board:play" => Ok(Scope::BoardPlay),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

pub type ScopeSet = BTreeSet<Scope>;

/// Scopes a player token must hold for bulk pairing.
pub fn bulk_pairing_scopes() -> ScopeSet {
    BTreeSet::from([Scope::ChallengeBulk])
}

/// User resolved from one token, tagged with the scopes it was validated for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserId,
    pub scopes: ScopeSet,
}

/// Why the authorization service refused a token.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuthError {
    #[error("no such token")]
    NoSuchToken,

    #[error("token expired")]
    Expired,

    #[error("token revoked")]
    Revoked,

    #[error("missing scope {required}")]
    MissingScope { required: Scope },

    #[error("authorization service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// One token that failed authorization, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadToken {
    pub token: TokenId,
    pub error: AuthError,
}

/// Abstraction over the token introspection service.
///
/// Called concurrently for every token in a submission; implementations must
/// be safe to share across tasks. Timeouts and transport retries, if any,
/// belong to the implementation.
#[async_trait]
pub trait TokenAuthorizer: Send + Sync + 'static {
    async fn authorize(&self, token: &TokenId, required: &ScopeSet)
    -> Result<Identity, AuthError>;
}
