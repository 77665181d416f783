//! Raw token-pair input: types, extraction and form-level validation.

mod extract;

pub use extract::{extract_pairs, render_pairs, validate_pairs};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque credential token. Compared by value; never logged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Debug output must not leak credentials into logs.
impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "TokenId({prefix}…)")
    }
}

impl From<&str> for TokenId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

/// Which side of the board a token (and later a user) plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

/// One white/black token combination destined to become one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub white: TokenId,
    pub black: TokenId,
}

impl TokenPair {
    pub fn new(white: impl Into<String>, black: impl Into<String>) -> Self {
        Self {
            white: TokenId::new(white),
            black: TokenId::new(black),
        }
    }

    pub fn token(&self, side: Side) -> &TokenId {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}
