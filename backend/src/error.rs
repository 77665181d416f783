use thiserror::Error;

use crate::tokens::TokenId;

/// Input-shape failures. Always reported before any authorization call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("no valid white:black token pair found")]
    TooFewTokens,

    #[error("too many token pairs: {count} submitted, fewer than {max} allowed")]
    TooManyTokens { count: usize, max: usize },

    /// Rendered through `TokenId`'s redacting `Debug`.
    #[error("duplicate token: {0:?}")]
    DuplicateTokens(TokenId),

    #[error("invalid bulk setup: {0}")]
    InvalidSetup(String),
}

/// Failures of the caller-facing scheduling operation.
///
/// Rejected tokens are not errors: they come back as `ScheduleOutcome::Rejected`.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("game id generation failed: {0:#}")]
    GenerationFailure(anyhow::Error),

    #[error("pairing invariant violated: {0}")]
    Pairing(#[from] crate::pairing::PairingError),
}
