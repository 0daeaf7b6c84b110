//! Error taxonomy for the match session engine.

use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{card::CardError, dao::storage::StorageError};

/// Client-caused command rejections. All of these are operational: they are
/// reported back to the caller and never corrupt match state, because
/// validation runs strictly before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No match exists under the given id.
    #[error("match `{match_id}` not found")]
    MatchNotFound {
        /// Id the command was addressed to.
        match_id: String,
    },
    /// Both seats of the match are already taken.
    #[error("match `{match_id}` already has two players")]
    MatchFull {
        /// Id of the full match.
        match_id: String,
    },
    /// The acting player is not a participant of the match.
    #[error("player `{player_id}` is not part of match `{match_id}`")]
    PlayerNotFound {
        /// Id of the match the command targeted.
        match_id: String,
        /// The unknown player.
        player_id: Uuid,
    },
    /// A move was attempted out of turn.
    #[error("player `{player_id}` moved out of turn in match `{match_id}`")]
    NotYourTurn {
        /// Id of the match.
        match_id: String,
        /// The player that jumped the queue.
        player_id: Uuid,
    },
    /// The move itself is invalid (value out of range, not enough lines, ...).
    #[error("invalid move in match `{match_id}`: {reason}")]
    InvalidMove {
        /// Id of the match.
        match_id: String,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// The command cannot be applied in the match's current phase.
    #[error("invalid game state in match `{match_id}`: {reason}")]
    InvalidGameState {
        /// Id of the match.
        match_id: String,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// The payload itself is malformed.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl From<ValidationErrors> for CommandError {
    fn from(err: ValidationErrors) -> Self {
        CommandError::Validation(format!("validation failed: {err}"))
    }
}

impl From<CardError> for CommandError {
    fn from(err: CardError) -> Self {
        CommandError::Validation(err.to_string())
    }
}

/// Top-level engine failure surfaced to the connection layer.
///
/// Command rejections and storage failures are kept apart on purpose: a
/// failed save must never be interpreted as a game-logic outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The command was rejected by game rules; match state is unchanged.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// The storage backend failed; the command was not applied.
    #[error("storage failure")]
    Storage(#[from] StorageError),
    /// The per-match owner went away before answering (match deleted while
    /// the command was in flight).
    #[error("match owner for `{match_id}` stopped before replying")]
    OwnerGone {
        /// Id of the match whose owner disappeared.
        match_id: String,
    },
}

impl EngineError {
    /// Borrow the command rejection, if this is one.
    pub fn as_command(&self) -> Option<&CommandError> {
        match self {
            EngineError::Command(err) => Some(err),
            _ => None,
        }
    }
}
