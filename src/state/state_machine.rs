//! Match lifecycle phases and the transition table the session engine
//! consults before mutating anything.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Created, challenger seated, waiting for an opponent.
    Waiting,
    /// Both seats filled, players readying up.
    Lobby,
    /// Turns in progress.
    Playing,
    /// A winner has been decided.
    Completed,
}

/// Events that move a match between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Second player took the acceptor seat.
    AcceptorJoined,
    /// Both participants flagged ready.
    BothReady,
    /// A valid bingo claim was accepted.
    BingoClaimed,
    /// A player dropped or forfeited during play.
    PlayForfeited,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while the match is {from:?}")]
pub struct InvalidTransition {
    /// Phase the match was in.
    pub from: MatchPhase,
    /// The event that does not apply there.
    pub event: PhaseEvent,
}

/// Compute the phase an event leads to, rejecting anything not in the table.
pub fn transition(from: MatchPhase, event: PhaseEvent) -> Result<MatchPhase, InvalidTransition> {
    let next = match (from, event) {
        (MatchPhase::Waiting, PhaseEvent::AcceptorJoined) => MatchPhase::Lobby,
        (MatchPhase::Lobby, PhaseEvent::BothReady) => MatchPhase::Playing,
        (MatchPhase::Playing, PhaseEvent::BingoClaimed) => MatchPhase::Completed,
        (MatchPhase::Playing, PhaseEvent::PlayForfeited) => MatchPhase::Completed,
        (from, event) => return Err(InvalidTransition { from, event }),
    };
    Ok(next)
}
