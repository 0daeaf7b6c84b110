//! Minimal change-set computation between two successive match states.
//!
//! Purely a transmission-size optimization: the connection layer may always
//! substitute a full snapshot.

use serde::Serialize;

use crate::state::{MatchId, MatchPhase, MatchState, MoveRecord, RematchRequests, Role, WinReason};

/// Per-seat completed-line counts; the acceptor reads zero until seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCounts {
    /// Challenger's count.
    pub challenger: usize,
    /// Acceptor's count.
    pub acceptor: usize,
}

fn line_counts(state: &MatchState) -> LineCounts {
    LineCounts {
        challenger: state.challenger.completed_line_count,
        acceptor: state
            .acceptor
            .as_ref()
            .map(|acceptor| acceptor.completed_line_count)
            .unwrap_or(0),
    }
}

/// The fields that changed between two states of the same match. Absent
/// fields did not change; `current_turn: Some(None)` means the turn marker
/// was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchDelta {
    /// Which match this delta belongs to.
    pub match_id: MatchId,
    /// Moves appended since the previous state, in engine order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_moves: Vec<MoveRecord>,
    /// New phase, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<MatchPhase>,
    /// New turn marker, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<Option<Role>>,
    /// Winning seat, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Role>,
    /// Why the match ended, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_reason: Option<WinReason>,
    /// Both seats' completed-line counts, when either changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_line_counts: Option<LineCounts>,
    /// Rematch flags, when they changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rematch_requests: Option<RematchRequests>,
    /// Successor match link, once created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rematch_match_id: Option<MatchId>,
}

impl MatchDelta {
    /// Whether the command changed nothing a client cares about.
    pub fn is_empty(&self) -> bool {
        self.new_moves.is_empty()
            && self.phase.is_none()
            && self.current_turn.is_none()
            && self.winner.is_none()
            && self.win_reason.is_none()
            && self.completed_line_counts.is_none()
            && self.rematch_requests.is_none()
            && self.rematch_match_id.is_none()
    }
}

/// Compute the minimal payload describing `after` relative to `before`.
pub fn diff(before: &MatchState, after: &MatchState) -> MatchDelta {
    let new_moves = after.moves.get(before.moves.len()..).unwrap_or(&[]).to_vec();
    let counts_before = line_counts(before);
    let counts_after = line_counts(after);

    MatchDelta {
        match_id: after.id.clone(),
        new_moves,
        phase: (before.phase != after.phase).then_some(after.phase),
        current_turn: (before.current_turn != after.current_turn).then_some(after.current_turn),
        winner: if before.winner != after.winner {
            after.winner
        } else {
            None
        },
        win_reason: if before.win_reason != after.win_reason {
            after.win_reason
        } else {
            None
        },
        completed_line_counts: (counts_before != counts_after).then_some(counts_after),
        rematch_requests: (before.rematch_requests != after.rematch_requests)
            .then_some(after.rematch_requests),
        rematch_match_id: if before.rematch_match_id != after.rematch_match_id {
            after.rematch_match_id.clone()
        } else {
            None
        },
    }
}
