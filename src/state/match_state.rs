//! Authoritative data model for one match.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use std::collections::HashSet;

use crate::{
    card::{CardGrid, CardValue},
    state::state_machine::MatchPhase,
};

/// Stable identifier supplied by the identity layer for each client session.
pub type PlayerId = Uuid;

/// Human-shareable short code identifying a match.
pub type MatchId = String;

/// One of the two fixed seats of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The player that created the match.
    Challenger,
    /// The player that joined it.
    Acceptor,
}

impl Role {
    /// The other seat.
    pub fn opponent(self) -> Role {
        match self {
            Role::Challenger => Role::Acceptor,
            Role::Acceptor => Role::Challenger,
        }
    }
}

/// Why a completed match ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    /// A valid bingo claim.
    Bingo,
    /// The opponent dropped the connection mid-game.
    Disconnection,
    /// The opponent gave up.
    Forfeit,
}

/// Per-seat readiness and connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Joined but not yet ready.
    Waiting,
    /// Card assigned, waiting for the opponent.
    Ready,
    /// Actively playing.
    Playing,
    /// Connection dropped.
    Disconnected,
}

/// One entry of the append-only move log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Who called the number.
    pub player_id: PlayerId,
    /// The called value.
    pub value: CardValue,
    /// When the engine applied the move.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// State embedded in a seat once a player occupies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity of the seated player.
    pub player_id: PlayerId,
    /// Name shown to the opponent.
    pub display_name: String,
    /// Whether the player currently holds an open connection.
    pub connected: bool,
    /// Readiness/connection state of the seat.
    pub status: ParticipantStatus,
    /// Card assigned on ready; never mutated afterwards within a match.
    pub card: Option<CardGrid>,
    /// Values called and acknowledged for this participant.
    pub marked_values: HashSet<CardValue>,
    /// Cached completed-line count, recomputed on every marking change.
    pub completed_line_count: usize,
}

impl Participant {
    /// Seat a player, connected and waiting.
    pub fn new(player_id: PlayerId, display_name: String) -> Self {
        Self {
            player_id,
            display_name,
            connected: true,
            status: ParticipantStatus::Waiting,
            card: None,
            marked_values: HashSet::new(),
            completed_line_count: 0,
        }
    }

    /// Drop card and progress, returning the seat to its pre-ready state.
    /// Used when a player reconnects into a pre-play phase and on rematch.
    pub fn reset_progress(&mut self) {
        self.status = ParticipantStatus::Waiting;
        self.card = None;
        self.marked_values.clear();
        self.completed_line_count = 0;
    }
}

/// Two-sided rematch opt-in flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RematchRequests {
    /// Challenger wants a rematch.
    pub challenger: bool,
    /// Acceptor wants a rematch.
    pub acceptor: bool,
}

impl RematchRequests {
    /// Whether both sides opted in.
    pub fn both(&self) -> bool {
        self.challenger && self.acceptor
    }

    /// Flag for one seat.
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::Challenger => self.challenger,
            Role::Acceptor => self.acceptor,
        }
    }

    /// Set the flag for one seat.
    pub fn set(&mut self, role: Role) {
        match role {
            Role::Challenger => self.challenger = true,
            Role::Acceptor => self.acceptor = true,
        }
    }
}

/// Root aggregate for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Short shareable code.
    pub id: MatchId,
    /// Lifecycle phase.
    pub phase: MatchPhase,
    /// Seat of the creating player.
    pub challenger: Participant,
    /// Seat of the joining player, absent until someone joins.
    pub acceptor: Option<Participant>,
    /// Whose turn it is; non-`None` iff `phase == Playing`.
    pub current_turn: Option<Role>,
    /// Append-only ordered move log; the source of truth for ordering.
    pub moves: Vec<MoveRecord>,
    /// Winning seat; non-`None` iff `phase == Completed`.
    pub winner: Option<Role>,
    /// Set exactly when `winner` is set.
    pub win_reason: Option<WinReason>,
    /// Players currently holding an open connection to this match.
    pub connected_participants: HashSet<PlayerId>,
    /// Rematch handshake flags.
    pub rematch_requests: RematchRequests,
    /// Successor match once both sides requested a rematch.
    pub rematch_match_id: Option<MatchId>,
    /// Legacy grace-timer field kept for schema compatibility; never read.
    #[serde(default)]
    pub disconnection_timer: Option<i64>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update timestamp; drives expiry.
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity_at: OffsetDateTime,
}

impl MatchState {
    /// Build a fresh match in the waiting phase with the challenger seated
    /// and connected.
    pub fn new(id: MatchId, challenger: Participant) -> Self {
        let now = OffsetDateTime::now_utc();
        let connected = [challenger.player_id].into_iter().collect();
        Self {
            id,
            phase: MatchPhase::Waiting,
            challenger,
            acceptor: None,
            current_turn: None,
            moves: Vec::new(),
            winner: None,
            win_reason: None,
            connected_participants: connected,
            rematch_requests: RematchRequests::default(),
            rematch_match_id: None,
            disconnection_timer: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Seat a player holds in this match, if any.
    pub fn role_of(&self, player_id: PlayerId) -> Option<Role> {
        if self.challenger.player_id == player_id {
            return Some(Role::Challenger);
        }
        match &self.acceptor {
            Some(acceptor) if acceptor.player_id == player_id => Some(Role::Acceptor),
            _ => None,
        }
    }

    /// Borrow the participant in a seat; the acceptor seat may be empty.
    pub fn participant(&self, role: Role) -> Option<&Participant> {
        match role {
            Role::Challenger => Some(&self.challenger),
            Role::Acceptor => self.acceptor.as_ref(),
        }
    }

    /// Mutably borrow the participant in a seat.
    pub fn participant_mut(&mut self, role: Role) -> Option<&mut Participant> {
        match role {
            Role::Challenger => Some(&mut self.challenger),
            Role::Acceptor => self.acceptor.as_mut(),
        }
    }

    /// Iterate over both seated participants.
    pub fn participants_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        std::iter::once(&mut self.challenger).chain(self.acceptor.as_mut())
    }

    /// Whether the match reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase == MatchPhase::Completed
    }

    /// Record activity for expiry accounting.
    pub fn touch(&mut self) {
        self.last_activity_at = OffsetDateTime::now_utc();
    }

    /// Transition to completed with a winner, clearing the turn marker.
    pub fn complete(&mut self, winner: Role, reason: WinReason) {
        self.phase = MatchPhase::Completed;
        self.winner = Some(winner);
        self.win_reason = Some(reason);
        self.current_turn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_oppose_each_other() {
        assert_eq!(Role::Challenger.opponent(), Role::Acceptor);
        assert_eq!(Role::Acceptor.opponent(), Role::Challenger);
    }

    #[test]
    fn new_match_starts_waiting_with_challenger_connected() {
        let player = Uuid::new_v4();
        let state = MatchState::new("ABC123".into(), Participant::new(player, "amaya".into()));
        assert_eq!(state.phase, MatchPhase::Waiting);
        assert_eq!(state.role_of(player), Some(Role::Challenger));
        assert!(state.connected_participants.contains(&player));
        assert!(state.acceptor.is_none());
        assert!(state.current_turn.is_none());
    }

    #[test]
    fn complete_sets_winner_and_clears_turn() {
        let player = Uuid::new_v4();
        let mut state = MatchState::new("ABC123".into(), Participant::new(player, "amaya".into()));
        state.current_turn = Some(Role::Challenger);
        state.complete(Role::Acceptor, WinReason::Disconnection);
        assert!(state.is_terminal());
        assert_eq!(state.winner, Some(Role::Acceptor));
        assert_eq!(state.win_reason, Some(WinReason::Disconnection));
        assert!(state.current_turn.is_none());
    }

    #[test]
    fn state_round_trips_through_json() {
        let player = Uuid::new_v4();
        let state = MatchState::new("XY9Z21".into(), Participant::new(player, "amaya".into()));
        let json = serde_json::to_string(&state).unwrap();
        let back: MatchState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
