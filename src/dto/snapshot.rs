//! Outbound full-state projection sent to clients.

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    card::CardGrid,
    lines::lit_letters,
    state::{
        MatchPhase, MatchState, MoveRecord, Participant, RematchRequests, Role, WinReason,
    },
};

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Public projection of one seat.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    /// Seated player.
    pub player_id: Uuid,
    /// Name shown to the opponent.
    pub display_name: String,
    /// Whether the player holds an open connection.
    pub connected: bool,
    /// Seat status as a wire string.
    pub status: crate::state::ParticipantStatus,
    /// Assigned card, if readied.
    pub card: Option<CardGrid>,
    /// Values marked for this seat, ascending for stable payloads.
    pub marked_values: Vec<u16>,
    /// Completed-line count.
    pub completed_line_count: usize,
    /// Progress letters lit for this seat ("", "B", .., "BINGO").
    pub letters: String,
}

impl From<&Participant> for ParticipantSummary {
    fn from(participant: &Participant) -> Self {
        let mut marked_values: Vec<u16> = participant.marked_values.iter().copied().collect();
        marked_values.sort_unstable();
        Self {
            player_id: participant.player_id,
            display_name: participant.display_name.clone(),
            connected: participant.connected,
            status: participant.status,
            card: participant.card,
            marked_values,
            completed_line_count: participant.completed_line_count,
            letters: lit_letters(participant.completed_line_count),
        }
    }
}

/// Full match snapshot; always an acceptable substitute for a delta.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    /// Match code.
    pub match_id: String,
    /// Lifecycle phase.
    pub status: MatchPhase,
    /// Challenger seat.
    pub challenger: ParticipantSummary,
    /// Acceptor seat, if filled.
    pub acceptor: Option<ParticipantSummary>,
    /// Whose turn it is, during play.
    pub current_turn: Option<Role>,
    /// Full move log, in engine order.
    pub moves: Vec<MoveRecord>,
    /// Winning seat, once decided.
    pub winner: Option<Role>,
    /// Why the match ended, once decided.
    pub win_reason: Option<WinReason>,
    /// Rematch handshake flags.
    pub rematch_requests: RematchRequests,
    /// Successor match link, once created.
    pub rematch_match_id: Option<String>,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Last update time, RFC 3339.
    pub last_activity_at: String,
}

impl From<&MatchState> for MatchSnapshot {
    fn from(state: &MatchState) -> Self {
        Self {
            match_id: state.id.clone(),
            status: state.phase,
            challenger: (&state.challenger).into(),
            acceptor: state.acceptor.as_ref().map(Into::into),
            current_turn: state.current_turn,
            moves: state.moves.clone(),
            winner: state.winner,
            win_reason: state.win_reason,
            rematch_requests: state.rematch_requests,
            rematch_match_id: state.rematch_match_id.clone(),
            created_at: format_timestamp(state.created_at),
            last_activity_at: format_timestamp(state.last_activity_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Participant;

    #[test]
    fn snapshot_projects_the_aggregate() {
        let player = Uuid::new_v4();
        let state = MatchState::new("ABC123".into(), Participant::new(player, "amaya".into()));
        let snapshot = MatchSnapshot::from(&state);
        assert_eq!(snapshot.match_id, "ABC123");
        assert_eq!(snapshot.status, MatchPhase::Waiting);
        assert_eq!(snapshot.challenger.player_id, player);
        assert_eq!(snapshot.challenger.letters, "");
        assert!(snapshot.acceptor.is_none());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["matchId"], "ABC123");
        assert_eq!(json["status"], "waiting");
    }
}
