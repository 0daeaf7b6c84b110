//! Synchronous command application against one match.
//!
//! Every function validates its whole precondition set before touching the
//! state, so a rejected command leaves the match byte-for-byte unchanged.
//! The async owner in [`crate::services::session`] drives these under the
//! per-match serialization guarantee.

use rand::Rng;
use time::OffsetDateTime;

use crate::{
    card::{CardRules, CardValue, generate_card, validate_card},
    error::CommandError,
    lines::{WIN_LINE_COUNT, completed_lines},
    state::{
        MatchId, MatchPhase, MatchState, MoveRecord, Participant, ParticipantStatus, PhaseEvent,
        PlayerId, Role, WinReason, transition,
    },
};

fn invalid_state(state: &MatchState, reason: &str) -> CommandError {
    CommandError::InvalidGameState {
        match_id: state.id.clone(),
        reason: reason.into(),
    }
}

fn seat_of(state: &MatchState, player_id: PlayerId) -> Result<Role, CommandError> {
    state
        .role_of(player_id)
        .ok_or_else(|| CommandError::PlayerNotFound {
            match_id: state.id.clone(),
            player_id,
        })
}

/// Recompute both participants' cached completed-line counts.
fn refresh_line_counts(state: &mut MatchState) {
    for participant in state.participants_mut() {
        if let Some(card) = participant.card {
            participant.completed_line_count =
                completed_lines(&card, &participant.marked_values).count;
        }
    }
}

/// Seat a second player, moving the match from waiting to lobby.
pub fn join(
    state: &mut MatchState,
    player_id: PlayerId,
    display_name: String,
) -> Result<(), CommandError> {
    if state.challenger.player_id == player_id {
        return Err(CommandError::Validation(
            "player already holds the challenger seat".into(),
        ));
    }
    if state.acceptor.is_some() {
        return Err(CommandError::MatchFull {
            match_id: state.id.clone(),
        });
    }
    let next = transition(state.phase, PhaseEvent::AcceptorJoined)
        .map_err(|err| invalid_state(state, &err.to_string()))?;

    state.connected_participants.insert(player_id);
    state.acceptor = Some(Participant::new(player_id, display_name));
    state.phase = next;
    Ok(())
}

/// Assign a card (validated client card or a server-generated one) and flag
/// the seat ready. Once both seats are ready the match starts: this is the
/// single point where the first turn is decided, by a fair coin flip.
pub fn set_ready(
    state: &mut MatchState,
    player_id: PlayerId,
    card: Option<&[Vec<CardValue>]>,
    rules: &CardRules,
) -> Result<(), CommandError> {
    let role = seat_of(state, player_id)?;
    if matches!(state.phase, MatchPhase::Playing | MatchPhase::Completed) {
        return Err(invalid_state(state, "cards are locked once play starts"));
    }
    // An assigned card only goes away through a full seat reset, so a second
    // ready-up cannot swap it for a fresh one.
    if state
        .participant(role)
        .is_some_and(|participant| participant.status == ParticipantStatus::Ready)
    {
        return Err(invalid_state(state, "seat is already ready"));
    }

    let grid = match card {
        Some(cells) => validate_card(cells, rules)?,
        None => generate_card(rules),
    };

    if let Some(participant) = state.participant_mut(role) {
        participant.card = Some(grid);
        participant.status = ParticipantStatus::Ready;
    }

    let both_ready = state.phase == MatchPhase::Lobby
        && state.challenger.status == ParticipantStatus::Ready
        && state
            .acceptor
            .as_ref()
            .is_some_and(|acceptor| acceptor.status == ParticipantStatus::Ready);
    if both_ready {
        let next = transition(state.phase, PhaseEvent::BothReady)
            .map_err(|err| invalid_state(state, &err.to_string()))?;
        state.phase = next;
        for participant in state.participants_mut() {
            participant.status = ParticipantStatus::Playing;
        }
        state.current_turn = Some(if rand::rng().random_bool(0.5) {
            Role::Challenger
        } else {
            Role::Acceptor
        });
    }
    Ok(())
}

/// Call a number: append to the move log, mark it on both cards, flip the
/// turn. Calling never ends the match by itself; that takes a claim.
pub fn make_move(
    state: &mut MatchState,
    player_id: PlayerId,
    value: CardValue,
    rules: &CardRules,
) -> Result<(), CommandError> {
    let role = seat_of(state, player_id)?;
    if state.phase != MatchPhase::Playing {
        return Err(invalid_state(state, "match is not in play"));
    }
    if state.current_turn != Some(role) {
        return Err(CommandError::NotYourTurn {
            match_id: state.id.clone(),
            player_id,
        });
    }
    if !rules.contains(value) {
        return Err(CommandError::InvalidMove {
            match_id: state.id.clone(),
            reason: format!(
                "value {value} is outside the {}-{} range",
                rules.min_value, rules.max_value
            ),
        });
    }

    state.moves.push(MoveRecord {
        player_id,
        value,
        at: OffsetDateTime::now_utc(),
    });
    for participant in state.participants_mut() {
        participant.marked_values.insert(value);
    }
    refresh_line_counts(state);
    state.current_turn = Some(role.opponent());
    Ok(())
}

/// Acknowledge already-called values on both cards. Not turn-consuming and
/// idempotent; already-marked values are no-ops.
pub fn mark_line(
    state: &mut MatchState,
    player_id: PlayerId,
    values: &[CardValue],
    rules: &CardRules,
) -> Result<(), CommandError> {
    seat_of(state, player_id)?;
    if state.phase != MatchPhase::Playing {
        return Err(invalid_state(state, "match is not in play"));
    }
    if let Some(&value) = values.iter().find(|value| !rules.contains(**value)) {
        return Err(CommandError::InvalidMove {
            match_id: state.id.clone(),
            reason: format!(
                "value {value} is outside the {}-{} range",
                rules.min_value, rules.max_value
            ),
        });
    }

    for participant in state.participants_mut() {
        participant.marked_values.extend(values.iter().copied());
    }
    refresh_line_counts(state);
    Ok(())
}

/// End the match on an explicit claim if the caller holds enough completed
/// lines. `instant_win` is the test-only bypass capability.
pub fn claim_bingo(
    state: &mut MatchState,
    player_id: PlayerId,
    instant_win: bool,
) -> Result<(), CommandError> {
    let role = seat_of(state, player_id)?;
    transition(state.phase, PhaseEvent::BingoClaimed)
        .map_err(|err| invalid_state(state, &err.to_string()))?;
    let count = state
        .participant(role)
        .map(|participant| participant.completed_line_count)
        .unwrap_or(0);
    if count < WIN_LINE_COUNT && !instant_win {
        return Err(CommandError::InvalidMove {
            match_id: state.id.clone(),
            reason: format!("need {WIN_LINE_COUNT} completed lines, have {count}"),
        });
    }

    state.complete(role, WinReason::Bingo);
    Ok(())
}

/// Drop a player's connection. During play this immediately forfeits the
/// match to the opponent; there is no grace period while actively playing.
pub fn disconnect(state: &mut MatchState, player_id: PlayerId) -> Result<(), CommandError> {
    let role = seat_of(state, player_id)?;

    state.connected_participants.remove(&player_id);
    if let Some(participant) = state.participant_mut(role) {
        participant.connected = false;
        participant.status = ParticipantStatus::Disconnected;
    }
    // The table only completes a forfeit from play, so a duplicate
    // disconnect is a no-op: the forfeit is applied exactly once.
    if transition(state.phase, PhaseEvent::PlayForfeited).is_ok() {
        state.complete(role.opponent(), WinReason::Disconnection);
    }
    Ok(())
}

/// Restore a participant's connection, resetting pre-play progress.
pub fn reconnect(state: &mut MatchState, player_id: PlayerId) -> Result<(), CommandError> {
    let role = seat_of(state, player_id)?;

    state.connected_participants.insert(player_id);
    let phase = state.phase;
    if let Some(participant) = state.participant_mut(role) {
        participant.connected = true;
        match phase {
            // Pre-play reconnection is a fresh start; matters for rematch
            // successor matches.
            MatchPhase::Waiting | MatchPhase::Lobby => participant.reset_progress(),
            MatchPhase::Playing => participant.status = ParticipantStatus::Playing,
            MatchPhase::Completed => {}
        }
    }
    Ok(())
}

/// Record a rematch request. When the second side opts in, build the
/// successor match with swapped seats and fully reset progress, linking it
/// from the original. `successor_id` must be provided by the caller whenever
/// the handshake could complete.
pub fn request_rematch(
    state: &mut MatchState,
    player_id: PlayerId,
    successor_id: Option<MatchId>,
) -> Result<Option<MatchState>, CommandError> {
    let role = seat_of(state, player_id)?;

    state.rematch_requests.set(role);
    if !state.rematch_requests.both() || state.rematch_match_id.is_some() {
        return Ok(None);
    }

    let id = successor_id.ok_or_else(|| {
        CommandError::Validation("no successor match id was reserved".into())
    })?;
    let Some(acceptor) = state.acceptor.as_ref() else {
        return Err(invalid_state(state, "rematch requires two seated players"));
    };

    let mut successor = MatchState::new(
        id.clone(),
        fresh_seat(acceptor),
    );
    successor.acceptor = Some(fresh_seat(&state.challenger));
    // Participants re-join the new match through explicit reconnects.
    successor.connected_participants.clear();
    successor.challenger.connected = false;
    if let Some(acceptor) = successor.acceptor.as_mut() {
        acceptor.connected = false;
    }

    state.rematch_match_id = Some(id);
    Ok(Some(successor))
}

/// A seat for the successor match: same identity, zero carried-over progress.
fn fresh_seat(participant: &Participant) -> Participant {
    Participant::new(participant.player_id, participant.display_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::LINE_PATTERNS;
    use uuid::Uuid;

    fn playing_match() -> (MatchState, PlayerId, PlayerId) {
        let challenger = Uuid::new_v4();
        let acceptor = Uuid::new_v4();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        let rules = CardRules::default();
        join(&mut state, acceptor, "badru".into()).unwrap();
        set_ready(&mut state, challenger, None, &rules).unwrap();
        set_ready(&mut state, acceptor, None, &rules).unwrap();
        assert_eq!(state.phase, MatchPhase::Playing);
        (state, challenger, acceptor)
    }

    fn on_turn(state: &MatchState) -> PlayerId {
        let role = state.current_turn.unwrap();
        state.participant(role).unwrap().player_id
    }

    #[test]
    fn join_fills_the_acceptor_seat_once() {
        let challenger = Uuid::new_v4();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        join(&mut state, Uuid::new_v4(), "badru".into()).unwrap();
        assert_eq!(state.phase, MatchPhase::Lobby);

        let err = join(&mut state, Uuid::new_v4(), "chidi".into()).unwrap_err();
        assert!(matches!(err, CommandError::MatchFull { .. }));
    }

    #[test]
    fn ready_up_starts_play_and_picks_a_first_turn() {
        let (state, _, _) = playing_match();
        assert!(state.current_turn.is_some());
        assert_eq!(state.challenger.status, ParticipantStatus::Playing);
        assert!(state.challenger.card.is_some());
    }

    #[test]
    fn a_ready_seat_keeps_its_first_card() {
        let challenger = Uuid::new_v4();
        let rules = CardRules::default();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        join(&mut state, Uuid::new_v4(), "badru".into()).unwrap();
        set_ready(&mut state, challenger, None, &rules).unwrap();
        let first = state.challenger.card;

        let err = set_ready(&mut state, challenger, None, &rules).unwrap_err();
        assert!(matches!(err, CommandError::InvalidGameState { .. }));
        assert_eq!(state.challenger.card, first);
        assert_eq!(state.challenger.status, ParticipantStatus::Ready);
    }

    #[test]
    fn set_ready_rejects_malformed_cards() {
        let challenger = Uuid::new_v4();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        let bad = vec![vec![1, 2, 3]];
        let err = set_ready(&mut state, challenger, Some(&bad), &CardRules::default());
        assert!(matches!(err, Err(CommandError::Validation(_))));
        assert!(state.challenger.card.is_none());
    }

    #[test]
    fn moves_mark_both_cards_and_flip_the_turn() {
        let (mut state, _, _) = playing_match();
        let mover = on_turn(&state);
        let turn_before = state.current_turn.unwrap();

        make_move(&mut state, mover, 7, &CardRules::default()).unwrap();

        assert_eq!(state.moves.len(), 1);
        assert_eq!(state.current_turn, Some(turn_before.opponent()));
        assert!(state.challenger.marked_values.contains(&7));
        assert!(state.acceptor.as_ref().unwrap().marked_values.contains(&7));
    }

    #[test]
    fn out_of_turn_moves_are_rejected_without_mutation() {
        let (mut state, _, _) = playing_match();
        let off_turn = {
            let role = state.current_turn.unwrap().opponent();
            state.participant(role).unwrap().player_id
        };
        let before = state.clone();

        let err = make_move(&mut state, off_turn, 7, &CardRules::default()).unwrap_err();
        assert!(matches!(err, CommandError::NotYourTurn { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn out_of_range_values_are_invalid_moves() {
        let (mut state, _, _) = playing_match();
        let mover = on_turn(&state);
        let err = make_move(&mut state, mover, 76, &CardRules::default()).unwrap_err();
        assert!(matches!(err, CommandError::InvalidMove { .. }));
        assert!(state.moves.is_empty());
    }

    #[test]
    fn mark_line_is_idempotent_and_not_turn_bound() {
        let (mut state, challenger, _) = playing_match();
        mark_line(&mut state, challenger, &[10, 11, 10], &CardRules::default()).unwrap();
        mark_line(&mut state, challenger, &[10], &CardRules::default()).unwrap();
        assert!(state.challenger.marked_values.contains(&10));
        assert!(state.challenger.marked_values.contains(&11));
        assert!(state.moves.is_empty());
    }

    #[test]
    fn claim_requires_five_lines() {
        let (mut state, challenger, _) = playing_match();
        let err = claim_bingo(&mut state, challenger, false).unwrap_err();
        assert!(matches!(err, CommandError::InvalidMove { .. }));
        assert_eq!(state.phase, MatchPhase::Playing);

        // Mark five full lines on the challenger's card.
        let card = state.challenger.card.unwrap();
        let values: Vec<CardValue> = LINE_PATTERNS[..5]
            .iter()
            .flatten()
            .map(|&(row, column)| card[row][column])
            .collect();
        mark_line(&mut state, challenger, &values, &CardRules::default()).unwrap();
        assert!(state.challenger.completed_line_count >= 5);

        claim_bingo(&mut state, challenger, false).unwrap();
        assert_eq!(state.phase, MatchPhase::Completed);
        assert_eq!(state.winner, Some(Role::Challenger));
        assert_eq!(state.win_reason, Some(WinReason::Bingo));
    }

    #[test]
    fn claims_outside_play_are_rejected_by_the_transition_table() {
        let challenger = Uuid::new_v4();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        // Waiting: no opponent yet.
        let err = claim_bingo(&mut state, challenger, true).unwrap_err();
        assert!(matches!(err, CommandError::InvalidGameState { .. }));
        assert_eq!(state.phase, MatchPhase::Waiting);

        // Completed: the outcome is final.
        let (mut state, challenger, _) = playing_match();
        claim_bingo(&mut state, challenger, true).unwrap();
        let err = claim_bingo(&mut state, challenger, true).unwrap_err();
        assert!(matches!(err, CommandError::InvalidGameState { .. }));
        assert_eq!(state.winner, Some(Role::Challenger));
    }

    #[test]
    fn instant_win_capability_bypasses_the_line_check() {
        let (mut state, challenger, _) = playing_match();
        claim_bingo(&mut state, challenger, true).unwrap();
        assert_eq!(state.winner, Some(Role::Challenger));
    }

    #[test]
    fn disconnect_during_play_forfeits_exactly_once() {
        let (mut state, challenger, acceptor) = playing_match();
        disconnect(&mut state, acceptor).unwrap();
        assert_eq!(state.phase, MatchPhase::Completed);
        assert_eq!(state.winner, Some(Role::Challenger));
        assert_eq!(state.win_reason, Some(WinReason::Disconnection));
        assert!(!state.connected_participants.contains(&acceptor));

        // A duplicate disconnect leaves the outcome untouched.
        disconnect(&mut state, acceptor).unwrap();
        assert_eq!(state.winner, Some(Role::Challenger));

        // The winner disconnecting afterwards does not rewrite history.
        disconnect(&mut state, challenger).unwrap();
        assert_eq!(state.winner, Some(Role::Challenger));
    }

    #[test]
    fn reconnect_into_lobby_resets_progress() {
        let challenger = Uuid::new_v4();
        let acceptor = Uuid::new_v4();
        let rules = CardRules::default();
        let mut state = MatchState::new(
            "ABC123".into(),
            Participant::new(challenger, "amaya".into()),
        );
        join(&mut state, acceptor, "badru".into()).unwrap();
        set_ready(&mut state, challenger, None, &rules).unwrap();

        disconnect(&mut state, challenger).unwrap();
        reconnect(&mut state, challenger).unwrap();

        assert!(state.challenger.connected);
        assert_eq!(state.challenger.status, ParticipantStatus::Waiting);
        assert!(state.challenger.card.is_none());
    }

    #[test]
    fn reconnect_during_play_restores_playing_status() {
        let (mut state, challenger, _) = playing_match();
        // A bare connection blip that the transport reports without a
        // disconnect command.
        state.connected_participants.remove(&challenger);
        state.challenger.connected = false;
        reconnect(&mut state, challenger).unwrap();
        assert_eq!(state.challenger.status, ParticipantStatus::Playing);
        assert_eq!(state.phase, MatchPhase::Playing);
    }

    #[test]
    fn rematch_needs_both_sides() {
        let (mut state, challenger, acceptor) = playing_match();
        claim_bingo(&mut state, challenger, true).unwrap();

        let none = request_rematch(&mut state, challenger, None).unwrap();
        assert!(none.is_none());
        assert!(state.rematch_match_id.is_none());

        let successor = request_rematch(&mut state, acceptor, Some("NEW001".into()))
            .unwrap()
            .unwrap();
        assert_eq!(state.rematch_match_id.as_deref(), Some("NEW001"));
        assert_eq!(successor.phase, MatchPhase::Waiting);
        // Seats are swapped and progress fully reset.
        assert_eq!(successor.challenger.player_id, acceptor);
        assert_eq!(
            successor.acceptor.as_ref().unwrap().player_id,
            challenger
        );
        assert!(successor.challenger.card.is_none());
        assert!(successor.moves.is_empty());
        assert!(successor.connected_participants.is_empty());

        // A third request creates nothing further.
        let again = request_rematch(&mut state, challenger, Some("NEW002".into())).unwrap();
        assert!(again.is_none());
        assert_eq!(state.rematch_match_id.as_deref(), Some("NEW001"));
    }

    #[test]
    fn unknown_players_are_rejected() {
        let (mut state, _, _) = playing_match();
        let stranger = Uuid::new_v4();
        assert!(matches!(
            make_move(&mut state, stranger, 7, &CardRules::default()).unwrap_err(),
            CommandError::PlayerNotFound { .. }
        ));
        assert!(matches!(
            reconnect(&mut state, stranger).unwrap_err(),
            CommandError::PlayerNotFound { .. }
        ));
    }
}
