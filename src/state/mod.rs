//! Match data model and lifecycle state machine.

pub mod match_state;
pub mod state_machine;

pub use self::match_state::{
    MatchId, MatchState, MoveRecord, Participant, ParticipantStatus, PlayerId, RematchRequests,
    Role, WinReason,
};
pub use self::state_machine::{InvalidTransition, MatchPhase, PhaseEvent, transition};
