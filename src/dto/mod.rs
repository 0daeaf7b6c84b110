//! Wire-facing payload shapes: inbound commands and outbound projections.

pub mod command;
pub mod snapshot;
pub mod validation;

pub use self::command::{
    ClaimBingoRequest, ClientCommand, CreateMatchRequest, DisconnectRequest, JoinMatchRequest,
    MakeMoveRequest, MarkLineRequest, ReconnectRequest, RequestRematchRequest, SetReadyRequest,
};
pub use self::snapshot::{MatchSnapshot, ParticipantSummary};
