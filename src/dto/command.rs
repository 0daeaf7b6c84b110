//! Inbound command payloads, tagged with the historical event names.

use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    card::CardValue,
    dto::validation::{validate_display_name, validate_match_code},
};

/// One client command, as decoded from the wire by the connection layer.
///
/// The `event` tag carries the historical event names, kept for client
/// compatibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum ClientCommand {
    /// Open a new match as challenger.
    #[serde(rename = "match-create")]
    MatchCreate(CreateMatchRequest),
    /// Take the acceptor seat of an existing match.
    #[serde(rename = "match-join")]
    MatchJoin(JoinMatchRequest),
    /// Lock in a card and flag readiness.
    #[serde(rename = "set-ready")]
    SetReady(SetReadyRequest),
    /// Call a number on the caller's turn.
    #[serde(rename = "make-move")]
    MakeMove(MakeMoveRequest),
    /// Acknowledge already-called values.
    #[serde(rename = "mark-line")]
    MarkLine(MarkLineRequest),
    /// Claim the win.
    #[serde(rename = "claim-bingo")]
    ClaimBingo(ClaimBingoRequest),
    /// Opt into a rematch.
    #[serde(rename = "request-rematch")]
    RequestRematch(RequestRematchRequest),
    /// Report a dropped connection.
    #[serde(rename = "disconnect")]
    Disconnect(DisconnectRequest),
    /// Restore a dropped connection.
    #[serde(rename = "reconnect")]
    Reconnect(ReconnectRequest),
}

impl Validate for ClientCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ClientCommand::MatchCreate(request) => request.validate(),
            ClientCommand::MatchJoin(request) => request.validate(),
            ClientCommand::SetReady(request) => request.validate(),
            ClientCommand::MakeMove(request) => request.validate(),
            ClientCommand::MarkLine(request) => request.validate(),
            ClientCommand::ClaimBingo(request) => request.validate(),
            ClientCommand::RequestRematch(request) => request.validate(),
            ClientCommand::Disconnect(request) => request.validate(),
            ClientCommand::Reconnect(request) => request.validate(),
        }
    }
}

/// Payload for `match-create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    /// Acting player.
    pub player_id: Uuid,
    /// Display name for the challenger seat.
    pub name: String,
}

impl Validate for CreateMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_display_name(&self.name) {
            errors.add("name", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload for `match-join`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMatchRequest {
    /// Target match code.
    pub match_id: String,
    /// Acting player.
    pub player_id: Uuid,
    /// Display name for the acceptor seat.
    pub name: String,
}

impl Validate for JoinMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_match_code(&self.match_id) {
            errors.add("matchId", err);
        }
        if let Err(err) = validate_display_name(&self.name) {
            errors.add("name", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload for `set-ready`. Omitting `card` asks the server to generate one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReadyRequest {
    /// Target match code.
    pub match_id: String,
    /// Acting player.
    pub player_id: Uuid,
    /// Client-supplied card, if any; validated before use.
    #[serde(default)]
    pub card: Option<Vec<Vec<CardValue>>>,
}

impl Validate for SetReadyRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_match_code(&self.match_id) {
            errors.add("matchId", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload for `make-move`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMoveRequest {
    /// Target match code.
    pub match_id: String,
    /// Acting player.
    pub player_id: Uuid,
    /// Called value.
    pub value: CardValue,
}

impl Validate for MakeMoveRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_match_code(&self.match_id) {
            errors.add("matchId", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload for `mark-line`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkLineRequest {
    /// Target match code.
    pub match_id: String,
    /// Acting player.
    pub player_id: Uuid,
    /// Values the client wants acknowledged as marked.
    pub values: Vec<CardValue>,
}

impl Validate for MarkLineRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_match_code(&self.match_id) {
            errors.add("matchId", err);
        }
        if self.values.is_empty() {
            let mut err = validator::ValidationError::new("values_empty");
            err.message = Some("mark-line requires at least one value".into());
            errors.add("values", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload for `claim-bingo`, `request-rematch`, `disconnect`, `reconnect`:
/// just the acting player and the target match.
macro_rules! simple_match_request {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            /// Target match code.
            pub match_id: String,
            /// Acting player.
            pub player_id: Uuid,
        }

        impl Validate for $name {
            fn validate(&self) -> Result<(), ValidationErrors> {
                let mut errors = ValidationErrors::new();
                if let Err(err) = validate_match_code(&self.match_id) {
                    errors.add("matchId", err);
                }
                if errors.is_empty() { Ok(()) } else { Err(errors) }
            }
        }
    };
}

simple_match_request!(
    /// Payload for `claim-bingo`.
    ClaimBingoRequest
);
simple_match_request!(
    /// Payload for `request-rematch`.
    RequestRematchRequest
);
simple_match_request!(
    /// Payload for `disconnect`.
    DisconnectRequest
);
simple_match_request!(
    /// Payload for `reconnect`.
    ReconnectRequest
);
