//! Library crate for bingo-duel-back: a two-player, turn-based bingo match
//! engine exposed to connection layers and integration tests.
//!
//! The connection layer decodes a [`dto::ClientCommand`] from the wire,
//! hands it to [`services::MatchEngine::execute`], and fans the returned
//! snapshot/delta out to the sockets joined to that match.

pub mod card;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod lines;
pub mod logging;
pub mod services;
pub mod state;
