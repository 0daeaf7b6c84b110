//! Abstraction over the persistence layer for match state.

use futures::future::BoxFuture;
use time::OffsetDateTime;

use crate::{
    dao::storage::StorageResult,
    state::{MatchId, MatchState, PlayerId},
};

/// Repository interface the session engine persists through.
///
/// "No active match" is a valid, common result, not an error: lookups return
/// `Ok(None)` and deletes report whether anything was removed.
pub trait MatchStore: Send + Sync {
    /// Insert a brand-new match; fails if the id already exists.
    fn create(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the stored state of an existing match. Fails when the id no
    /// longer exists, so a command racing a deletion cannot resurrect the
    /// match.
    fn save(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a match by id.
    fn find_by_id(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchState>>>;
    /// Delete a match by id, reporting whether it existed.
    fn delete_by_id(&self, id: MatchId) -> BoxFuture<'static, StorageResult<bool>>;
    /// Find the non-terminal match a player is seated in, if any.
    fn find_active_by_player(
        &self,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchState>>>;
    /// Delete every non-terminal match a player is seated in, returning the
    /// removed ids.
    fn delete_all_by_player(
        &self,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchId>>>;
    /// Delete matches whose last activity predates `cutoff`, returning the
    /// removed ids. Drives the expiry sweep.
    fn delete_idle_since(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchId>>>;
}
