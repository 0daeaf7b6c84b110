//! In-memory match store used by tests and by embedders that do not need
//! durable storage. Durable backends slot in behind the same trait.

use dashmap::DashMap;
use futures::{FutureExt, future::BoxFuture};
use time::OffsetDateTime;

use std::sync::Arc;

use crate::{
    dao::{
        match_store::MatchStore,
        storage::{StorageError, StorageResult},
    },
    state::{MatchId, MatchState, PlayerId},
};

/// Match store backed by a process-local concurrent map.
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    matches: Arc<DashMap<MatchId, MatchState>>,
}

impl InMemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored matches; test helper.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether the store holds no matches.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    fn seats(state: &MatchState, player_id: PlayerId) -> bool {
        state.role_of(player_id).is_some()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn create(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self.matches.entry(state.id.clone()) {
            dashmap::Entry::Occupied(entry) => Err(StorageError::AlreadyExists {
                id: entry.key().clone(),
            }),
            dashmap::Entry::Vacant(entry) => {
                entry.insert(state);
                Ok(())
            }
        };
        async move { result }.boxed()
    }

    fn save(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self.matches.entry(state.id.clone()) {
            dashmap::Entry::Occupied(mut entry) => {
                entry.insert(state);
                Ok(())
            }
            dashmap::Entry::Vacant(_) => Err(StorageError::NotFound { id: state.id }),
        };
        async move { result }.boxed()
    }

    fn find_by_id(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchState>>> {
        let found = self.matches.get(&id).map(|entry| entry.value().clone());
        async move { Ok(found) }.boxed()
    }

    fn delete_by_id(&self, id: MatchId) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.matches.remove(&id).is_some();
        async move { Ok(removed) }.boxed()
    }

    fn find_active_by_player(
        &self,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchState>>> {
        let found = self
            .matches
            .iter()
            .find(|entry| !entry.value().is_terminal() && Self::seats(entry.value(), player_id))
            .map(|entry| entry.value().clone());
        async move { Ok(found) }.boxed()
    }

    fn delete_all_by_player(
        &self,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchId>>> {
        let ids: Vec<MatchId> = self
            .matches
            .iter()
            .filter(|entry| !entry.value().is_terminal() && Self::seats(entry.value(), player_id))
            .map(|entry| entry.key().clone())
            .collect();
        for id in &ids {
            self.matches.remove(id);
        }
        async move { Ok(ids) }.boxed()
    }

    fn delete_idle_since(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchId>>> {
        let ids: Vec<MatchId> = self
            .matches
            .iter()
            .filter(|entry| entry.value().last_activity_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &ids {
            self.matches.remove(id);
        }
        async move { Ok(ids) }.boxed()
    }
}
