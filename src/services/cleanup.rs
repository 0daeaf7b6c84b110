//! Deferred deletion of completed or abandoned matches.
//!
//! At most one timer exists per match id: scheduling replaces any pending
//! timer and cancelling aborts it. When a timer fires the match is deleted
//! through the store and the id is pushed onto the reaper channel so the
//! engine can tear down the in-memory owner.

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, sleep},
};
use tracing::{debug, warn};

use std::{sync::Arc, time::Duration};

use crate::{
    dao::MatchStore,
    state::MatchId,
};

struct CleanupInner {
    store: Arc<dyn MatchStore>,
    timers: DashMap<MatchId, JoinHandle<()>>,
    reaped_tx: mpsc::UnboundedSender<MatchId>,
}

/// Scheduler owning the per-match deletion timers and the expiry sweep.
#[derive(Clone)]
pub struct CleanupScheduler {
    inner: Arc<CleanupInner>,
}

impl CleanupScheduler {
    /// Build a scheduler. The returned receiver yields the id of every match
    /// actually removed, timer-fired and swept alike.
    pub fn new(store: Arc<dyn MatchStore>) -> (Self, mpsc::UnboundedReceiver<MatchId>) {
        let (reaped_tx, reaped_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(CleanupInner {
                store,
                timers: DashMap::new(),
                reaped_tx,
            }),
        };
        (scheduler, reaped_rx)
    }

    /// Schedule deferred deletion, replacing any pending timer for the id so
    /// re-scheduling resets the clock.
    pub fn schedule(&self, match_id: MatchId, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        let id = match_id.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            inner.timers.remove(&id);
            delete_match(&inner, &id).await;
        });

        if let Some(previous) = self.inner.timers.insert(match_id, task) {
            previous.abort();
        }
    }

    /// Drop a pending timer, if any. Used when a participant reconnects.
    pub fn cancel(&self, match_id: &str) {
        if let Some((_, task)) = self.inner.timers.remove(match_id) {
            task.abort();
        }
    }

    /// Whether a timer is pending for the id.
    pub fn is_pending(&self, match_id: &str) -> bool {
        self.inner.timers.contains_key(match_id)
    }

    /// Spawn the periodic sweep deleting matches idle for longer than `ttl`.
    pub fn spawn_expiry_sweep(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let cutoff = OffsetDateTime::now_utc() - ttl;
                match inner.store.delete_idle_since(cutoff).await {
                    Ok(expired) => {
                        for id in expired {
                            debug!(match_id = %id, "expired idle match");
                            if let Some((_, task)) = inner.timers.remove(&id) {
                                task.abort();
                            }
                            let _ = inner.reaped_tx.send(id);
                        }
                    }
                    Err(err) => warn!(error = %err, "expiry sweep failed"),
                }
            }
        })
    }
}

/// Delete one match when its timer fires. A missing match is treated as
/// already cleaned; failures are logged and not retried.
async fn delete_match(inner: &CleanupInner, match_id: &str) {
    match inner.store.delete_by_id(match_id.to_owned()).await {
        Ok(true) => debug!(match_id, "cleaned up match"),
        Ok(false) => debug!(match_id, "match already gone at cleanup time"),
        Err(err) => warn!(match_id, error = %err, "failed to delete match during cleanup"),
    }
    let _ = inner.reaped_tx.send(match_id.to_owned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::InMemoryMatchStore;
    use crate::state::{MatchState, Participant};
    use tokio::time::timeout;
    use uuid::Uuid;

    fn seeded_store(id: &str) -> InMemoryMatchStore {
        let store = InMemoryMatchStore::new();
        let state = MatchState::new(id.into(), Participant::new(Uuid::new_v4(), "amaya".into()));
        assert!(futures::executor::block_on(store.create(state)).is_ok());
        store
    }

    #[tokio::test(start_paused = true)]
    async fn firing_deletes_the_match_and_reports_it() {
        let store = seeded_store("GONE01");
        let (scheduler, mut reaped) = CleanupScheduler::new(Arc::new(store.clone()));

        scheduler.schedule("GONE01".into(), Duration::from_secs(5));
        assert!(scheduler.is_pending("GONE01"));

        let id = timeout(Duration::from_secs(10), reaped.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, "GONE01");
        assert!(store.is_empty());
        assert!(!scheduler.is_pending("GONE01"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_keeps_the_match_alive() {
        let store = seeded_store("SAFE01");
        let (scheduler, _reaped) = CleanupScheduler::new(Arc::new(store.clone()));

        scheduler.schedule("SAFE01".into(), Duration::from_secs(5));
        scheduler.cancel("SAFE01");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.len(), 1);
        assert!(!scheduler.is_pending("SAFE01"));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_timer() {
        let store = seeded_store("WAIT01");
        let (scheduler, mut reaped) = CleanupScheduler::new(Arc::new(store.clone()));

        scheduler.schedule("WAIT01".into(), Duration::from_secs(5));
        scheduler.schedule("WAIT01".into(), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.len(), 1, "replaced timer must reset the clock");

        let id = timeout(Duration::from_secs(60), reaped.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, "WAIT01");
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_sweep_reaps_idle_matches() {
        let store = InMemoryMatchStore::new();
        let mut stale = MatchState::new(
            "IDLE01".into(),
            Participant::new(Uuid::new_v4(), "amaya".into()),
        );
        stale.last_activity_at = OffsetDateTime::now_utc() - time::Duration::hours(48);
        store.create(stale).await.unwrap();

        let (scheduler, mut reaped) = CleanupScheduler::new(Arc::new(store.clone()));
        let sweep = scheduler.spawn_expiry_sweep(
            Duration::from_secs(24 * 60 * 60),
            Duration::from_secs(60),
        );

        let id = timeout(Duration::from_secs(300), reaped.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, "IDLE01");
        assert!(store.is_empty());
        sweep.abort();
    }
}
