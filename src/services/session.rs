//! The match session engine: one owner task per active match.
//!
//! All commands addressed to the same match id funnel through that match's
//! owner over a bounded queue and are applied strictly sequentially, each
//! observing the fully-applied effect of the previous one. Callers await a
//! per-command reply channel, so the connection layer sees synchronous
//! request/response semantics. The engine never touches transport handles;
//! fan-out of the returned snapshots and deltas belongs to the caller.

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use validator::Validate;

use std::sync::{Arc, Weak};

use crate::{
    card::CardValue,
    config::EngineConfig,
    dao::{MatchStore, StorageError},
    dto::{ClientCommand, MatchSnapshot},
    dto::validation::MATCH_CODE_LENGTH,
    error::{CommandError, EngineError},
    services::{apply, cleanup::CleanupScheduler, delta},
    state::{MatchId, MatchPhase, MatchState, Participant, PlayerId},
};

const MATCH_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A command addressed to an existing match.
#[derive(Debug, Clone)]
pub enum Command {
    /// Take the acceptor seat.
    Join {
        /// Acting player.
        player_id: PlayerId,
        /// Display name for the seat.
        display_name: String,
    },
    /// Lock in a card and flag readiness.
    SetReady {
        /// Acting player.
        player_id: PlayerId,
        /// Client-supplied card; `None` asks for a server-generated one.
        card: Option<Vec<Vec<CardValue>>>,
    },
    /// Call a number.
    MakeMove {
        /// Acting player.
        player_id: PlayerId,
        /// Called value.
        value: CardValue,
    },
    /// Acknowledge already-called values.
    MarkLine {
        /// Acting player.
        player_id: PlayerId,
        /// Values to mark.
        values: Vec<CardValue>,
    },
    /// Claim the win.
    ClaimBingo {
        /// Acting player.
        player_id: PlayerId,
    },
    /// Report a dropped connection.
    Disconnect {
        /// Acting player.
        player_id: PlayerId,
    },
    /// Restore a dropped connection.
    Reconnect {
        /// Acting player.
        player_id: PlayerId,
    },
    /// Opt into a rematch.
    RequestRematch {
        /// Acting player.
        player_id: PlayerId,
    },
}

/// What an accepted command produced.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Full state after the command; always a valid substitute for the delta.
    pub snapshot: MatchSnapshot,
    /// Minimal change-set for clients that replay deltas in order.
    pub delta: delta::MatchDelta,
    /// The successor match, when this command completed a rematch handshake.
    pub rematch: Option<MatchSnapshot>,
}

struct Envelope {
    command: Command,
    reply: oneshot::Sender<Result<CommandOutcome, EngineError>>,
}

#[derive(Clone)]
struct OwnerHandle {
    tx: mpsc::Sender<Envelope>,
}

struct EngineInner {
    config: EngineConfig,
    store: Arc<dyn MatchStore>,
    cleanup: CleanupScheduler,
    owners: DashMap<MatchId, OwnerHandle>,
    sweeper: JoinHandle<()>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Cheaply cloneable handle to the session engine.
#[derive(Clone)]
pub struct MatchEngine {
    inner: Arc<EngineInner>,
}

impl MatchEngine {
    /// Build an engine over the given store and start the background tasks
    /// (cleanup reaper and expiry sweep).
    pub fn new(config: EngineConfig, store: Arc<dyn MatchStore>) -> Self {
        let (cleanup, mut reaped_rx) = CleanupScheduler::new(Arc::clone(&store));
        let sweeper =
            cleanup.spawn_expiry_sweep(config.match_ttl, config.expiry_sweep_interval);

        let inner = Arc::new(EngineInner {
            config,
            store,
            cleanup,
            owners: DashMap::new(),
            sweeper,
        });

        // Reaper: whenever cleanup removes a match, tear down its owner so
        // the task drains and stops. Holds only a weak reference so dropping
        // the engine shuts everything down.
        let weak: Weak<EngineInner> = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(id) = reaped_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.owners.remove(&id);
            }
        });

        Self { inner }
    }

    /// Validate and route one decoded client command.
    pub async fn execute(&self, command: ClientCommand) -> Result<CommandOutcome, EngineError> {
        command.validate().map_err(CommandError::from)?;
        match command {
            ClientCommand::MatchCreate(request) => {
                self.create_match(request.player_id, request.name).await
            }
            ClientCommand::MatchJoin(request) => {
                self.submit(
                    &request.match_id,
                    Command::Join {
                        player_id: request.player_id,
                        display_name: request.name,
                    },
                )
                .await
            }
            ClientCommand::SetReady(request) => {
                self.submit(
                    &request.match_id,
                    Command::SetReady {
                        player_id: request.player_id,
                        card: request.card,
                    },
                )
                .await
            }
            ClientCommand::MakeMove(request) => {
                self.submit(
                    &request.match_id,
                    Command::MakeMove {
                        player_id: request.player_id,
                        value: request.value,
                    },
                )
                .await
            }
            ClientCommand::MarkLine(request) => {
                self.submit(
                    &request.match_id,
                    Command::MarkLine {
                        player_id: request.player_id,
                        values: request.values,
                    },
                )
                .await
            }
            ClientCommand::ClaimBingo(request) => {
                self.submit(
                    &request.match_id,
                    Command::ClaimBingo {
                        player_id: request.player_id,
                    },
                )
                .await
            }
            ClientCommand::RequestRematch(request) => {
                self.submit(
                    &request.match_id,
                    Command::RequestRematch {
                        player_id: request.player_id,
                    },
                )
                .await
            }
            ClientCommand::Disconnect(request) => {
                self.submit(
                    &request.match_id,
                    Command::Disconnect {
                        player_id: request.player_id,
                    },
                )
                .await
            }
            ClientCommand::Reconnect(request) => {
                self.submit(
                    &request.match_id,
                    Command::Reconnect {
                        player_id: request.player_id,
                    },
                )
                .await
            }
        }
    }

    /// Open a brand-new match with the caller in the challenger seat.
    ///
    /// A player holds at most one active match: any pre-existing non-terminal
    /// match of theirs is discarded first so no orphaned session lingers.
    pub async fn create_match(
        &self,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<CommandOutcome, EngineError> {
        let discarded = self.inner.store.delete_all_by_player(player_id).await?;
        for id in &discarded {
            debug!(match_id = %id, %player_id, "discarded previous active match");
            self.inner.cleanup.cancel(id);
            self.inner.owners.remove(id);
        }

        let id = reserve_match_code(&self.inner.store).await?;
        let state = MatchState::new(id, Participant::new(player_id, display_name));
        self.inner.store.create(state.clone()).await?;

        let snapshot = MatchSnapshot::from(&state);
        let outcome = CommandOutcome {
            delta: delta::diff(&state, &state),
            snapshot,
            rematch: None,
        };
        self.install_owner(state);
        Ok(outcome)
    }

    /// Queue a command onto the match's owner and await its reply.
    pub async fn submit(
        &self,
        match_id: &str,
        command: Command,
    ) -> Result<CommandOutcome, EngineError> {
        let handle = self.owner(match_id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            command,
            reply: reply_tx,
        };
        if handle.tx.send(envelope).await.is_err() {
            // The owner stopped between lookup and send (match deleted).
            self.inner.owners.remove(match_id);
            return Err(EngineError::OwnerGone {
                match_id: match_id.to_owned(),
            });
        }
        reply_rx.await.map_err(|_| EngineError::OwnerGone {
            match_id: match_id.to_owned(),
        })?
    }

    /// Whether a cleanup timer is pending for the match; test instrumentation.
    pub fn cleanup_pending(&self, match_id: &str) -> bool {
        self.inner.cleanup.is_pending(match_id)
    }

    /// Look up the owner for a match, lazily spawning it from storage.
    async fn owner(&self, match_id: &str) -> Result<OwnerHandle, EngineError> {
        if let Some(existing) = self.inner.owners.get(match_id) {
            return Ok(existing.clone());
        }

        let Some(state) = self.inner.store.find_by_id(match_id.to_owned()).await? else {
            return Err(CommandError::MatchNotFound {
                match_id: match_id.to_owned(),
            }
            .into());
        };
        Ok(self.install_owner(state))
    }

    /// Spawn an owner task seeded with the given state, unless a concurrent
    /// caller installed one first.
    fn install_owner(&self, state: MatchState) -> OwnerHandle {
        match self.inner.owners.entry(state.id.clone()) {
            dashmap::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::channel(self.inner.config.command_queue_depth);
                tokio::spawn(owner_loop(
                    Arc::clone(&self.inner.store),
                    self.inner.cleanup.clone(),
                    self.inner.config.clone(),
                    state,
                    rx,
                ));
                entry.insert(OwnerHandle { tx }).clone()
            }
        }
    }
}

/// Generate a fresh shareable match code, retrying on the (rare) collision.
async fn reserve_match_code(store: &Arc<dyn MatchStore>) -> Result<MatchId, StorageError> {
    loop {
        let code: String = {
            let mut rng = rand::rng();
            (0..MATCH_CODE_LENGTH)
                .map(|_| MATCH_CODE_ALPHABET[rng.random_range(0..MATCH_CODE_ALPHABET.len())] as char)
                .collect()
        };
        if store.find_by_id(code.clone()).await?.is_none() {
            return Ok(code);
        }
    }
}

/// Single-writer loop owning one match. Runs until the engine drops the
/// owner handle (match deleted or evicted), draining commands strictly in
/// receipt order. A rejected or failed command never stops the loop.
async fn owner_loop(
    store: Arc<dyn MatchStore>,
    cleanup: CleanupScheduler,
    config: EngineConfig,
    mut state: MatchState,
    mut rx: mpsc::Receiver<Envelope>,
) {
    let match_id = state.id.clone();
    debug!(%match_id, "match owner started");
    while let Some(Envelope { command, reply }) = rx.recv().await {
        let result = handle_command(&store, &cleanup, &config, &mut state, command).await;
        let _ = reply.send(result);
    }
    debug!(%match_id, "match owner stopped");
}

async fn handle_command(
    store: &Arc<dyn MatchStore>,
    cleanup: &CleanupScheduler,
    config: &EngineConfig,
    state: &mut MatchState,
    command: Command,
) -> Result<CommandOutcome, EngineError> {
    let before = state.clone();
    let is_reconnect = matches!(command, Command::Reconnect { .. });

    let applied: Result<Option<MatchState>, CommandError> = match command {
        Command::Join {
            player_id,
            display_name,
        } => apply::join(state, player_id, display_name).map(|()| None),
        Command::SetReady { player_id, card } => {
            apply::set_ready(state, player_id, card.as_deref(), &config.card_rules).map(|()| None)
        }
        Command::MakeMove { player_id, value } => {
            apply::make_move(state, player_id, value, &config.card_rules).map(|()| None)
        }
        Command::MarkLine { player_id, values } => {
            apply::mark_line(state, player_id, &values, &config.card_rules).map(|()| None)
        }
        Command::ClaimBingo { player_id } => {
            apply::claim_bingo(state, player_id, config.instant_win).map(|()| None)
        }
        Command::Disconnect { player_id } => apply::disconnect(state, player_id).map(|()| None),
        Command::Reconnect { player_id } => apply::reconnect(state, player_id).map(|()| None),
        Command::RequestRematch { player_id } => {
            let completes_handshake = state
                .role_of(player_id)
                .map(|role| state.rematch_requests.get(role.opponent()))
                .unwrap_or(false)
                && state.rematch_match_id.is_none();
            let successor_id = if completes_handshake {
                Some(reserve_match_code(store).await?)
            } else {
                None
            };
            apply::request_rematch(state, player_id, successor_id)
        }
    };

    let successor = match applied {
        Ok(successor) => successor,
        Err(err) => {
            // Apply validates before mutating, so the state is untouched.
            debug!(match_id = %state.id, error = %err, "command rejected");
            return Err(err.into());
        }
    };

    state.touch();

    if let Some(successor) = &successor {
        if let Err(err) = store.create(successor.clone()).await {
            *state = before;
            return Err(err.into());
        }
    }
    if let Err(err) = store.save(state.clone()).await {
        // A failed save must not read as an accepted command.
        *state = before;
        if let Some(successor) = &successor {
            // Best effort: do not leave an orphaned successor behind.
            if let Err(err) = store.delete_by_id(successor.id.clone()).await {
                warn!(match_id = %successor.id, error = %err, "failed to roll back successor match");
            }
        }
        return Err(err.into());
    }

    // Cleanup policy: a grace window after completion, an accelerated one
    // once nobody is connected, cancelled on reconnect. Later schedules
    // replace earlier ones.
    if before.phase != MatchPhase::Completed && state.phase == MatchPhase::Completed {
        cleanup.schedule(state.id.clone(), config.completion_cleanup_delay);
    }
    if !before.connected_participants.is_empty() && state.connected_participants.is_empty() {
        cleanup.schedule(state.id.clone(), config.abandoned_cleanup_delay);
    }
    if is_reconnect {
        cleanup.cancel(&state.id);
    }

    Ok(CommandOutcome {
        snapshot: MatchSnapshot::from(&*state),
        delta: delta::diff(&before, state),
        rematch: successor.as_ref().map(MatchSnapshot::from),
    })
}
