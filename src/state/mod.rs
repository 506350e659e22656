//! State management module for Code Breaker.
//!
//! This module provides the core state types and the [`Coordinator`] that
//! drives them:
//!
//! - `code` - Guess evaluation and secret generation
//! - `ids` - Lobby and player identifiers
//! - `player` - Players, guesses and scoring counters
//! - `lobby` - Lobby state, the lobby store and the secret store
//! - `round` - Round/turn state machine
//! - `broadcast` - Subscriber registry and per-viewer redaction
//! - `config` - Coordinator and lobby settings
//! - `error` - Action errors
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            Coordinator                               │
//! │                                                                      │
//! │  ┌──────────────────────────┐   ┌─────────────────────────────────┐  │
//! │  │        LobbyStore        │   │          Broadcaster            │  │
//! │  │                          │   │                                 │  │
//! │  │ lobby_id →               │   │ lobby_id →                      │  │
//! │  │   Mutex<LobbyEntry>      │   │   [(subscription, viewer, tx)]  │  │
//! │  │   (Lobby + restart task) │   │                                 │  │
//! │  │                          │   └─────────────────────────────────┘  │
//! │  │ SecretStore              │                                        │
//! │  │ lobby_id → Secret        │   round state machine: impl Lobby      │
//! │  └──────────────────────────┘                                        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every action locks exactly one lobby entry for its whole duration:
//! validation, mutation, secret update and publish all happen under that
//! lock, so actions on one lobby are totally ordered while different
//! lobbies proceed independently.

pub mod broadcast;
pub mod code;
pub mod config;
pub mod error;
pub mod ids;
pub mod lobby;
pub mod player;
pub mod round;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

// Re-export commonly used types
pub use broadcast::{
    redact, Broadcaster, LobbyEvent, SubscriberSender, Subscription, SubscriptionId,
};
pub use code::{evaluate, Code, CodeError, GuessResult, Secret, SecretGenerator, SecretSource};
pub use config::{ConfigError, CoordinatorConfig, LobbyConfig, ScoringRules};
pub use error::{ErrorKind, LobbyError};
pub use ids::{IdGenerator, LobbyId, PlayerId};
pub use lobby::{Lobby, LobbyEntry, LobbyStore, SecretStore};
pub use player::{Guess, Player, PlayerStats};
pub use round::{GuessOutcome, LeaveOutcome, PlayerRoundResult, RoundPhase, RoundSummary};

use lobby::lock;

/// Response to a successful join.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedLobby {
    pub player: Player,

    /// The lobby as the new player sees it
    pub lobby: Lobby,
}

/// Game coordinator: the action and query surface over all lobbies.
///
/// Cheap to clone; clones share the same lobbies. Each `new` call creates
/// an independent set of lobbies.
#[derive(Debug, Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: CoordinatorConfig,
    store: LobbyStore,
    broadcaster: Broadcaster,
    ids: IdGenerator,
    secrets: SecretGenerator,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let ids = IdGenerator::new(config.id_length);
        let secrets = SecretGenerator::new(config.secret_source);
        Self {
            inner: Arc::new(Inner {
                config,
                store: LobbyStore::new(),
                broadcaster: Broadcaster::new(),
                ids,
                secrets,
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Direct access to lobbies and secrets, for server-side tooling.
    pub fn store(&self) -> &LobbyStore {
        &self.inner.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    /// Run `f` with the lobby's entry locked.
    fn with_entry<R>(
        &self,
        lobby_id: &LobbyId,
        f: impl FnOnce(&mut LobbyEntry) -> Result<R, LobbyError>,
    ) -> Result<R, LobbyError> {
        let entry = self.inner.store.entry(lobby_id)?;
        let mut guard = lock(&entry);
        f(&mut guard)
    }

    /// Create a lobby waiting for its first round.
    pub fn create_lobby(&self, config: LobbyConfig) -> Result<Lobby, LobbyError> {
        config.validate()?;
        let lobby = self.inner.store.create(&self.inner.ids, config);
        tracing::info!(
            lobby_id = %lobby.id,
            max_winners = lobby.max_winners,
            show_all_guesses = lobby.show_all_guesses,
            code_length = lobby.code_length,
            "Lobby created"
        );
        Ok(lobby)
    }

    /// Add a player to a lobby. Allowed in any phase.
    pub fn join_lobby(&self, lobby_id: &LobbyId, name: &str) -> Result<JoinedLobby, LobbyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LobbyError::InvalidName);
        }

        self.with_entry(lobby_id, |entry| {
            let lobby = &mut entry.lobby;
            let player_id = self.inner.ids.player_id(|id| lobby.has_player(id));
            let player = lobby
                .add_player(Player::new(player_id, name.to_string()))
                .clone();

            tracing::debug!(
                lobby_id = %lobby.id,
                player_id = %player.id,
                players = lobby.player_count(),
                "Player joined"
            );
            self.inner.broadcaster.publish(lobby);

            Ok(JoinedLobby {
                lobby: redact(lobby, &player.id),
                player,
            })
        })
    }

    /// Start a fresh round now, whatever the lobby is doing.
    ///
    /// Resets the turn, winners and per-round state, issues a new secret
    /// and cancels any pending automatic restart.
    pub fn start_round(&self, lobby_id: &LobbyId) -> Result<(), LobbyError> {
        self.with_entry(lobby_id, |entry| {
            if entry.cancel_restart() {
                tracing::debug!(lobby_id = %lobby_id, "Cancelled pending restart");
            }
            self.open_round(entry);
            Ok(())
        })
    }

    /// Submit a guess for the player whose turn it is.
    pub fn submit_guess(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
        value: &str,
    ) -> Result<GuessOutcome, LobbyError> {
        self.with_entry(lobby_id, |entry| {
            let secret = self.inner.store.get_secret(lobby_id);
            let outcome = entry
                .lobby
                .submit_guess(player_id, value, secret.as_ref(), &self.inner.config.scoring)
                .map_err(|err| {
                    if let LobbyError::SecretMissing(_) = err {
                        tracing::error!(lobby_id = %lobby_id, "Active round has no secret");
                    } else {
                        tracing::debug!(
                            lobby_id = %lobby_id,
                            player_id = %player_id,
                            error = %err,
                            "Guess rejected"
                        );
                    }
                    err
                })?;

            tracing::debug!(
                lobby_id = %lobby_id,
                player_id = %player_id,
                correct_positions = outcome.result.correct_positions,
                correct_digits = outcome.result.correct_digits,
                is_win = outcome.is_win,
                "Guess accepted"
            );

            self.inner.broadcaster.publish(&entry.lobby);
            if outcome.round_over {
                self.finish_round(entry);
            }
            Ok(outcome)
        })
    }

    /// Remove a player. Leaving twice, or leaving a lobby one never
    /// joined, is a no-op.
    pub fn leave_lobby(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> Result<(), LobbyError> {
        self.with_entry(lobby_id, |entry| {
            let Some(outcome) = entry
                .lobby
                .remove_player(player_id, &self.inner.config.scoring)
            else {
                tracing::debug!(lobby_id = %lobby_id, player_id = %player_id, "Leave ignored");
                return Ok(());
            };

            tracing::debug!(
                lobby_id = %lobby_id,
                player_id = %outcome.player.id,
                players = entry.lobby.player_count(),
                "Player left"
            );
            self.inner.broadcaster.publish(&entry.lobby);
            if outcome.round_over {
                self.finish_round(entry);
            }
            Ok(())
        })
    }

    /// Subscribe to a lobby's state as seen by `player_id`.
    ///
    /// The current state is queued on the new subscription immediately.
    pub fn subscribe(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
    ) -> Result<Subscription, LobbyError> {
        self.with_entry(lobby_id, |entry| {
            let (tx, receiver) = mpsc::channel(self.inner.config.subscriber_buffer);
            let snapshot = LobbyEvent::State {
                lobby: redact(&entry.lobby, player_id),
            };
            if let Err(err) = tx.try_send(snapshot) {
                tracing::warn!(lobby_id = %lobby_id, error = %err, "Initial snapshot not queued");
            }

            let id = self
                .inner
                .broadcaster
                .add_subscriber(lobby_id, player_id.clone(), tx);
            tracing::debug!(
                lobby_id = %lobby_id,
                player_id = %player_id,
                subscription = id.value(),
                "Subscriber added"
            );

            Ok(Subscription {
                id,
                lobby_id: lobby_id.clone(),
                player_id: player_id.clone(),
                receiver,
            })
        })
    }

    /// Drop a subscription, e.g. when its transport closes.
    pub fn unsubscribe(&self, lobby_id: &LobbyId, subscription: SubscriptionId) -> bool {
        self.inner
            .broadcaster
            .remove_subscriber(lobby_id, subscription)
    }

    /// Full lobby state. Server-side use; clients get [`Coordinator::view_for`].
    pub fn lobby(&self, lobby_id: &LobbyId) -> Result<Lobby, LobbyError> {
        self.inner.store.get(lobby_id)
    }

    /// The lobby as `viewer` would see it in a published snapshot.
    pub fn view_for(&self, lobby_id: &LobbyId, viewer: &PlayerId) -> Result<Lobby, LobbyError> {
        self.with_entry(lobby_id, |entry| Ok(redact(&entry.lobby, viewer)))
    }

    /// Whether an automatic restart is waiting to fire.
    pub fn has_pending_restart(&self, lobby_id: &LobbyId) -> Result<bool, LobbyError> {
        self.with_entry(lobby_id, |entry| Ok(entry.has_pending_restart()))
    }

    /// Begin a round with a new secret and publish it.
    fn open_round(&self, entry: &mut LobbyEntry) {
        let lobby = &mut entry.lobby;
        lobby.begin_round();
        let secret = self.inner.secrets.generate(lobby.code_length);
        self.inner.store.set_secret(&lobby.id, secret);

        tracing::info!(
            lobby_id = %lobby.id,
            round = lobby.round,
            players = lobby.player_count(),
            "Round started"
        );
        self.inner.broadcaster.publish(lobby);
    }

    /// Bookkeeping after a round resolved: drop the secret and arm the
    /// restart timer.
    fn finish_round(&self, entry: &mut LobbyEntry) {
        let lobby_id = entry.lobby.id.clone();
        self.inner.store.clear_secret(&lobby_id);
        tracing::info!(
            lobby_id = %lobby_id,
            round = entry.lobby.round,
            winners = entry.lobby.winners.len(),
            "Round resolved"
        );

        let epoch = entry.next_restart_epoch();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(lobby_id = %lobby_id, "No runtime, round will not restart on its own");
            return;
        };

        let coordinator = self.clone();
        let delay = self.inner.config.restart_delay();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.auto_restart(&lobby_id, epoch);
        });
        entry.set_restart_task(task);
    }

    fn auto_restart(&self, lobby_id: &LobbyId, epoch: u64) {
        let result = self.with_entry(lobby_id, |entry| {
            if entry.take_restart(epoch) {
                self.open_round(entry);
            } else {
                tracing::debug!(lobby_id = %lobby_id, "Skipping superseded restart");
            }
            Ok(())
        });
        if let Err(err) = result {
            tracing::warn!(lobby_id = %lobby_id, error = %err, "Restart failed");
        }
    }
}
