//! Lobby state and storage.
//!
//! A lobby is one game session: its roster, turn pointer and round status.
//! The round secret is not part of [`Lobby`]; it lives in the
//! [`SecretStore`] next to the lobby map, so serializing a lobby can never
//! expose it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use tokio::task::JoinHandle;

use super::code::Secret;
use super::config::LobbyConfig;
use super::error::LobbyError;
use super::ids::{IdGenerator, LobbyId, PlayerId};
use super::player::Player;
use super::round::{RoundPhase, RoundSummary};

/// Lobby state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    /// Unique lobby ID
    pub id: LobbyId,

    /// Players in join order, which is also turn order
    pub players: Vec<Player>,

    /// Digits per code, fixed at creation
    pub code_length: usize,

    /// Index into `players` of whoever may guess next
    pub turn_index: usize,

    /// Solvers of the current round, in finishing order
    pub winners: Vec<PlayerId>,

    /// Whether a round is active
    pub started: bool,

    pub phase: RoundPhase,

    /// Rounds started so far (0 before the first start)
    pub round: u32,

    pub num_games: u32,

    /// Solvers needed to end a round
    pub max_winners: usize,

    /// Whether subscribers see everyone's guesses
    pub show_all_guesses: bool,

    /// Outcome of the most recently resolved round
    pub last_round: Option<RoundSummary>,

    /// When lobby was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Lobby {
    /// Create a lobby waiting for its first round.
    pub fn new(id: LobbyId, config: LobbyConfig) -> Self {
        Self {
            id,
            players: Vec::new(),
            code_length: config.code_length,
            turn_index: 0,
            winners: Vec::new(),
            started: false,
            phase: RoundPhase::Waiting,
            round: 0,
            num_games: config.num_games,
            max_winners: config.max_winners,
            show_all_guesses: config.show_all_guesses,
            last_round: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Append a player at the end of the turn order.
    pub fn add_player(&mut self, player: Player) -> &Player {
        self.players.push(player);
        let last = self.players.len() - 1;
        &self.players[last]
    }

    /// Get a player by ID.
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// Get a mutable player by ID.
    pub fn player_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == player_id)
    }

    /// Position of a player in the turn order.
    pub fn player_index(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == player_id)
    }

    /// Check if player is in the lobby.
    pub fn has_player(&self, player_id: &PlayerId) -> bool {
        self.player_index(player_id).is_some()
    }

    /// Player whose turn it is.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn_index)
    }

    /// Check if it's a player's turn.
    pub fn is_player_turn(&self, player_id: &PlayerId) -> bool {
        self.current_player().is_some_and(|p| &p.id == player_id)
    }

    /// Check if player solved the current round.
    pub fn is_winner(&self, player_id: &PlayerId) -> bool {
        self.winners.contains(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Convert to JSON for sending to clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Acquire a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-lobby values, each behind its own mutex.
pub(crate) type SlotMap<T> = RwLock<HashMap<LobbyId, Arc<Mutex<T>>>>;

/// The lobby's slot, if one was ever created.
pub(crate) fn find_slot<T>(map: &SlotMap<T>, lobby_id: &LobbyId) -> Option<Arc<Mutex<T>>> {
    map.read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(lobby_id)
        .cloned()
}

/// The lobby's slot, created empty on first use.
pub(crate) fn slot<T: Default>(map: &SlotMap<T>, lobby_id: &LobbyId) -> Arc<Mutex<T>> {
    if let Some(slot) = find_slot(map, lobby_id) {
        return slot;
    }
    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(lobby_id.clone())
        .or_default()
        .clone()
}

/// A stored lobby plus its pending restart, guarded together.
#[derive(Debug)]
pub struct LobbyEntry {
    pub lobby: Lobby,

    /// Bumped whenever a pending restart is superseded
    restart_epoch: u64,

    restart_task: Option<JoinHandle<()>>,
}

impl LobbyEntry {
    fn new(lobby: Lobby) -> Self {
        Self {
            lobby,
            restart_epoch: 0,
            restart_task: None,
        }
    }

    /// Cancel any pending restart and return the epoch a new one must carry.
    pub(crate) fn next_restart_epoch(&mut self) -> u64 {
        self.cancel_restart();
        self.restart_epoch
    }

    pub(crate) fn set_restart_task(&mut self, task: JoinHandle<()>) {
        self.restart_task = Some(task);
    }

    /// Claim the pending restart. False if it was cancelled or superseded.
    pub(crate) fn take_restart(&mut self, epoch: u64) -> bool {
        epoch == self.restart_epoch && self.restart_task.take().is_some()
    }

    /// Drop the pending restart, if any. Returns whether one was pending.
    pub(crate) fn cancel_restart(&mut self) -> bool {
        self.restart_epoch += 1;
        match self.restart_task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn has_pending_restart(&self) -> bool {
        self.restart_task.is_some()
    }
}

/// Round secrets by lobby. Has no serialization support.
///
/// Each lobby's secret has its own lock, so secret reads in one lobby never
/// wait on another.
#[derive(Debug, Default)]
pub struct SecretStore {
    secrets: SlotMap<Option<Secret>>,
}

impl SecretStore {
    pub fn set(&self, lobby_id: &LobbyId, secret: Secret) {
        *lock(&slot(&self.secrets, lobby_id)) = Some(secret);
    }

    pub fn get(&self, lobby_id: &LobbyId) -> Option<Secret> {
        let slot = find_slot(&self.secrets, lobby_id)?;
        let secret = lock(&slot).clone();
        secret
    }

    pub fn clear(&self, lobby_id: &LobbyId) -> Option<Secret> {
        let slot = find_slot(&self.secrets, lobby_id)?;
        let secret = lock(&slot).take();
        secret
    }

    pub fn contains(&self, lobby_id: &LobbyId) -> bool {
        let Some(slot) = find_slot(&self.secrets, lobby_id) else {
            return false;
        };
        let present = lock(&slot).is_some();
        present
    }
}

/// Lobby store - tracks all lobbies and their secrets.
///
/// Each lobby sits behind its own mutex; the map lock is only held for
/// lookups and inserts.
#[derive(Debug, Default)]
pub struct LobbyStore {
    lobbies: RwLock<HashMap<LobbyId, Arc<Mutex<LobbyEntry>>>>,
    secrets: SecretStore,
}

impl LobbyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a new lobby with a fresh ID.
    pub fn create(&self, ids: &IdGenerator, config: LobbyConfig) -> Lobby {
        let mut lobbies = self.lobbies.write().unwrap_or_else(PoisonError::into_inner);
        let id = ids.lobby_id(|candidate| lobbies.contains_key(candidate));
        let lobby = Lobby::new(id.clone(), config);
        lobbies.insert(id, Arc::new(Mutex::new(LobbyEntry::new(lobby.clone()))));
        lobby
    }

    /// Handle to a lobby's guarded entry.
    pub fn entry(&self, lobby_id: &LobbyId) -> Result<Arc<Mutex<LobbyEntry>>, LobbyError> {
        self.lobbies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lobby_id)
            .cloned()
            .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))
    }

    /// Snapshot of a lobby.
    pub fn get(&self, lobby_id: &LobbyId) -> Result<Lobby, LobbyError> {
        let entry = self.entry(lobby_id)?;
        let guard = lock(&entry);
        Ok(guard.lobby.clone())
    }

    pub fn contains(&self, lobby_id: &LobbyId) -> bool {
        self.lobbies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(lobby_id)
    }

    /// Count lobbies.
    pub fn count(&self) -> usize {
        self.lobbies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get all lobby IDs.
    pub fn lobby_ids(&self) -> Vec<LobbyId> {
        self.lobbies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn set_secret(&self, lobby_id: &LobbyId, secret: Secret) {
        self.secrets.set(lobby_id, secret);
    }

    pub fn get_secret(&self, lobby_id: &LobbyId) -> Option<Secret> {
        self.secrets.get(lobby_id)
    }

    pub fn clear_secret(&self, lobby_id: &LobbyId) -> Option<Secret> {
        self.secrets.clear(lobby_id)
    }
}
