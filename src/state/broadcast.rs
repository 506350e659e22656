//! Pushing lobby state to subscribers.
//!
//! Each subscriber is a bounded channel tied to a viewer. Every publish
//! builds a fresh redacted copy of the lobby for each viewer and hands it
//! over with `try_send`, so a slow or vanished subscriber never holds up
//! the action that triggered the publish. Subscribers whose channel is
//! closed or full are dropped.
//!
//! Every lobby's subscriber list has its own lock, so a publish to a busy
//! lobby never holds up publishes elsewhere.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::ids::{LobbyId, PlayerId};
use super::lobby::{find_slot, lock, slot, Lobby, SlotMap};

/// Outbound channel for one subscriber.
pub type SubscriberSender = mpsc::Sender<LobbyEvent>;

/// Message pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyEvent {
    /// Full lobby snapshot, already redacted for the receiving viewer
    State { lobby: Lobby },
}

impl LobbyEvent {
    pub fn lobby(&self) -> &Lobby {
        match self {
            Self::State { lobby } => lobby,
        }
    }

    /// Convert to JSON for sending to clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The lobby as `viewer` may see it.
///
/// Other players' guesses are emptied unless the lobby shows all guesses.
pub fn redact(lobby: &Lobby, viewer: &PlayerId) -> Lobby {
    let mut view = lobby.clone();
    if !view.show_all_guesses {
        for player in view.players.iter_mut().filter(|p| &p.id != viewer) {
            player.guesses.clear();
        }
    }
    view
}

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A live subscription, as returned to the transport layer.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub lobby_id: LobbyId,
    pub player_id: PlayerId,
    pub receiver: mpsc::Receiver<LobbyEvent>,
}

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    player_id: PlayerId,
    sender: SubscriberSender,
}

/// Subscriber registry - tracks live subscribers per lobby.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: SlotMap<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber viewing `lobby_id` as `player_id`.
    pub fn add_subscriber(
        &self,
        lobby_id: &LobbyId,
        player_id: PlayerId,
        sender: SubscriberSender,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&slot(&self.subscribers, lobby_id)).push(Subscriber {
            id,
            player_id,
            sender,
        });
        id
    }

    /// Remove a subscriber. Safe to call for unknown or removed handles.
    pub fn remove_subscriber(&self, lobby_id: &LobbyId, id: SubscriptionId) -> bool {
        let Some(slot) = find_slot(&self.subscribers, lobby_id) else {
            return false;
        };
        let mut list = lock(&slot);

        let before = list.len();
        list.retain(|s| s.id != id);
        list.len() != before
    }

    /// Push a redacted snapshot to every subscriber of the lobby.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, lobby: &Lobby) -> usize {
        let Some(slot) = find_slot(&self.subscribers, &lobby.id) else {
            return 0;
        };
        let mut list = lock(&slot);

        list.retain(|sub| {
            let event = LobbyEvent::State {
                lobby: redact(lobby, &sub.player_id),
            };
            match sub.sender.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        lobby_id = %lobby.id,
                        player_id = %sub.player_id,
                        subscription = sub.id.0,
                        "Dropping closed subscriber"
                    );
                    false
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        lobby_id = %lobby.id,
                        player_id = %sub.player_id,
                        subscription = sub.id.0,
                        "Dropping subscriber that fell behind"
                    );
                    false
                }
            }
        });
        list.len()
    }

    /// Count live subscribers of a lobby.
    pub fn subscriber_count(&self, lobby_id: &LobbyId) -> usize {
        let Some(slot) = find_slot(&self.subscribers, lobby_id) else {
            return 0;
        };
        let count = lock(&slot).len();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::code::{Code, GuessResult};
    use crate::state::config::LobbyConfig;
    use crate::state::player::Player;
    use pretty_assertions::assert_eq;

    fn make_lobby(show_all_guesses: bool) -> Lobby {
        let config = LobbyConfig {
            show_all_guesses,
            ..LobbyConfig::default()
        };
        let mut lobby = Lobby::new(LobbyId::from("lobby-1"), config);
        for id in ["x", "y"] {
            let mut player = Player::new(PlayerId::from(id), id.to_uppercase());
            player.record_guess(
                &Code::parse("1243", 4).unwrap(),
                GuessResult {
                    correct_positions: 2,
                    correct_digits: 4,
                },
            );
            lobby.add_player(player);
        }
        lobby
    }

    fn guess_counts(lobby: &Lobby) -> Vec<usize> {
        lobby.players.iter().map(|p| p.guesses.len()).collect()
    }

    #[test]
    fn test_redact_hides_other_players() {
        let lobby = make_lobby(false);

        let view = redact(&lobby, &PlayerId::from("x"));
        assert_eq!(guess_counts(&view), vec![1, 0]);

        let view = redact(&lobby, &PlayerId::from("y"));
        assert_eq!(guess_counts(&view), vec![0, 1]);

        // Stats stay visible
        assert_eq!(view.players[0].stats, lobby.players[0].stats);
    }

    #[test]
    fn test_redact_show_all() {
        let lobby = make_lobby(true);
        let view = redact(&lobby, &PlayerId::from("someone-else"));
        assert_eq!(view, lobby);
    }

    #[test]
    fn test_redact_spectator_sees_no_guesses() {
        let lobby = make_lobby(false);
        let view = redact(&lobby, &PlayerId::from("spectator"));
        assert_eq!(guess_counts(&view), vec![0, 0]);
    }

    #[test]
    fn test_publish_per_viewer() {
        let lobby = make_lobby(false);
        let broadcaster = Broadcaster::new();
        let (tx_x, mut rx_x) = mpsc::channel(4);
        let (tx_y, mut rx_y) = mpsc::channel(4);
        broadcaster.add_subscriber(&lobby.id, PlayerId::from("x"), tx_x);
        broadcaster.add_subscriber(&lobby.id, PlayerId::from("y"), tx_y);

        assert_eq!(broadcaster.publish(&lobby), 2);

        let seen_by_x = rx_x.try_recv().unwrap();
        let seen_by_y = rx_y.try_recv().unwrap();
        assert_eq!(guess_counts(seen_by_x.lobby()), vec![1, 0]);
        assert_eq!(guess_counts(seen_by_y.lobby()), vec![0, 1]);
    }

    #[test]
    fn test_publish_drops_dead_subscribers() {
        let lobby = make_lobby(true);
        let broadcaster = Broadcaster::new();
        let (tx_dead, rx_dead) = mpsc::channel(4);
        let (tx_live, mut rx_live) = mpsc::channel(4);
        broadcaster.add_subscriber(&lobby.id, PlayerId::from("x"), tx_dead);
        broadcaster.add_subscriber(&lobby.id, PlayerId::from("y"), tx_live);
        drop(rx_dead);

        assert_eq!(broadcaster.publish(&lobby), 1);
        assert_eq!(broadcaster.subscriber_count(&lobby.id), 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn test_publish_drops_full_subscribers() {
        let lobby = make_lobby(true);
        let broadcaster = Broadcaster::new();
        let (tx, _rx) = mpsc::channel(1);
        broadcaster.add_subscriber(&lobby.id, PlayerId::from("x"), tx);

        assert_eq!(broadcaster.publish(&lobby), 1);
        assert_eq!(broadcaster.publish(&lobby), 0);
        assert_eq!(broadcaster.subscriber_count(&lobby.id), 0);
    }

    #[test]
    fn test_remove_subscriber_idempotent() {
        let broadcaster = Broadcaster::new();
        let lobby_id = LobbyId::from("lobby-1");
        let (tx, _rx) = mpsc::channel(1);
        let id = broadcaster.add_subscriber(&lobby_id, PlayerId::from("x"), tx);

        assert!(broadcaster.remove_subscriber(&lobby_id, id));
        assert!(!broadcaster.remove_subscriber(&lobby_id, id));
        assert!(!broadcaster.remove_subscriber(&LobbyId::from("other"), id));
        assert_eq!(broadcaster.subscriber_count(&lobby_id), 0);
    }

    #[test]
    fn test_redact_keeps_lobby_fields() {
        let mut lobby = make_lobby(false);
        lobby.turn_index = 1;
        lobby.winners.push(PlayerId::from("x"));

        let mut view = redact(&lobby, &PlayerId::from("x"));
        assert_eq!(view.players[1].guesses.len(), 0);

        // Restoring the hidden guesses gives back the original lobby
        view.players[1].guesses = lobby.players[1].guesses.clone();
        assert_eq!(view, lobby);
    }

    #[test]
    fn test_publish_not_blocked_by_other_lobby() {
        let busy = make_lobby(true);
        let mut quiet = make_lobby(true);
        quiet.id = LobbyId::from("lobby-2");

        let broadcaster = Broadcaster::new();
        let (tx_busy, _rx_busy) = mpsc::channel(4);
        let (tx_quiet, mut rx_quiet) = mpsc::channel(4);
        broadcaster.add_subscriber(&busy.id, PlayerId::from("x"), tx_busy);
        broadcaster.add_subscriber(&quiet.id, PlayerId::from("y"), tx_quiet);

        let busy_slot = slot(&broadcaster.subscribers, &busy.id);
        let _held = lock(&busy_slot);

        assert_eq!(broadcaster.publish(&quiet), 1);
        assert_eq!(broadcaster.subscriber_count(&quiet.id), 1);
        assert!(rx_quiet.try_recv().is_ok());
    }

    #[test]
    fn test_event_json_shape() {
        let lobby = make_lobby(false);
        let event = LobbyEvent::State {
            lobby: redact(&lobby, &PlayerId::from("x")),
        };

        let json = event.to_json();
        assert_eq!(json["type"], "state");
        assert_eq!(json["lobby"]["id"], "lobby-1");
        assert_eq!(json["lobby"]["players"][0]["guesses"][0]["value"], "1243");
        assert_eq!(json["lobby"]["players"][1]["guesses"], serde_json::json!([]));
    }
}
