//! Code Breaker State Library
//!
//! This crate provides lobby and round state management for Code Breaker,
//! a multiplayer turn-based number-guessing game.
//!
//! # Overview
//!
//! Players join a lobby and take turns guessing a hidden digit code. Each
//! guess is answered with two numbers: digits in the right position, and
//! digits shared with the code. Once enough players crack the code the
//! round is scored and, after a short pause, a new round begins with a new
//! code.
//!
//! The state module provides:
//!
//! - **Round/Turn State Machine** - Turn order, winner exclusion, win quota,
//!   round resolution and scoring.
//!
//! - **Lobby Store** - Lobbies by ID, plus a separate store for round secrets
//!   that has no serialization support at all.
//!
//! - **Broadcaster** - Per-lobby subscribers, each receiving a snapshot
//!   redacted for its viewer.
//!
//! - **Coordinator** - The action surface (create, join, start, guess,
//!   leave, subscribe) tying it together, including the restart timer.
//!
//! # Design Principles
//!
//! 1. **The secret never leaves the server** - It is not a field of any
//!    serializable type.
//!
//! 2. **Rejections don't mutate** - Every check runs before any change.
//!
//! 3. **No networking** - Transports bind to [`Coordinator`] and forward
//!    [`LobbyEvent`]s from each [`Subscription`].
//!
//! 4. **Serialization-ready** - Lobby state and events serialize to the
//!    JSON clients expect.
//!
//! # Example
//!
//! ```rust
//! use codebreaker_state::state::{Coordinator, LobbyConfig};
//!
//! let coordinator = Coordinator::default();
//! let lobby = coordinator.create_lobby(LobbyConfig::default()).unwrap();
//!
//! let alice = coordinator.join_lobby(&lobby.id, "Alice").unwrap().player;
//! let bob = coordinator.join_lobby(&lobby.id, "Bob").unwrap().player;
//!
//! let mut updates = coordinator.subscribe(&lobby.id, &alice.id).unwrap();
//! coordinator.start_round(&lobby.id).unwrap();
//!
//! // Bob has to wait for his turn
//! assert!(coordinator.submit_guess(&lobby.id, &bob.id, "1234").is_err());
//!
//! let outcome = coordinator.submit_guess(&lobby.id, &alice.id, "1234").unwrap();
//! assert!(outcome.result.correct_positions <= outcome.result.correct_digits);
//!
//! // Initial snapshot, round start, guess
//! let mut snapshots = 0;
//! while updates.receiver.try_recv().is_ok() {
//!     snapshots += 1;
//! }
//! assert_eq!(snapshots, 3);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
