//! Round and turn state machine.
//!
//! Governs how a lobby moves through rounds, whose turn it is, and how
//! guesses are scored.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────────┐  start   ┌──────────┐  quota reached   ┌────────────┐
//! │ Waiting  │─────────▶│  Active  │─────────────────▶│ Restarting │
//! └──────────┘          └──────────┘    (resolve)     └─────┬──────┘
//!                         ▲    ▲                            │
//!                         │    └────────────────────────────┘
//!                         │        delay elapsed / start
//!                         │
//!                         └── start (any phase, resets the round)
//! ```
//!
//! Resolution is synchronous: the guess that fills the winner quota scores
//! the round and leaves the lobby in `Restarting`. Scheduling the restart
//! and generating secrets is left to the caller; everything here is pure
//! state.

use serde::Serialize;

use super::code::{Code, GuessResult, Secret};
use super::config::ScoringRules;
use super::error::LobbyError;
use super::ids::PlayerId;
use super::lobby::Lobby;
use super::player::Player;

/// Round lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// No round has been started yet
    #[default]
    Waiting,
    /// Guesses are accepted
    Active,
    /// Round resolved, next one pending
    Restarting,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Restarting => "restarting",
        }
    }

    /// Check if guesses are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Result of an accepted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    #[serde(flatten)]
    pub result: GuessResult,

    /// The guess cracked the code
    pub is_win: bool,

    /// The guess filled the winner quota and resolved the round
    pub round_over: bool,
}

/// Result of a player leaving.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub player: Player,

    /// The departure left only winners and resolved the round
    pub round_over: bool,
}

/// How one player did in a resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundResult {
    pub player_id: PlayerId,
    pub name: String,
    pub attempts: usize,

    /// Finishing position among solvers, 1-based
    pub placement: Option<usize>,

    /// All points earned this round, bonuses included
    pub points: u32,
}

/// Scoreboard of a resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round: u32,
    pub results: Vec<PlayerRoundResult>,
}

impl Lobby {
    /// Solvers needed before the round ends.
    ///
    /// Never more than the current roster, so a round where everyone has
    /// solved always ends.
    pub fn winner_quota(&self) -> usize {
        self.max_winners.min(self.players.len()).max(1)
    }

    pub fn quota_reached(&self) -> bool {
        self.winners.len() >= self.winner_quota()
    }

    /// Reset all round state and mark the round active.
    ///
    /// Used both for explicit starts and automatic restarts. The caller
    /// stores the new secret.
    pub fn begin_round(&mut self) {
        self.started = true;
        self.phase = RoundPhase::Active;
        self.turn_index = 0;
        self.winners.clear();
        self.round += 1;
        for player in &mut self.players {
            player.reset_round();
        }
    }

    /// Check a guess submission without touching state.
    pub fn validate_guess(&self, player_id: &PlayerId, value: &str) -> Result<Code, LobbyError> {
        if !self.started {
            return Err(LobbyError::RoundNotStarted);
        }
        if !self.is_player_turn(player_id) {
            return Err(LobbyError::NotYourTurn {
                player_id: player_id.clone(),
            });
        }
        if self.is_winner(player_id) {
            return Err(LobbyError::AlreadyWon {
                player_id: player_id.clone(),
            });
        }
        Ok(Code::parse(value, self.code_length)?)
    }

    /// Validate, score and record a guess from the current player.
    ///
    /// On rejection the lobby is unchanged.
    pub fn submit_guess(
        &mut self,
        player_id: &PlayerId,
        value: &str,
        secret: Option<&Secret>,
        rules: &ScoringRules,
    ) -> Result<GuessOutcome, LobbyError> {
        let code = self.validate_guess(player_id, value)?;
        let secret = secret.ok_or_else(|| LobbyError::SecretMissing(self.id.clone()))?;
        let result = secret.score(&code)?;

        let index = self.turn_index;
        let solved = result.is_solved(self.code_length);
        let player = &mut self.players[index];
        player.record_guess(&code, result);

        if solved {
            self.winners.push(player_id.clone());
            let bonus = rules.placement_bonus(self.winners.len());
            player.award(bonus);
            player.stats.rounds_won += 1;

            if self.quota_reached() {
                self.resolve(rules);
                return Ok(GuessOutcome {
                    result,
                    is_win: true,
                    round_over: true,
                });
            }
        }

        self.advance_turn();
        Ok(GuessOutcome {
            result,
            is_win: solved,
            round_over: false,
        })
    }

    /// First non-winner at or after `start`, wrapping around.
    fn next_eligible(&self, start: usize) -> Option<usize> {
        let count = self.players.len();
        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&i| !self.is_winner(&self.players[i].id))
    }

    /// Pass the turn to the next player who hasn't solved the code.
    pub fn advance_turn(&mut self) {
        if let Some(next) = self.next_eligible(self.turn_index + 1) {
            self.turn_index = next;
        }
    }

    /// Score the round and stop accepting guesses.
    ///
    /// Every player earns points for their best feedback; solvers also get
    /// the completion and efficiency bonuses. Per-round counters and
    /// guesses are cleared afterwards.
    pub fn resolve(&mut self, rules: &ScoringRules) -> RoundSummary {
        let mut results = Vec::with_capacity(self.players.len());

        for player in &mut self.players {
            let placement = self
                .winners
                .iter()
                .position(|id| id == &player.id)
                .map(|i| i + 1);

            let mut points = rules.performance(
                player.stats.best_correct_positions,
                player.stats.best_correct_digits,
            );
            if placement.is_some() {
                points = points
                    .saturating_add(rules.completion_bonus)
                    .saturating_add(rules.efficiency(player.stats.attempts));
            }
            player.award(points);

            results.push(PlayerRoundResult {
                player_id: player.id.clone(),
                name: player.name.clone(),
                attempts: player.stats.attempts,
                placement,
                points: player.stats.round_points,
            });
            player.reset_round();
        }

        self.started = false;
        self.phase = RoundPhase::Restarting;

        let summary = RoundSummary {
            round: self.round,
            results,
        };
        self.last_round = Some(summary.clone());
        summary
    }

    /// Remove a player and repair the turn pointer.
    ///
    /// Returns `None` if the player isn't in the lobby.
    pub fn remove_player(
        &mut self,
        player_id: &PlayerId,
        rules: &ScoringRules,
    ) -> Option<LeaveOutcome> {
        let removed = self.player_index(player_id)?;
        let player = self.players.remove(removed);
        self.winners.retain(|id| id != player_id);

        if self.players.is_empty() {
            self.turn_index = 0;
            return Some(LeaveOutcome {
                player,
                round_over: false,
            });
        }

        let held_turn = removed == self.turn_index;
        if removed < self.turn_index {
            self.turn_index -= 1;
        } else if held_turn {
            // The next player in order slid into this slot.
            self.turn_index %= self.players.len();
        }

        if !self.started {
            return Some(LeaveOutcome {
                player,
                round_over: false,
            });
        }

        if self.quota_reached() {
            self.resolve(rules);
            return Some(LeaveOutcome {
                player,
                round_over: true,
            });
        }

        if held_turn {
            if let Some(next) = self.next_eligible(self.turn_index) {
                self.turn_index = next;
            }
        }

        Some(LeaveOutcome {
            player,
            round_over: false,
        })
    }
}
