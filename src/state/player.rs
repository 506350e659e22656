//! Players and their guess history.
//!
//! A player belongs to exactly one lobby. Guesses and the per-round
//! counters in [`PlayerStats`] are wiped at the end of every round;
//! `total_points` and `rounds_won` accumulate for the life of the lobby.

use serde::Serialize;

use super::code::{Code, GuessResult};
use super::ids::PlayerId;

/// One recorded guess. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    /// The guessed digits
    pub value: String,

    /// Feedback against the round's secret
    pub result: GuessResult,

    /// 1-based attempt number within the round
    pub round: usize,
}

/// Player scoring counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_points: u32,
    pub rounds_won: u32,

    /// Guesses made this round
    pub attempts: usize,

    /// Best `correct_positions` this round
    pub best_correct_positions: usize,

    /// Best `correct_digits` this round
    pub best_correct_digits: usize,

    /// Points earned this round
    pub round_points: u32,
}

/// A player's state within a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Guesses this round, oldest first
    pub guesses: Vec<Guess>,

    pub stats: PlayerStats,

    /// When the player joined the lobby
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            guesses: Vec::new(),
            stats: PlayerStats::default(),
            joined_at: chrono::Utc::now(),
        }
    }

    /// Store a scored guess and update this round's counters.
    pub fn record_guess(&mut self, code: &Code, result: GuessResult) -> &Guess {
        self.stats.attempts += 1;
        self.stats.best_correct_positions =
            self.stats.best_correct_positions.max(result.correct_positions);
        self.stats.best_correct_digits = self.stats.best_correct_digits.max(result.correct_digits);

        let round = self.guesses.len() + 1;
        self.guesses.push(Guess {
            value: code.as_str().to_string(),
            result,
            round,
        });
        &self.guesses[round - 1]
    }

    /// Add points to the running total.
    pub fn award(&mut self, points: u32) {
        self.stats.total_points = self.stats.total_points.saturating_add(points);
        self.stats.round_points = self.stats.round_points.saturating_add(points);
    }

    /// Clear guesses and per-round counters, keeping totals.
    pub fn reset_round(&mut self) {
        self.guesses.clear();
        self.stats.attempts = 0;
        self.stats.best_correct_positions = 0;
        self.stats.best_correct_digits = 0;
        self.stats.round_points = 0;
    }
}
