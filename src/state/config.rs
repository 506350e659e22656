//! Coordinator and lobby configuration.
//!
//! Both configs deserialize from JSON with every field optional.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::code::{SecretSource, DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH};
use super::error::LobbyError;
use super::ids::DEFAULT_ID_LENGTH;

/// Default pause between a resolved round and the next one, in milliseconds.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 2000;

pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(DEFAULT_RESTART_DELAY_MS);

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Points awarded during and at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// Points per digit in the right place (best guess of the round)
    pub position_weight: u32,

    /// Points per shared digit (best guess of the round)
    pub digit_weight: u32,

    /// Bonus for finishing 1st, 2nd, 3rd, ...
    pub placement_bonuses: Vec<u32>,

    /// Bonus for any finish beyond `placement_bonuses`
    pub late_placement_bonus: u32,

    /// Flat bonus for solving the code
    pub completion_bonus: u32,

    /// Solvers get `efficiency_cap - attempts`, floored at zero
    pub efficiency_cap: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            position_weight: 4,
            digit_weight: 2,
            placement_bonuses: vec![50, 30, 20],
            late_placement_bonus: 10,
            completion_bonus: 100,
            efficiency_cap: 10,
        }
    }
}

impl ScoringRules {
    /// Bonus for the `placement`-th solver (1-based).
    pub fn placement_bonus(&self, placement: usize) -> u32 {
        placement
            .checked_sub(1)
            .and_then(|i| self.placement_bonuses.get(i))
            .copied()
            .unwrap_or(self.late_placement_bonus)
    }

    /// Score from a player's best feedback this round.
    pub fn performance(&self, best_positions: usize, best_digits: usize) -> u32 {
        let positions = u32::try_from(best_positions).unwrap_or(u32::MAX);
        let digits = u32::try_from(best_digits).unwrap_or(u32::MAX);
        positions
            .saturating_mul(self.position_weight)
            .saturating_add(digits.saturating_mul(self.digit_weight))
    }

    /// Bonus for solving in `attempts` guesses.
    pub fn efficiency(&self, attempts: usize) -> u32 {
        let attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
        self.efficiency_cap.saturating_sub(attempts)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.position_weight <= self.digit_weight {
            return Err(ConfigError::Invalid(
                "position_weight must exceed digit_weight".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-wide coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Pause between round resolution and automatic restart
    pub restart_delay_ms: u64,

    pub scoring: ScoringRules,

    /// Random source for round secrets
    pub secret_source: SecretSource,

    /// Queue depth per subscriber before it is dropped as too slow
    pub subscriber_buffer: usize,

    /// Length of generated lobby and player ids
    pub id_length: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            scoring: ScoringRules::default(),
            secret_source: SecretSource::default(),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            id_length: DEFAULT_ID_LENGTH,
        }
    }
}

impl CoordinatorConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid(
                "subscriber_buffer must be at least 1".to_string(),
            ));
        }
        if self.id_length < 4 {
            return Err(ConfigError::Invalid(
                "id_length must be at least 4".to_string(),
            ));
        }
        self.scoring.validate()
    }
}

/// Settings chosen when a lobby is created. Immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LobbyConfig {
    pub num_games: u32,

    /// Solvers needed to end a round
    pub max_winners: usize,

    /// Whether every subscriber sees every player's guesses
    pub show_all_guesses: bool,

    pub code_length: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            num_games: 5,
            max_winners: 1,
            show_all_guesses: true,
            code_length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl LobbyConfig {
    pub fn validate(&self) -> Result<(), LobbyError> {
        if self.max_winners == 0 {
            return Err(LobbyError::InvalidConfig(
                "maxWinners must be at least 1".to_string(),
            ));
        }
        if self.code_length == 0 || self.code_length > MAX_CODE_LENGTH {
            return Err(LobbyError::InvalidConfig(format!(
                "codeLength must be between 1 and {}",
                MAX_CODE_LENGTH
            )));
        }
        Ok(())
    }
}
