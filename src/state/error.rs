//! Errors returned by lobby actions.
//!
//! Every rejection happens before the lobby is touched, so an `Err` always
//! means "nothing changed".

use super::code::CodeError;
use super::ids::{LobbyId, PlayerId};

/// Coarse classification of a [`LobbyError`], for transport bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The lobby does not exist.
    NotFound,
    /// The action is not valid in the lobby's current state.
    BadRequest,
    /// The caller may not perform this action right now.
    Forbidden,
    /// The request payload is malformed.
    InputValidation,
    /// An internal invariant was violated.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::InputValidation => "input_validation",
            Self::Internal => "internal",
        }
    }
}

/// Lobby action errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    #[error("round has not started")]
    RoundNotStarted,

    #[error("not your turn")]
    NotYourTurn { player_id: PlayerId },

    #[error("winner cannot guess again")]
    AlreadyWon { player_id: PlayerId },

    #[error("invalid guess: {0}")]
    InvalidGuess(#[from] CodeError),

    #[error("invalid player name")]
    InvalidName,

    #[error("invalid lobby config: {0}")]
    InvalidConfig(String),

    #[error("secret missing for lobby {0}")]
    SecretMissing(LobbyId),
}

impl LobbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RoundNotStarted => ErrorKind::BadRequest,
            Self::NotYourTurn { .. } | Self::AlreadyWon { .. } => ErrorKind::Forbidden,
            Self::InvalidGuess(_) | Self::InvalidName | Self::InvalidConfig(_) => {
                ErrorKind::InputValidation
            }
            Self::SecretMissing(_) => ErrorKind::Internal,
        }
    }
}
