//! Lobby and player identifiers.
//!
//! Identifiers are short random base-36 strings. They only need to be
//! unlikely to collide within one process, so a fast non-cryptographic
//! source is used. Secrets come from [`super::code::SecretGenerator`]
//! instead.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default identifier length.
pub const DEFAULT_ID_LENGTH: usize = 6;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque lobby identifier.
    LobbyId
);

string_id!(
    /// Opaque player identifier, scoped to one lobby.
    PlayerId
);

/// Random identifier source.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    length: usize,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    /// Generate a raw identifier string.
    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }

    /// Generate a lobby id not rejected by `taken`.
    pub fn lobby_id(&self, taken: impl Fn(&LobbyId) -> bool) -> LobbyId {
        loop {
            let id = LobbyId(self.generate());
            if !taken(&id) {
                return id;
            }
        }
    }

    /// Generate a player id not rejected by `taken`.
    pub fn player_id(&self, taken: impl Fn(&PlayerId) -> bool) -> PlayerId {
        loop {
            let id = PlayerId(self.generate());
            if !taken(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let ids = IdGenerator::default();
        let id = ids.generate();

        assert_eq!(id.len(), DEFAULT_ID_LENGTH);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_zero_length_clamped() {
        assert_eq!(IdGenerator::new(0).generate().len(), 1);
    }

    #[test]
    fn test_collision_retry() {
        // Length 1 gives 36 possible ids; reject all but one.
        let ids = IdGenerator::new(1);
        let id = ids.player_id(|candidate| candidate.as_str() != "7");
        assert_eq!(id.as_str(), "7");
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = LobbyId::from("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
        assert_eq!(id.to_string(), "abc123");
    }
}
