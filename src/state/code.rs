//! Codes, secrets and guess evaluation.
//!
//! A code is a fixed-length string of ASCII digits. Feedback is
//! Mastermind-style: the number of digits in the right position, and the
//! number of digits shared with the secret regardless of position.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Longest code a lobby may use.
pub const MAX_CODE_LENGTH: usize = 10;

/// Default code length.
pub const DEFAULT_CODE_LENGTH: usize = 4;

/// Malformed code input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("expected {expected} digits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("code must contain only digits")]
    NonDigit,
}

/// Feedback for one guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResult {
    /// Digits matching the secret at the same index
    pub correct_positions: usize,

    /// Digits shared with the secret, position ignored
    pub correct_digits: usize,
}

impl GuessResult {
    /// Whether this result solves a code of the given length.
    pub fn is_solved(&self, code_length: usize) -> bool {
        self.correct_positions == code_length
    }
}

/// Compare a guess against a secret.
///
/// Both strings must be ASCII digits of equal length.
pub fn evaluate(secret: &str, guess: &str) -> Result<GuessResult, CodeError> {
    if secret.len() != guess.len() {
        return Err(CodeError::LengthMismatch {
            expected: secret.len(),
            actual: guess.len(),
        });
    }
    if !is_digits(secret) || !is_digits(guess) {
        return Err(CodeError::NonDigit);
    }

    let mut secret_counts = [0usize; 10];
    let mut guess_counts = [0usize; 10];
    let mut correct_positions = 0;

    for (s, g) in secret.bytes().zip(guess.bytes()) {
        if s == g {
            correct_positions += 1;
        }
        secret_counts[usize::from(s - b'0')] += 1;
        guess_counts[usize::from(g - b'0')] += 1;
    }

    let correct_digits = secret_counts
        .iter()
        .zip(guess_counts.iter())
        .map(|(s, g)| (*s).min(*g))
        .sum();

    Ok(GuessResult {
        correct_positions,
        correct_digits,
    })
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// A validated guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code(String);

impl Code {
    /// Parse a guess for a lobby using `code_length` digits.
    ///
    /// The value must be exactly the digits; whitespace is a non-digit.
    pub fn parse(value: &str, code_length: usize) -> Result<Self, CodeError> {
        if !is_digits(value) {
            return Err(CodeError::NonDigit);
        }
        if value.len() != code_length {
            return Err(CodeError::LengthMismatch {
                expected: code_length,
                actual: value.len(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The hidden code of a round.
///
/// Not `Serialize`; `Debug` masks the digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Build a secret from known digits.
    pub fn parse(value: &str, code_length: usize) -> Result<Self, CodeError> {
        Code::parse(value, code_length).map(|code| Self(code.0))
    }

    /// Score a guess against this secret.
    pub fn score(&self, guess: &Code) -> Result<GuessResult, CodeError> {
        evaluate(&self.0, guess.as_str())
    }

    /// The secret digits. Server-side use only.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", "*".repeat(self.0.len()))
    }
}

/// Random source used for secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Thread-local PRNG. Fine for a casual game.
    #[default]
    Standard,
    /// Operating system randomness.
    OsRandom,
}

/// Generates round secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretGenerator {
    source: SecretSource,
}

impl SecretGenerator {
    pub fn new(source: SecretSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }

    /// Generate a secret of `code_length` digits.
    pub fn generate(&self, code_length: usize) -> Secret {
        let digits = match self.source {
            SecretSource::Standard => random_digits(&mut rand::thread_rng(), code_length),
            SecretSource::OsRandom => random_digits(&mut rand::rngs::OsRng, code_length),
        };
        Secret(digits)
    }
}

fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use proptest::string::string_regex;

    fn result(correct_positions: usize, correct_digits: usize) -> GuessResult {
        GuessResult {
            correct_positions,
            correct_digits,
        }
    }

    #[test]
    fn test_evaluate_transposed_digits() {
        assert_eq!(evaluate("1234", "1243").unwrap(), result(2, 4));
    }

    #[test]
    fn test_evaluate_no_overlap() {
        assert_eq!(evaluate("1234", "5678").unwrap(), result(0, 0));
    }

    #[test]
    fn test_evaluate_repeated_digits() {
        // Only one 1 in the secret, so the extra 1s in the guess don't count.
        assert_eq!(evaluate("1234", "1111").unwrap(), result(1, 1));
        assert_eq!(evaluate("1122", "2211").unwrap(), result(0, 4));
        assert_eq!(evaluate("1122", "1222").unwrap(), result(3, 3));
    }

    #[test]
    fn test_evaluate_rejects_bad_input() {
        assert_eq!(
            evaluate("1234", "123"),
            Err(CodeError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(evaluate("1234", "12a4"), Err(CodeError::NonDigit));
    }

    #[test]
    fn test_code_parse() {
        assert_eq!(Code::parse("0042", 4).unwrap().as_str(), "0042");
        assert_eq!(Code::parse(" 0042 ", 4), Err(CodeError::NonDigit));
        assert_eq!(Code::parse("0042\n", 4), Err(CodeError::NonDigit));
        assert!(matches!(
            Code::parse("12345", 4),
            Err(CodeError::LengthMismatch { .. })
        ));
        assert_eq!(Code::parse("12-4", 4), Err(CodeError::NonDigit));
        assert_eq!(Code::parse("１２３４", 4), Err(CodeError::NonDigit));
    }

    #[test]
    fn test_secret_debug_hides_digits() {
        let secret = Secret::parse("9876", 4).unwrap();
        assert_eq!(format!("{:?}", secret), "Secret(****)");
        assert_eq!(secret.reveal(), "9876");
    }

    #[test]
    fn test_generate_secret() {
        for source in [SecretSource::Standard, SecretSource::OsRandom] {
            let secret = SecretGenerator::new(source).generate(6);
            assert_eq!(secret.len(), 6);
            assert!(secret.reveal().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_secret_source_from_json() {
        let source: SecretSource = serde_json::from_str("\"os_random\"").unwrap();
        assert_eq!(source, SecretSource::OsRandom);
    }

    proptest! {
        #[test]
        fn prop_positions_bounded_by_digits(
            (secret, guess) in (1usize..=MAX_CODE_LENGTH).prop_flat_map(|len| {
                let pattern = format!("[0-9]{{{len}}}");
                (string_regex(&pattern).unwrap(), string_regex(&pattern).unwrap())
            })
        ) {
            let r = evaluate(&secret, &guess).unwrap();
            prop_assert!(r.correct_positions <= r.correct_digits);
            prop_assert!(r.correct_digits <= secret.len());
        }

        #[test]
        fn prop_self_match_is_full(secret in "[0-9]{1,10}") {
            let r = evaluate(&secret, &secret).unwrap();
            prop_assert_eq!(r, result(secret.len(), secret.len()));
        }

        #[test]
        fn prop_evaluate_is_symmetric(
            (a, b) in (1usize..=MAX_CODE_LENGTH).prop_flat_map(|len| {
                let pattern = format!("[0-9]{{{len}}}");
                (string_regex(&pattern).unwrap(), string_regex(&pattern).unwrap())
            })
        ) {
            prop_assert_eq!(evaluate(&a, &b).unwrap(), evaluate(&b, &a).unwrap());
        }
    }
}
