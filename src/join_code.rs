//! Join code generation and allocation
//!
//! Participants locate a session by typing a short code. Codes are six
//! uppercase characters drawn from an alphabet without easily confused symbols
//! (`I`/`1`, `O`/`0`), giving roughly a billion possible values. Allocation
//! retries a bounded number of times; each attempt is an atomic claim against
//! the store, so two sessions never hold the same code.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use tracing::warn;

use crate::{
    constants::join_code::{ALPHABET, LENGTH},
    error::Error as EngineError,
};

/// A human-enterable code identifying a session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct JoinCode([u8; LENGTH]);

impl JoinCode {
    /// Creates a join code using the supplied generator
    ///
    /// Useful for reproducible codes when seeded.
    pub fn with_rng(rng: &mut fastrand::Rng) -> Self {
        Self(std::array::from_fn(|_| ALPHABET[rng.usize(..ALPHABET.len())]))
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        // every byte comes from the ASCII alphabet
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Display for JoinCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a string is not a join code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The code does not have exactly six characters
    #[error("join code must be {LENGTH} characters")]
    Length,
    /// The code contains a symbol outside the alphabet
    #[error("join code contains an invalid character")]
    Symbol,
}

impl FromStr for JoinCode {
    type Err = ParseError;

    /// Parses a join code, ignoring surrounding whitespace and letter case
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the code has the wrong length or uses a
    /// symbol outside the alphabet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != LENGTH {
            return Err(ParseError::Length);
        }

        let mut code = [0; LENGTH];
        for (slot, byte) in code.iter_mut().zip(bytes) {
            let upper = byte.to_ascii_uppercase();
            if !ALPHABET.contains(&upper) {
                return Err(ParseError::Symbol);
            }
            *slot = upper;
        }

        Ok(Self(code))
    }
}

/// Allocates a join code that no other session holds
///
/// `candidate` proposes codes and `claim` atomically reserves one, returning
/// `false` when another session already holds it. At most `attempts`
/// candidates are tried.
///
/// # Errors
///
/// Returns `Error::CodeSpaceExhausted` if every attempt collided.
pub fn allocate<G, C>(attempts: usize, mut candidate: G, mut claim: C) -> Result<JoinCode, EngineError>
where
    G: FnMut() -> JoinCode,
    C: FnMut(JoinCode) -> bool,
{
    for attempt in 1..=attempts {
        let code = candidate();
        if claim(code) {
            return Ok(code);
        }
        warn!(%code, attempt, "join code collision");
    }

    Err(EngineError::CodeSpaceExhausted)
}
