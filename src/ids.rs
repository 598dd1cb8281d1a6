//! Identifiers for quizzes, questions, sessions and participants
//!
//! Every record the engine stores is keyed by a random UUID wrapped in its own
//! newtype so that a participant id can never be passed where a question id is
//! expected. The host capability is also a UUID, but its `Debug` output is
//! redacted so it does not end up in logs.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            DeserializeFromStr,
            SerializeDisplay,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::from_str(s)?))
            }
        }
    };
}

define_id!(
    /// Identifies a quiz
    QuizId
);
define_id!(
    /// Identifies a question within a quiz
    QuestionId
);
define_id!(
    /// Identifies one live run of a quiz
    SessionId
);
define_id!(
    /// Identifies a player within a session
    ParticipantId
);

/// Opaque capability handed to the host when a session is created
///
/// Every host command must present the token issued for that session. It is
/// unguessable but carries no identity beyond possession.
#[derive(Copy, Clone, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct HostToken(Uuid);

impl HostToken {
    /// Issues a fresh random capability
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Debug for HostToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostToken(..)")
    }
}

impl Display for HostToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for HostToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}
