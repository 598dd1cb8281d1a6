//! Push notifications for session changes
//!
//! Host and player views are pulled on demand, but a transport layer can also
//! register a [`Tunnel`] per session to be told when something changed and a
//! fresh view is worth fetching. Events never carry answer labels or scores,
//! so broadcasting them to every participant leaks nothing.

use serde::Serialize;

use crate::ids::{ParticipantId, QuestionId, SessionId};

/// Events published after a command changed a session
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A player joined the waiting room
    PlayerJoined {
        /// The session joined
        session: SessionId,
        /// The new participant
        participant: ParticipantId,
        /// The participant's display name
        name: String,
    },
    /// The host started the quiz
    Started {
        /// The session started
        session: SessionId,
    },
    /// The host revealed results for the current question
    LeaderboardShown {
        /// The session revealed
        session: SessionId,
        /// Index of the question whose results are shown
        question_index: usize,
    },
    /// The host moved on to another question
    QuestionAdvanced {
        /// The session advanced
        session: SessionId,
        /// Index of the new current question
        question_index: usize,
    },
    /// The quiz has ended
    Finished {
        /// The session finished
        session: SessionId,
    },
    /// A participant answered the current question
    AnswerRecorded {
        /// The session answered in
        session: SessionId,
        /// The question answered
        question: QuestionId,
        /// How many participants have answered it so far
        answered_count: usize,
    },
}

impl SessionEvent {
    /// Converts the event to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }

    /// The session the event belongs to
    pub fn session(&self) -> SessionId {
        match self {
            Self::PlayerJoined { session, .. }
            | Self::Started { session }
            | Self::LeaderboardShown { session, .. }
            | Self::QuestionAdvanced { session, .. }
            | Self::Finished { session }
            | Self::AnswerRecorded { session, .. } => *session,
        }
    }
}

/// Trait for sending session events through a communication tunnel
///
/// Implementations might forward events over WebSockets, Server-Sent Events
/// or an in-process channel. Sending must not block; the engine calls it after
/// the store transaction has completed.
pub trait Tunnel: Send + Sync {
    /// Sends an event to the client
    fn send_event(&self, event: &SessionEvent);

    /// Closes the tunnel
    ///
    /// Called once when the engine drops the tunnel because its session has
    /// finished. No events follow.
    fn close(&self) {}
}
