//! Errors surfaced by engine commands
//!
//! Every failure has its own variant so callers can branch on the condition
//! itself. Idempotent re-submissions and advancing a vanished session are
//! not errors; they are reported through outcome enums instead.

use serde::Serialize;
use thiserror::Error;

use crate::{names, session::Status};

/// Errors that can occur while executing a command
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The host capability does not match the session
    #[error("not authorized to control this session")]
    Unauthorized,
    /// No session exists with the given id or join code
    #[error("session not found")]
    SessionNotFound,
    /// No quiz exists with the given id
    #[error("quiz not found")]
    QuizNotFound,
    /// The question does not exist in the session's quiz
    #[error("question not found")]
    QuestionNotFound,
    /// The participant does not belong to the session
    #[error("participant not found")]
    ParticipantNotFound,
    /// The session is no longer admitting players
    #[error("this quiz is no longer accepting new players")]
    NotAcceptingPlayers,
    /// Answers for the question are not being accepted
    #[error("answers are closed for this question")]
    AnswersClosed,
    /// The command is not valid in the session's current status
    #[error("command not allowed while the session is {status}")]
    InvalidTransition {
        /// Status the session was in when the command arrived
        status: Status,
    },
    /// Every join code candidate collided with an existing session
    #[error("failed to generate a unique join code")]
    CodeSpaceExhausted,
    /// The display name was rejected
    #[error("invalid name: {0}")]
    InvalidName(names::Error),
    /// The quiz draft failed validation
    #[error("invalid quiz: {0}")]
    InvalidQuiz(String),
    /// The submitted answer is not an option label
    #[error("invalid option: {0:?}")]
    InvalidOption(String),
}

impl Error {
    /// Whether the error reports a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound
                | Self::QuizNotFound
                | Self::QuestionNotFound
                | Self::ParticipantNotFound
        )
    }
}

impl From<names::Error> for Error {
    fn from(err: names::Error) -> Self {
        Self::InvalidName(err)
    }
}
