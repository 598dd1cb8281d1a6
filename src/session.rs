//! Session lifecycle and participants
//!
//! A session is one live run of a quiz. It moves through
//! `waiting -> active -> finished` and never backwards. While active it tracks
//! the current question and whether that question's results are revealed.
//! The host drives every transition and must present the capability issued
//! when the session was created.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use crate::{
    error::Error,
    ids::{HostToken, ParticipantId, QuizId, SessionId},
    join_code::JoinCode,
    quiz::{Question, Quiz},
};

/// Lifecycle status of a session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Players may join; no question is live yet
    #[display("waiting")]
    Waiting,
    /// Questions are being played
    #[display("active")]
    Active,
    /// The quiz is over
    #[display("finished")]
    Finished,
}

/// Result of a host `advance` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Advance {
    /// Moved on to the question at this index
    Question(usize),
    /// The last question was done; the session is now finished
    Finished,
    /// The session no longer exists, nothing changed
    Ignored,
}

/// One live run of a quiz
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: SessionId,
    quiz_id: QuizId,
    #[serde(skip)]
    host_token: HostToken,
    join_code: JoinCode,
    status: Status,
    current_question_index: usize,
    show_leaderboard: bool,
    /// When the current question was put in front of players
    question_started_at: Option<SystemTime>,
    /// When the current question's time limit runs out
    question_ends_at: Option<SystemTime>,
}

impl Session {
    /// Creates a session in the waiting state
    pub fn new(id: SessionId, quiz_id: QuizId, host_token: HostToken, join_code: JoinCode) -> Self {
        Self {
            id,
            quiz_id,
            host_token,
            join_code,
            status: Status::Waiting,
            current_question_index: 0,
            show_leaderboard: false,
            question_started_at: None,
            question_ends_at: None,
        }
    }

    /// The session's identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The quiz being played
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    /// The code players use to join
    pub fn join_code(&self) -> JoinCode {
        self.join_code
    }

    /// Current lifecycle status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Zero-based index of the current question
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// Whether results of the current question are revealed
    pub fn show_leaderboard(&self) -> bool {
        self.show_leaderboard
    }

    /// When the current question started, if one has
    pub fn question_started_at(&self) -> Option<SystemTime> {
        self.question_started_at
    }

    /// When the current question's time runs out, if one has started
    pub fn question_ends_at(&self) -> Option<SystemTime> {
        self.question_ends_at
    }

    /// Checks the host capability
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthorized` if `token` was not issued for this session.
    pub fn authorize(&self, token: &HostToken) -> Result<(), Error> {
        if self.host_token == *token {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Whether the session still admits new players
    pub fn accepts_players(&self) -> bool {
        self.status == Status::Waiting
    }

    /// Whether answers to `question` are currently accepted
    ///
    /// Only the live question of an active session accepts answers, and only
    /// until its results are revealed.
    pub fn accepts_answers_for(&self, question: &Question) -> bool {
        self.status == Status::Active
            && !self.show_leaderboard
            && question.order == self.current_question_index
    }

    /// Seconds since the current question started, as measured by the server
    pub fn elapsed_secs(&self, now: SystemTime) -> Option<f64> {
        let started = self.question_started_at?;
        Some(
            now.duration_since(started)
                .unwrap_or_default()
                .as_secs_f64(),
        )
    }

    /// Moves a waiting session into play at its first question
    ///
    /// Returns `false` without changing anything if the session is already
    /// active.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if the session is finished.
    pub fn start(&mut self, quiz: &Quiz, now: SystemTime) -> Result<bool, Error> {
        match self.status {
            Status::Waiting => {
                self.status = Status::Active;
                self.show_leaderboard = false;
                self.stamp_question(quiz, now);
                Ok(true)
            }
            Status::Active => Ok(false),
            Status::Finished => Err(self.invalid()),
        }
    }

    /// Reveals the results of the current question
    ///
    /// Returns `false` if they were already revealed.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` unless the session is active.
    pub fn reveal(&mut self) -> Result<bool, Error> {
        match self.status {
            Status::Active => Ok(!std::mem::replace(&mut self.show_leaderboard, true)),
            Status::Waiting | Status::Finished => Err(self.invalid()),
        }
    }

    /// Moves to the next question, or finishes after the last one
    ///
    /// Finishing leaves the question index at the last question.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` unless the session is active.
    pub fn advance(&mut self, quiz: &Quiz, now: SystemTime) -> Result<Advance, Error> {
        if self.status != Status::Active {
            return Err(self.invalid());
        }

        let next = self.current_question_index + 1;
        if next >= quiz.len() {
            self.status = Status::Finished;
            Ok(Advance::Finished)
        } else {
            self.current_question_index = next;
            self.show_leaderboard = false;
            self.stamp_question(quiz, now);
            Ok(Advance::Question(next))
        }
    }

    fn stamp_question(&mut self, quiz: &Quiz, now: SystemTime) {
        let time_limit = quiz
            .question_at(self.current_question_index)
            .map(|q| q.time_limit);

        self.question_started_at = Some(now);
        self.question_ends_at = time_limit.and_then(|limit: Duration| now.checked_add(limit));
    }

    fn invalid(&self) -> Error {
        Error::InvalidTransition {
            status: self.status,
        }
    }
}

/// A player within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Unique identifier of the participant
    pub id: ParticipantId,
    /// The session joined
    pub session_id: SessionId,
    /// Display name
    pub name: String,
    /// Cumulative score, never decreases
    pub score: u64,
    /// Zero-based join position within the session, used to break ties
    pub joined: usize,
}
