//! Transactional key-indexed storage
//!
//! The engine runs against a [`Store`]: quizzes keyed by id, session
//! aggregates keyed by id, and a unique index from join code to session.
//! Each session aggregate (the session, its participants and its answer
//! ledger) is the unit of transaction: `update_session` gives exclusive access
//! to one aggregate for the duration of the closure, so a read-check-write
//! inside it cannot interleave with another command on the same session.
//! Sessions are independent of each other.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexMap;

use crate::{
    ids::{ParticipantId, QuizId, SessionId},
    join_code::JoinCode,
    ledger::Ledger,
    quiz::Quiz,
    session::{Participant, Session},
};

/// A session together with everything that belongs to it
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// The session itself
    pub session: Session,
    /// Participants in join order
    pub participants: IndexMap<ParticipantId, Participant>,
    /// Answers given so far
    pub ledger: Ledger,
}

impl SessionRecord {
    /// Wraps a fresh session with no participants or answers
    pub fn new(session: Session) -> Self {
        Self {
            session,
            participants: IndexMap::new(),
            ledger: Ledger::default(),
        }
    }
}

/// Storage the engine reads and mutates
///
/// Implementations must make `insert_session` a single conditional write on
/// the join code, and must run each `update_session` closure with exclusive
/// access to that session's record.
pub trait Store: Send + Sync {
    /// Stores a quiz
    fn insert_quiz(&self, quiz: Quiz);

    /// Looks up a quiz
    fn quiz(&self, id: QuizId) -> Option<Arc<Quiz>>;

    /// Stores a new session if its join code is free
    ///
    /// Returns `false`, storing nothing, when another session holds the code.
    #[must_use]
    fn insert_session(&self, record: SessionRecord) -> bool;

    /// Finds the session holding a join code
    fn session_by_code(&self, code: JoinCode) -> Option<SessionId>;

    /// Runs `f` against a consistent snapshot of a session
    fn read_session<R>(&self, id: SessionId, f: impl FnOnce(&SessionRecord) -> R) -> Option<R>;

    /// Runs `f` with exclusive access to a session
    fn update_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> Option<R>;
}

/// In-memory store built on sharded concurrent maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    quizzes: DashMap<QuizId, Arc<Quiz>>,
    sessions: DashMap<SessionId, SessionRecord>,
    codes: DashMap<JoinCode, SessionId>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions stored
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Store for MemoryStore {
    fn insert_quiz(&self, quiz: Quiz) {
        self.quizzes.insert(quiz.id, Arc::new(quiz));
    }

    fn quiz(&self, id: QuizId) -> Option<Arc<Quiz>> {
        self.quizzes.get(&id).map(|quiz| Arc::clone(&quiz))
    }

    fn insert_session(&self, record: SessionRecord) -> bool {
        // the code's shard stays locked until the session is stored
        match self.codes.entry(record.session.join_code()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let id = record.session.id();
                self.sessions.insert(id, record);
                slot.insert(id);
                true
            }
        }
    }

    fn session_by_code(&self, code: JoinCode) -> Option<SessionId> {
        self.codes.get(&code).map(|id| *id)
    }

    fn read_session<R>(&self, id: SessionId, f: impl FnOnce(&SessionRecord) -> R) -> Option<R> {
        self.sessions.get(&id).map(|record| f(&record))
    }

    fn update_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(&id).map(|mut record| f(&mut record))
    }
}
