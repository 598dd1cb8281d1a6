//! The command and query surface
//!
//! [`Engine`] ties the pieces together: it validates input, runs each
//! mutating command as a single transaction on the affected session, and
//! publishes a [`SessionEvent`] to any attached tunnels once the transaction
//! has completed. Reads build fresh views from one consistent snapshot.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use dashmap::DashMap;
use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use web_time::SystemTime;

use crate::{
    config::{ConfigError, EngineConfig, TimingPolicy},
    error::Error,
    ids::{HostToken, ParticipantId, QuestionId, QuizId, SessionId},
    join_code::{self, JoinCode},
    ledger::Submission,
    names,
    quiz::{OptionLabel, Quiz, QuizDraft},
    session::{Advance, Participant, Session, Status},
    store::{MemoryStore, SessionRecord, Store},
    tunnel::{SessionEvent, Tunnel},
    view::{self, HostView, PlayerView},
};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// The current time
    fn now(&self) -> SystemTime;
}

/// Wall clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// What the host receives after creating a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTicket {
    /// The new session
    pub session_id: SessionId,
    /// Capability required for every host command on this session
    pub host_token: HostToken,
    /// Code players type to join
    pub join_code: JoinCode,
}

/// What a player receives after joining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Joined {
    /// The session joined
    pub session_id: SessionId,
    /// The player's identity within the session
    pub participant_id: ParticipantId,
}

/// Public summary of a session, looked up by join code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPreview {
    /// The session behind the code
    pub session_id: SessionId,
    /// Its lifecycle status
    pub status: Status,
    /// Title of the quiz being played
    pub quiz_title: String,
    /// How many players have joined
    pub participant_count: usize,
}

/// A player's answer to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// Who is answering
    pub participant_id: ParticipantId,
    /// The question answered
    pub question_id: QuestionId,
    /// The session answered in
    pub session_id: SessionId,
    /// The option picked
    pub answer: OptionLabel,
    /// Seconds the player reports having taken
    pub time_taken: f64,
}

/// Runs live quiz sessions against a [`Store`]
pub struct Engine<S: Store = MemoryStore> {
    config: EngineConfig,
    store: S,
    clock: Arc<dyn Clock>,
    codes: Mutex<fastrand::Rng>,
    tunnels: DashMap<SessionId, Vec<Arc<dyn Tunnel>>>,
}

impl<S: Store + Debug> Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        // the default config is always within range
        Self::assemble(EngineConfig::default(), MemoryStore::new())
    }
}

impl Engine {
    /// Creates an engine backed by a fresh in-memory store
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a config value is out of range.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_store(config, MemoryStore::new())
    }
}

impl<S: Store> Engine<S> {
    /// Creates an engine backed by `store`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a config value is out of range.
    pub fn with_store(config: EngineConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, store))
    }

    fn assemble(config: EngineConfig, store: S) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            codes: Mutex::new(fastrand::Rng::new()),
            tunnels: DashMap::new(),
        }
    }

    /// Replaces the time source
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Seeds join code generation, making the sequence of codes reproducible
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            codes: Mutex::new(fastrand::Rng::with_seed(seed)),
            ..self
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a tunnel to receive events for a session
    ///
    /// The tunnel stays registered until it is detached or the session
    /// finishes, at which point it is closed.
    ///
    /// # Errors
    ///
    /// * `Error::SessionNotFound` - No session has this id
    /// * `Error::InvalidTransition` - The session has already finished
    pub fn attach_tunnel(
        &self,
        session_id: SessionId,
        tunnel: Arc<dyn Tunnel>,
    ) -> Result<(), Error> {
        // registering under the session's lock orders it against finishing
        self.store
            .read_session(session_id, |record| {
                let status = record.session.status();
                if status == Status::Finished {
                    return Err(Error::InvalidTransition { status });
                }
                self.tunnels.entry(session_id).or_default().push(tunnel);
                Ok(())
            })
            .unwrap_or(Err(Error::SessionNotFound))
    }

    /// Unregisters a tunnel, for instance when its client disconnects
    ///
    /// Returns whether the tunnel was registered for the session.
    pub fn detach_tunnel(&self, session_id: SessionId, tunnel: &Arc<dyn Tunnel>) -> bool {
        let Some(mut tunnels) = self.tunnels.get_mut(&session_id) else {
            return false;
        };
        let before = tunnels.len();
        tunnels.retain(|attached| !Arc::ptr_eq(attached, tunnel));
        let removed = tunnels.len() < before;
        drop(tunnels);

        self.tunnels.remove_if(&session_id, |_, tunnels| tunnels.is_empty());
        removed
    }

    /// Drops and closes every tunnel of a session
    fn close_tunnels(&self, session_id: SessionId) {
        if let Some((_, tunnels)) = self.tunnels.remove(&session_id) {
            for tunnel in tunnels {
                tunnel.close();
            }
        }
    }

    fn publish(&self, event: &SessionEvent) {
        // clone out so no shard lock is held while tunnels run
        let Some(tunnels) = self
            .tunnels
            .get(&event.session())
            .map(|tunnels| tunnels.value().clone())
        else {
            return;
        };
        for tunnel in tunnels {
            tunnel.send_event(event);
        }
    }

    fn next_code(&self) -> JoinCode {
        let mut rng = self.codes.lock().unwrap_or_else(PoisonError::into_inner);
        JoinCode::with_rng(&mut rng)
    }

    fn quiz_of(&self, session_id: SessionId) -> Result<Arc<Quiz>, Error> {
        let quiz_id = self
            .store
            .read_session(session_id, |record| record.session.quiz_id())
            .ok_or(Error::SessionNotFound)?;
        self.store.quiz(quiz_id).ok_or(Error::QuizNotFound)
    }

    /// Validates and stores a new quiz
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuiz` if the draft fails validation.
    pub fn create_quiz(&self, creator_id: &str, draft: QuizDraft) -> Result<QuizId, Error> {
        let quiz = draft.into_quiz(creator_id)?;
        let id = quiz.id;
        info!(quiz = %id, questions = quiz.len(), "quiz created");
        self.store.insert_quiz(quiz);
        Ok(id)
    }

    /// Looks up a quiz with its ordered questions
    pub fn quiz_details(&self, quiz_id: QuizId) -> Option<Arc<Quiz>> {
        self.store.quiz(quiz_id)
    }

    /// Opens a new session of a quiz for players to join
    ///
    /// Only the quiz's creator may host it.
    ///
    /// # Errors
    ///
    /// * `Error::QuizNotFound` - No quiz has this id
    /// * `Error::Unauthorized` - `creator_id` is not the quiz's creator
    /// * `Error::CodeSpaceExhausted` - No free join code was found
    pub fn create_session(&self, quiz_id: QuizId, creator_id: &str) -> Result<SessionTicket, Error> {
        let quiz = self.store.quiz(quiz_id).ok_or(Error::QuizNotFound)?;
        if quiz.creator_id != creator_id {
            warn!(quiz = %quiz_id, "session requested by someone other than the creator");
            return Err(Error::Unauthorized);
        }

        let session_id = SessionId::new();
        let host_token = HostToken::issue();
        let join_code = join_code::allocate(
            self.config.code_attempts,
            || self.next_code(),
            |code| {
                self.store.insert_session(SessionRecord::new(Session::new(
                    session_id, quiz_id, host_token, code,
                )))
            },
        )?;

        info!(session = %session_id, quiz = %quiz_id, code = %join_code, "session created");
        Ok(SessionTicket {
            session_id,
            host_token,
            join_code,
        })
    }

    /// Summarizes the session behind a join code
    ///
    /// Returns `None` if the code is malformed or unused.
    pub fn session_preview(&self, code: &str) -> Option<SessionPreview> {
        let code = code.parse::<JoinCode>().ok()?;
        let session_id = self.store.session_by_code(code)?;
        let (quiz_id, status, participant_count) = self.store.read_session(session_id, |record| {
            (
                record.session.quiz_id(),
                record.session.status(),
                record.participants.len(),
            )
        })?;
        let quiz = self.store.quiz(quiz_id)?;

        Some(SessionPreview {
            session_id,
            status,
            quiz_title: quiz.title.clone(),
            participant_count,
        })
    }

    /// Adds a player to a waiting session
    ///
    /// # Errors
    ///
    /// * `Error::SessionNotFound` - No session holds this code
    /// * `Error::NotAcceptingPlayers` - The session has started or is full
    /// * `Error::InvalidName` - The display name was rejected
    pub fn join_session(&self, code: &str, name: &str) -> Result<Joined, Error> {
        let code = code
            .parse::<JoinCode>()
            .map_err(|_| Error::SessionNotFound)?;
        let session_id = self
            .store
            .session_by_code(code)
            .ok_or(Error::SessionNotFound)?;
        let max_participants = self.config.max_participants;

        let participant = self
            .store
            .update_session(session_id, |record| -> Result<Participant, Error> {
                if !record.session.accepts_players() {
                    return Err(Error::NotAcceptingPlayers);
                }
                if record.participants.len() >= max_participants {
                    warn!(session = %session_id, max_participants, "session is full");
                    return Err(Error::NotAcceptingPlayers);
                }
                let name = names::validate(
                    name,
                    record.participants.values().map(|p| p.name.as_str()),
                )?;

                let participant = Participant {
                    id: ParticipantId::new(),
                    session_id,
                    name,
                    score: 0,
                    joined: record.participants.len(),
                };
                record
                    .participants
                    .insert(participant.id, participant.clone());
                Ok(participant)
            })
            .unwrap_or(Err(Error::SessionNotFound))?;

        info!(session = %session_id, participant = %participant.id, "player joined");
        self.publish(&SessionEvent::PlayerJoined {
            session: session_id,
            participant: participant.id,
            name: participant.name,
        });

        Ok(Joined {
            session_id,
            participant_id: participant.id,
        })
    }

    /// Runs a host command as one transaction on the session
    fn host_command<R>(
        &self,
        session_id: SessionId,
        token: &HostToken,
        command: impl FnOnce(&mut Session, &Quiz, SystemTime) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let quiz = self.quiz_of(session_id)?;
        let now = self.clock.now();

        self.store
            .update_session(session_id, |record| -> Result<R, Error> {
                record.session.authorize(token).inspect_err(|_| {
                    warn!(session = %session_id, "rejected host token");
                })?;
                command(&mut record.session, quiz.as_ref(), now)
            })
            .unwrap_or(Err(Error::SessionNotFound))
    }

    /// Starts the quiz at its first question
    ///
    /// Starting an already active session changes nothing.
    ///
    /// # Errors
    ///
    /// * `Error::SessionNotFound` - No session has this id
    /// * `Error::Unauthorized` - `token` was not issued for this session
    /// * `Error::InvalidTransition` - The session is finished
    pub fn start_quiz(&self, session_id: SessionId, token: &HostToken) -> Result<(), Error> {
        let started = self.host_command(session_id, token, |session, quiz, now| {
            session.start(quiz, now)
        })?;

        if started {
            info!(session = %session_id, "quiz started");
            self.publish(&SessionEvent::Started {
                session: session_id,
            });
        }
        Ok(())
    }

    /// Reveals the results of the current question
    ///
    /// # Errors
    ///
    /// * `Error::SessionNotFound` - No session has this id
    /// * `Error::Unauthorized` - `token` was not issued for this session
    /// * `Error::InvalidTransition` - The session is not active
    pub fn show_leaderboard(&self, session_id: SessionId, token: &HostToken) -> Result<(), Error> {
        let (revealed, question_index) = self.host_command(session_id, token, |session, _, _| {
            Ok((session.reveal()?, session.current_question_index()))
        })?;

        if revealed {
            info!(session = %session_id, question_index, "results revealed");
            self.publish(&SessionEvent::LeaderboardShown {
                session: session_id,
                question_index,
            });
        }
        Ok(())
    }

    /// Moves to the next question, finishing the session after the last one
    ///
    /// Advancing a session that does not exist is not an error: nothing
    /// happens and `Advance::Ignored` is returned.
    ///
    /// # Errors
    ///
    /// * `Error::Unauthorized` - `token` was not issued for this session
    /// * `Error::InvalidTransition` - The session is not active
    pub fn next_question(&self, session_id: SessionId, token: &HostToken) -> Result<Advance, Error> {
        let outcome = match self.host_command(session_id, token, |session, quiz, now| {
            session.advance(quiz, now)
        }) {
            Err(Error::SessionNotFound) => {
                warn!(session = %session_id, "advance on missing session ignored");
                return Ok(Advance::Ignored);
            }
            outcome => outcome?,
        };

        match outcome {
            Advance::Question(question_index) => {
                info!(session = %session_id, question_index, "advanced");
                self.publish(&SessionEvent::QuestionAdvanced {
                    session: session_id,
                    question_index,
                });
            }
            Advance::Finished => {
                info!(session = %session_id, "quiz finished");
                self.publish(&SessionEvent::Finished {
                    session: session_id,
                });
                self.close_tunnels(session_id);
            }
            Advance::Ignored => {}
        }
        Ok(outcome)
    }

    /// Records a player's answer and credits its points
    ///
    /// The first submission for a participant and question wins; repeats
    /// return `Submission::Duplicate` and change nothing.
    ///
    /// # Errors
    ///
    /// * `Error::SessionNotFound` - No session has this id
    /// * `Error::QuestionNotFound` - The question is not part of the session's quiz
    /// * `Error::ParticipantNotFound` - The participant is not in the session
    /// * `Error::AnswersClosed` - The question is not live
    pub fn submit_answer(&self, submission: &AnswerSubmission) -> Result<Submission, Error> {
        let AnswerSubmission {
            participant_id,
            question_id,
            session_id,
            answer,
            time_taken,
        } = *submission;

        let quiz = self.quiz_of(session_id)?;
        let question = quiz.question(question_id).ok_or(Error::QuestionNotFound)?;
        let timing = self.config.timing;
        let now = self.clock.now();

        let (outcome, answered_count) = self
            .store
            .update_session(session_id, |record| -> Result<(Submission, usize), Error> {
                let participant = record
                    .participants
                    .get_mut(&participant_id)
                    .ok_or(Error::ParticipantNotFound)?;
                if record.ledger.has_answered(participant_id, question_id) {
                    return Ok((Submission::Duplicate, 0));
                }
                if !record.session.accepts_answers_for(question) {
                    return Err(Error::AnswersClosed);
                }

                let time_taken = match timing {
                    TimingPolicy::ClientReported => time_taken,
                    TimingPolicy::ServerMeasured => {
                        record.session.elapsed_secs(now).unwrap_or(time_taken)
                    }
                };
                let outcome = record
                    .ledger
                    .record(participant, question, answer, time_taken);
                Ok((outcome, record.ledger.answered_count(question_id)))
            })
            .unwrap_or(Err(Error::SessionNotFound))?;

        match outcome {
            Submission::Recorded { correct, score } => {
                debug!(
                    session = %session_id,
                    participant = %participant_id,
                    question = %question_id,
                    correct,
                    score,
                    "answer recorded"
                );
                self.publish(&SessionEvent::AnswerRecorded {
                    session: session_id,
                    question: question_id,
                    answered_count,
                });
            }
            Submission::Duplicate => {
                debug!(
                    session = %session_id,
                    participant = %participant_id,
                    question = %question_id,
                    "duplicate answer ignored"
                );
            }
        }
        Ok(outcome)
    }

    /// Builds the host view of a session
    pub fn host_session_data(&self, session_id: SessionId) -> Option<HostView> {
        let quiz = self.quiz_of(session_id).ok()?;
        self.store
            .read_session(session_id, |record| view::host_view(record, &quiz))
    }

    /// Builds a participant's view of a session
    ///
    /// Returns `None` if the session does not exist or the participant is not
    /// part of it.
    pub fn player_session_data(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> Option<PlayerView> {
        let quiz = self.quiz_of(session_id).ok()?;
        self.store
            .read_session(session_id, |record| {
                view::player_view(record, &quiz, participant_id)
            })
            .flatten()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{thread, time::Duration};

    use itertools::Itertools;

    use super::*;
    use crate::{
        quiz::tests::{question_draft, quiz_draft},
        tunnel::tests::RecordingTunnel,
        view::PossiblyHidden,
    };

    const CREATOR: &str = "creator";

    /// Clock that only moves when told to
    struct ManualClock(Arc<Mutex<SystemTime>>);

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.0.lock().unwrap()
        }
    }

    struct Hosted {
        engine: Engine,
        quiz: Arc<Quiz>,
        ticket: SessionTicket,
    }

    impl Hosted {
        fn new(engine: Engine, question_count: usize) -> Self {
            let quiz_id = engine
                .create_quiz(CREATOR, quiz_draft(question_count))
                .unwrap();
            let ticket = engine.create_session(quiz_id, CREATOR).unwrap();
            let quiz = engine.quiz_details(quiz_id).unwrap();
            Self {
                engine,
                quiz,
                ticket,
            }
        }

        fn join(&self, name: &str) -> ParticipantId {
            self.engine
                .join_session(self.ticket.join_code.as_str(), name)
                .unwrap()
                .participant_id
        }

        fn start(&self) {
            self.engine
                .start_quiz(self.ticket.session_id, &self.ticket.host_token)
                .unwrap();
        }

        fn reveal(&self) {
            self.engine
                .show_leaderboard(self.ticket.session_id, &self.ticket.host_token)
                .unwrap();
        }

        fn advance(&self) -> Result<Advance, Error> {
            self.engine
                .next_question(self.ticket.session_id, &self.ticket.host_token)
        }

        fn submission(
            &self,
            participant_id: ParticipantId,
            question: usize,
            answer: OptionLabel,
            time_taken: f64,
        ) -> AnswerSubmission {
            AnswerSubmission {
                participant_id,
                question_id: self.quiz.questions[question].id,
                session_id: self.ticket.session_id,
                answer,
                time_taken,
            }
        }

        fn submit(
            &self,
            participant_id: ParticipantId,
            question: usize,
            answer: OptionLabel,
            time_taken: f64,
        ) -> Result<Submission, Error> {
            self.engine
                .submit_answer(&self.submission(participant_id, question, answer, time_taken))
        }

        fn score_of(&self, participant_id: ParticipantId) -> u64 {
            self.engine
                .host_session_data(self.ticket.session_id)
                .unwrap()
                .participants
                .into_iter()
                .find(|s| s.participant_id == participant_id)
                .unwrap()
                .score
        }
    }

    fn hosted(question_count: usize) -> Hosted {
        Hosted::new(Engine::default(), question_count)
    }

    #[test]
    fn test_create_quiz_rejects_invalid_draft() {
        let engine = Engine::default();
        assert!(matches!(
            engine.create_quiz(CREATOR, quiz_draft(0)),
            Err(Error::InvalidQuiz(_))
        ));
    }

    #[test]
    fn test_quiz_details() {
        let engine = Engine::default();
        let id = engine.create_quiz(CREATOR, quiz_draft(3)).unwrap();

        let quiz = engine.quiz_details(id).unwrap();
        assert_eq!(quiz.len(), 3);
        assert_eq!(quiz.questions.iter().map(|q| q.order).collect_vec(), vec![0, 1, 2]);
        assert!(engine.quiz_details(QuizId::new()).is_none());
    }

    #[test]
    fn test_create_session_checks_quiz_and_creator() {
        let engine = Engine::default();
        let id = engine.create_quiz(CREATOR, quiz_draft(1)).unwrap();

        assert_eq!(
            engine.create_session(QuizId::new(), CREATOR),
            Err(Error::QuizNotFound)
        );
        assert_eq!(
            engine.create_session(id, "someone else"),
            Err(Error::Unauthorized)
        );

        let ticket = engine.create_session(id, CREATOR).unwrap();
        let host = engine.host_session_data(ticket.session_id).unwrap();
        assert_eq!(host.session.status(), Status::Waiting);
        assert_eq!(host.session.join_code(), ticket.join_code);
        assert_eq!(host.session.current_question_index(), 0);
    }

    /// Store holding one quiz and a session on the first code a seed-7 engine proposes
    fn store_with_taken_code() -> (MemoryStore, QuizId, JoinCode) {
        let store = MemoryStore::new();
        let quiz = quiz_draft(1).into_quiz(CREATOR).unwrap();
        let quiz_id = quiz.id;
        store.insert_quiz(quiz);

        let taken = JoinCode::with_rng(&mut fastrand::Rng::with_seed(7));
        assert!(store.insert_session(SessionRecord::new(Session::new(
            SessionId::new(),
            quiz_id,
            HostToken::issue(),
            taken,
        ))));
        (store, quiz_id, taken)
    }

    #[test]
    fn test_create_session_gives_up_on_collisions() {
        let (store, quiz_id, _) = store_with_taken_code();
        let config = EngineConfig {
            code_attempts: 1,
            ..EngineConfig::default()
        };
        let engine = Engine::with_store(config, store).unwrap().with_seed(7);

        assert_eq!(
            engine.create_session(quiz_id, CREATOR),
            Err(Error::CodeSpaceExhausted)
        );
        assert_eq!(engine.store().session_count(), 1);
    }

    #[test]
    fn test_create_session_retries_after_collision() {
        let (store, quiz_id, taken) = store_with_taken_code();
        let engine = Engine::with_store(EngineConfig::default(), store)
            .unwrap()
            .with_seed(7);

        let ticket = engine.create_session(quiz_id, CREATOR).unwrap();

        assert_ne!(ticket.join_code, taken);
        assert_eq!(engine.store().session_count(), 2);
    }

    #[test]
    fn test_concurrent_sessions_get_unique_codes() {
        let engine = Engine::default();
        let quiz_id = engine.create_quiz(CREATOR, quiz_draft(1)).unwrap();

        let codes = thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..25)
                            .map(|_| engine.create_session(quiz_id, CREATOR).unwrap().join_code)
                            .collect_vec()
                    })
                })
                .collect_vec();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect_vec()
        });

        assert_eq!(codes.len(), 200);
        assert_eq!(codes.iter().unique().count(), 200);
        assert_eq!(engine.store().session_count(), 200);
    }

    #[test]
    fn test_session_preview() {
        let hosted = hosted(1);
        hosted.join("Ada");

        let lowercase = hosted.ticket.join_code.as_str().to_lowercase();
        let preview = hosted.engine.session_preview(&lowercase).unwrap();
        assert_eq!(preview.session_id, hosted.ticket.session_id);
        assert_eq!(preview.status, Status::Waiting);
        assert_eq!(preview.quiz_title, "Capitals");
        assert_eq!(preview.participant_count, 1);

        let unused = if hosted.ticket.join_code.as_str() == "ZZZZZZ" {
            "YYYYYY"
        } else {
            "ZZZZZZ"
        };
        assert!(hosted.engine.session_preview(unused).is_none());
        assert!(hosted.engine.session_preview("nope").is_none());
    }

    #[test]
    fn test_join_session() {
        let hosted = hosted(1);
        let joined = hosted
            .engine
            .join_session(&format!(" {} ", hosted.ticket.join_code), "  Ada ")
            .unwrap();
        assert_eq!(joined.session_id, hosted.ticket.session_id);

        let view = hosted
            .engine
            .player_session_data(joined.session_id, joined.participant_id)
            .unwrap();
        assert_eq!(view.participant.name, "Ada");
        assert_eq!(view.participant.score, 0);

        assert_eq!(
            hosted.engine.join_session(hosted.ticket.join_code.as_str(), "ada"),
            Err(Error::InvalidName(names::Error::Used))
        );
        assert_eq!(
            hosted.engine.join_session(hosted.ticket.join_code.as_str(), "   "),
            Err(Error::InvalidName(names::Error::Empty))
        );
        assert_eq!(
            hosted.engine.join_session("bad!", "Bob"),
            Err(Error::SessionNotFound)
        );
    }

    #[test]
    fn test_join_active_session_is_rejected() {
        let hosted = hosted(2);
        hosted.join("Ada");
        hosted.start();

        assert_eq!(
            hosted
                .engine
                .join_session(hosted.ticket.join_code.as_str(), "Late"),
            Err(Error::NotAcceptingPlayers)
        );
        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.participants.len(), 1);
    }

    #[test]
    fn test_join_full_session_is_rejected() {
        let config = EngineConfig {
            max_participants: 2,
            ..EngineConfig::default()
        };
        let hosted = Hosted::new(Engine::new(config).unwrap(), 1);
        hosted.join("Ada");
        hosted.join("Bob");

        assert_eq!(
            hosted
                .engine
                .join_session(hosted.ticket.join_code.as_str(), "Cy"),
            Err(Error::NotAcceptingPlayers)
        );
    }

    #[test]
    fn test_host_commands_require_token() {
        let hosted = hosted(2);
        let session_id = hosted.ticket.session_id;
        let forged = HostToken::issue();

        assert_eq!(
            hosted.engine.start_quiz(session_id, &forged),
            Err(Error::Unauthorized)
        );
        hosted.start();
        assert_eq!(
            hosted.engine.show_leaderboard(session_id, &forged),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            hosted.engine.next_question(session_id, &forged),
            Err(Error::Unauthorized)
        );

        let host = hosted.engine.host_session_data(session_id).unwrap();
        assert_eq!(host.session.current_question_index(), 0);
        assert!(!host.session.show_leaderboard());
    }

    #[test]
    fn test_host_commands_on_missing_session() {
        let engine = Engine::default();
        let token = HostToken::issue();

        assert_eq!(
            engine.start_quiz(SessionId::new(), &token),
            Err(Error::SessionNotFound)
        );
        assert_eq!(
            engine.show_leaderboard(SessionId::new(), &token),
            Err(Error::SessionNotFound)
        );
        assert_eq!(
            engine.next_question(SessionId::new(), &token),
            Ok(Advance::Ignored)
        );
    }

    #[test]
    fn test_start_is_idempotent() {
        let hosted = hosted(2);
        hosted.start();
        hosted.start();

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.session.status(), Status::Active);
        assert_eq!(host.session.current_question_index(), 0);
    }

    #[test]
    fn test_reveal_and_advance_need_active_session() {
        let hosted = hosted(1);
        let waiting = Err(Error::InvalidTransition {
            status: Status::Waiting,
        });

        assert_eq!(
            hosted
                .engine
                .show_leaderboard(hosted.ticket.session_id, &hosted.ticket.host_token),
            waiting
        );
        assert_eq!(hosted.advance(), waiting.map(|()| Advance::Ignored));
    }

    #[test]
    fn test_correct_answer_at_six_seconds_scores_900() {
        let hosted = hosted(1);
        let ada = hosted.join("Ada");
        hosted.start();

        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 6.),
            Ok(Submission::Recorded {
                correct: true,
                score: 900
            })
        );
        assert_eq!(hosted.score_of(ada), 900);
    }

    #[test]
    fn test_duplicate_submission_changes_nothing() {
        let hosted = hosted(1);
        let ada = hosted.join("Ada");
        hosted.start();

        hosted.submit(ada, 0, OptionLabel::B, 6.).unwrap();
        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 0.),
            Ok(Submission::Duplicate)
        );
        assert_eq!(hosted.score_of(ada), 900);

        // still a quiet no-op once answers have closed
        hosted.reveal();
        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::A, 0.),
            Ok(Submission::Duplicate)
        );

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.answered_count, 1);
        assert_eq!(host.vote_stats.unwrap().total(), 1);
    }

    #[test]
    fn test_submission_failures() {
        let hosted = hosted(2);
        let ada = hosted.join("Ada");

        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 1.),
            Err(Error::AnswersClosed)
        );

        hosted.start();
        assert_eq!(
            hosted.submit(ada, 1, OptionLabel::B, 1.),
            Err(Error::AnswersClosed)
        );
        assert_eq!(
            hosted.submit(ParticipantId::new(), 0, OptionLabel::B, 1.),
            Err(Error::ParticipantNotFound)
        );

        let mut foreign = hosted.submission(ada, 0, OptionLabel::B, 1.);
        foreign.question_id = QuestionId::new();
        assert_eq!(
            hosted.engine.submit_answer(&foreign),
            Err(Error::QuestionNotFound)
        );

        let mut lost = hosted.submission(ada, 0, OptionLabel::B, 1.);
        lost.session_id = SessionId::new();
        assert_eq!(
            hosted.engine.submit_answer(&lost),
            Err(Error::SessionNotFound)
        );

        hosted.reveal();
        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 1.),
            Err(Error::AnswersClosed)
        );
        assert_eq!(hosted.score_of(ada), 0);
    }

    #[test]
    fn test_advance_from_last_question_finishes() {
        let hosted = hosted(3);
        hosted.join("Ada");
        hosted.start();

        assert_eq!(hosted.advance(), Ok(Advance::Question(1)));
        assert_eq!(hosted.advance(), Ok(Advance::Question(2)));
        hosted.reveal();
        assert_eq!(hosted.advance(), Ok(Advance::Finished));

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.session.status(), Status::Finished);
        assert_eq!(host.session.current_question_index(), 2);

        assert_eq!(
            hosted.advance(),
            Err(Error::InvalidTransition {
                status: Status::Finished
            })
        );
        assert_eq!(
            hosted
                .engine
                .start_quiz(hosted.ticket.session_id, &hosted.ticket.host_token),
            Err(Error::InvalidTransition {
                status: Status::Finished
            })
        );
    }

    #[test]
    fn test_full_game_leaderboard() {
        let hosted = hosted(2);
        let ada = hosted.join("Ada");
        let bob = hosted.join("Bob");
        let cy = hosted.join("Cy");
        hosted.start();

        hosted.submit(ada, 0, OptionLabel::B, 30.).unwrap();
        hosted.submit(bob, 0, OptionLabel::B, 0.).unwrap();
        hosted.submit(cy, 0, OptionLabel::A, 0.).unwrap();
        hosted.reveal();

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        let stats = host.vote_stats.unwrap();
        assert_eq!(stats.count(OptionLabel::A), 1);
        assert_eq!(stats.count(OptionLabel::B), 2);
        assert_eq!(stats.count(OptionLabel::C), 0);
        assert_eq!(
            host.participants
                .iter()
                .map(|s| (s.name.as_str(), s.score))
                .collect_vec(),
            vec![("Bob", 1000), ("Ada", 500), ("Cy", 0)]
        );

        hosted.advance().unwrap();
        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert!(host.vote_stats.is_none());
        assert_eq!(host.answered_count, 0);

        hosted.submit(cy, 1, OptionLabel::B, 0.).unwrap();
        hosted.submit(ada, 1, OptionLabel::B, 0.).unwrap();

        let view = hosted
            .engine
            .player_session_data(hosted.ticket.session_id, ada)
            .unwrap();
        assert!(view.has_answered);
        assert!(view.own_answer.is_none());
        assert_eq!(
            view.current_question.unwrap().correct_answer,
            PossiblyHidden::Hidden
        );
        // players rank on revealed points only
        assert_eq!(
            view.participants.iter().map(|s| s.name.as_str()).collect_vec(),
            vec!["Bob", "Ada", "Cy"]
        );

        // ties keep join order
        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(
            host.participants
                .iter()
                .map(|s| (s.name.as_str(), s.score))
                .collect_vec(),
            vec![("Ada", 1500), ("Bob", 1000), ("Cy", 1000)]
        );
    }

    #[test]
    fn test_player_view_requires_membership() {
        let hosted = hosted(1);
        hosted.join("Ada");
        let other = Hosted::new(Engine::default(), 1);
        let stranger = other.join("Eve");

        assert!(
            hosted
                .engine
                .player_session_data(hosted.ticket.session_id, stranger)
                .is_none()
        );
        assert!(
            hosted
                .engine
                .player_session_data(SessionId::new(), stranger)
                .is_none()
        );
        assert!(hosted.engine.host_session_data(SessionId::new()).is_none());
    }

    #[test]
    fn test_concurrent_duplicate_submissions_record_once() {
        let hosted = hosted(1);
        let ada = hosted.join("Ada");
        hosted.start();

        let hosted = &hosted;
        let outcomes = thread::scope(|scope| {
            let handles = (0..16_u32)
                .map(|i| scope.spawn(move || hosted.submit(ada, 0, OptionLabel::B, f64::from(i))))
                .collect_vec();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect_vec()
        });

        let recorded = outcomes
            .iter()
            .filter(|o| matches!(o, Submission::Recorded { .. }))
            .count();
        assert_eq!(recorded, 1);

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.answered_count, 1);
        assert!((500..=1000).contains(&hosted.score_of(ada)));
    }

    #[test]
    fn test_concurrent_players_all_scored() {
        let hosted = hosted(1);
        let players = (0..20)
            .map(|i| hosted.join(&format!("Player {i}")))
            .collect_vec();
        hosted.start();

        thread::scope(|scope| {
            for &player in &players {
                let hosted = &hosted;
                scope.spawn(move || hosted.submit(player, 0, OptionLabel::B, 0.).unwrap());
            }
        });

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.answered_count, 20);
        assert!(host.participants.iter().all(|s| s.score == 1000));
    }

    #[test]
    fn test_server_measured_timing() {
        let start = SystemTime::now();
        let time = Arc::new(Mutex::new(start));
        let config = EngineConfig {
            timing: TimingPolicy::ServerMeasured,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config)
            .unwrap()
            .with_clock(ManualClock(Arc::clone(&time)));
        let hosted = Hosted::new(engine, 1);
        let ada = hosted.join("Ada");
        hosted.start();

        *time.lock().unwrap() = start + Duration::from_secs(6);
        // the reported time is ignored
        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 0.),
            Ok(Submission::Recorded {
                correct: true,
                score: 900
            })
        );

        let host = hosted.engine.host_session_data(hosted.ticket.session_id).unwrap();
        assert_eq!(host.session.question_started_at(), Some(start));
        assert_eq!(
            host.session.question_ends_at(),
            Some(start + Duration::from_secs(30))
        );
    }

    #[test]
    fn test_time_limit_drives_score() {
        let engine = Engine::default();
        let mut draft = quiz_draft(0);
        draft.questions.push(question_draft(OptionLabel::A, 8));
        let quiz_id = engine.create_quiz(CREATOR, draft).unwrap();
        let ticket = engine.create_session(quiz_id, CREATOR).unwrap();
        let ada = engine
            .join_session(ticket.join_code.as_str(), "Ada")
            .unwrap()
            .participant_id;
        engine.start_quiz(ticket.session_id, &ticket.host_token).unwrap();
        let question_id = engine.quiz_details(quiz_id).unwrap().questions[0].id;

        let outcome = engine
            .submit_answer(&AnswerSubmission {
                participant_id: ada,
                question_id,
                session_id: ticket.session_id,
                answer: OptionLabel::A,
                time_taken: 3.,
            })
            .unwrap();
        assert_eq!(
            outcome,
            Submission::Recorded {
                correct: true,
                score: 813
            }
        );
    }

    #[test]
    fn test_tunnels_receive_events() {
        let hosted = hosted(1);
        let tunnel = Arc::new(RecordingTunnel::default());
        hosted
            .engine
            .attach_tunnel(hosted.ticket.session_id, tunnel.clone())
            .unwrap();

        let ada = hosted.join("Ada");
        hosted.start();
        hosted.start();
        hosted.submit(ada, 0, OptionLabel::B, 1.).unwrap();
        hosted.submit(ada, 0, OptionLabel::B, 1.).unwrap();
        hosted.reveal();
        hosted.advance().unwrap();

        let session = hosted.ticket.session_id;
        let events = tunnel.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                SessionEvent::PlayerJoined {
                    session,
                    participant: ada,
                    name: "Ada".to_string(),
                },
                SessionEvent::Started { session },
                SessionEvent::AnswerRecorded {
                    session,
                    question: hosted.quiz.questions[0].id,
                    answered_count: 1,
                },
                SessionEvent::LeaderboardShown {
                    session,
                    question_index: 0,
                },
                SessionEvent::Finished { session },
            ]
        );
        assert!(events.iter().all(|e| e.session() == session));
        assert!(tunnel.is_closed());
        assert!(hosted.engine.tunnels.is_empty());
    }

    #[test]
    fn test_tunnels_are_per_session() {
        let first = hosted(1);
        let second_quiz = first.engine.create_quiz(CREATOR, quiz_draft(1)).unwrap();
        let second = first.engine.create_session(second_quiz, CREATOR).unwrap();
        let tunnel = Arc::new(RecordingTunnel::default());
        first
            .engine
            .attach_tunnel(second.session_id, tunnel.clone())
            .unwrap();

        first.join("Ada");
        first.start();

        assert!(tunnel.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_attach_needs_open_session() {
        let hosted = hosted(1);
        let tunnel: Arc<dyn Tunnel> = Arc::new(RecordingTunnel::default());

        assert_eq!(
            hosted.engine.attach_tunnel(SessionId::new(), Arc::clone(&tunnel)),
            Err(Error::SessionNotFound)
        );
        assert!(hosted.engine.tunnels.is_empty());

        hosted.start();
        hosted.reveal();
        hosted.advance().unwrap();
        assert_eq!(
            hosted
                .engine
                .attach_tunnel(hosted.ticket.session_id, tunnel),
            Err(Error::InvalidTransition {
                status: Status::Finished
            })
        );
        assert!(hosted.engine.tunnels.is_empty());
    }

    #[test]
    fn test_detached_tunnels_are_dropped() {
        let hosted = hosted(1);
        let session = hosted.ticket.session_id;
        let first = Arc::new(RecordingTunnel::default());
        let second = Arc::new(RecordingTunnel::default());
        let first_dyn: Arc<dyn Tunnel> = first.clone();
        let second_dyn: Arc<dyn Tunnel> = second.clone();
        hosted
            .engine
            .attach_tunnel(session, Arc::clone(&first_dyn))
            .unwrap();
        hosted
            .engine
            .attach_tunnel(session, Arc::clone(&second_dyn))
            .unwrap();

        assert!(hosted.engine.detach_tunnel(session, &first_dyn));
        assert!(!hosted.engine.detach_tunnel(session, &first_dyn));
        assert_eq!(hosted.engine.tunnels.get(&session).unwrap().len(), 1);

        hosted.join("Ada");
        assert!(first.events.lock().unwrap().is_empty());
        assert_eq!(second.events.lock().unwrap().len(), 1);

        assert!(hosted.engine.detach_tunnel(session, &second_dyn));
        assert!(hosted.engine.tunnels.is_empty());
        assert!(!hosted.engine.detach_tunnel(session, &second_dyn));
        assert!(!first.is_closed());
    }

    #[test]
    fn test_out_of_range_config_is_rejected() {
        let no_attempts = EngineConfig {
            code_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(no_attempts),
            Err(ConfigError::Invalid(_))
        ));

        let no_room = EngineConfig {
            max_participants: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::with_store(no_room, MemoryStore::new()),
            Err(ConfigError::Invalid(_))
        ));

        let snug = EngineConfig {
            max_participants: 1,
            ..EngineConfig::default()
        };
        assert_eq!(Engine::new(snug.clone()).unwrap().config(), &snug);
    }

    #[test]
    fn test_server_measured_past_limit_scores_minimum() {
        let start = SystemTime::now();
        let time = Arc::new(Mutex::new(start));
        let config = EngineConfig {
            timing: TimingPolicy::ServerMeasured,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config)
            .unwrap()
            .with_clock(ManualClock(Arc::clone(&time)));
        let hosted = Hosted::new(engine, 1);
        let ada = hosted.join("Ada");
        hosted.start();

        *time.lock().unwrap() = start + Duration::from_secs(45);
        assert_eq!(
            hosted.submit(ada, 0, OptionLabel::B, 1.),
            Ok(Submission::Recorded {
                correct: true,
                score: 500
            })
        );

        hosted.reveal();
        let view = hosted
            .engine
            .player_session_data(hosted.ticket.session_id, ada)
            .unwrap();
        let answer = view.own_answer.unwrap();
        assert!((answer.time_taken - 30.).abs() < f64::EPSILON);
        assert_eq!(view.participant.score, 500);
    }
}
