//! Read models for hosts and players
//!
//! Views are snapshots assembled from one consistent read of a session
//! aggregate. Standings and vote counts are recomputed on every build. The
//! player view never carries the host capability and keeps the correct answer
//! hidden until results are revealed. Points earned on the live question stay
//! out of the player's standings until then too, so a jump in someone's score
//! does not give away whether they were right.

use std::time::Duration;

use enum_map::EnumMap;
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::{
    ids::{ParticipantId, QuestionId},
    leaderboard::{self, Standing, VoteStats},
    ledger::Answer,
    quiz::{OptionLabel, Question, Quiz},
    session::{Participant, Session, Status},
    store::SessionRecord,
};

/// Utility type for conditionally hiding content based on viewer permissions
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum PossiblyHidden<T> {
    /// Content is visible to the recipient
    Visible(T),
    /// Content is hidden from the recipient
    Hidden,
}

/// A question as shown to players
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerQuestion {
    /// Unique identifier of the question
    pub id: QuestionId,
    /// The prompt
    pub prompt: String,
    /// Optional image reference
    pub image: Option<String>,
    /// Option texts; undefined options are `None`
    pub options: EnumMap<OptionLabel, Option<String>>,
    /// The correct option, once revealed
    pub correct_answer: PossiblyHidden<OptionLabel>,
    /// Time players have to answer
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_limit: Duration,
    /// Zero-based position within the quiz
    pub order: usize,
}

impl PlayerQuestion {
    fn new(question: &Question, revealed: bool) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            image: question.image.clone(),
            options: question.options.clone(),
            correct_answer: if revealed {
                PossiblyHidden::Visible(question.correct_answer)
            } else {
                PossiblyHidden::Hidden
            },
            time_limit: question.time_limit,
            order: question.order,
        }
    }
}

/// Everything the host screen needs
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct HostView {
    /// The session
    pub session: Session,
    /// The quiz with all its questions
    pub quiz: Quiz,
    /// Participants ranked by score
    pub participants: Vec<Standing>,
    /// The question at the current index
    pub current_question: Option<Question>,
    /// Votes on the current question, present while results are shown
    pub vote_stats: Option<VoteStats>,
    /// How many participants answered the current question
    pub answered_count: usize,
}

/// Everything a player screen needs
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    /// The session, without its host capability
    pub session: Session,
    /// The viewing participant, scored as of the last reveal
    pub participant: Participant,
    /// Participants ranked by their score as of the last reveal
    pub participants: Vec<Standing>,
    /// The current question, correct answer hidden until revealed
    pub current_question: Option<PlayerQuestion>,
    /// Votes on the current question, present while results are shown
    pub vote_stats: Option<VoteStats>,
    /// Whether the viewer answered the current question
    pub has_answered: bool,
    /// The viewer's answer to the current question, once revealed
    pub own_answer: Option<Answer>,
}

fn revealed(session: &Session) -> bool {
    session.show_leaderboard() || session.status() == Status::Finished
}

fn vote_stats(record: &SessionRecord, question: Option<&Question>) -> Option<VoteStats> {
    if !record.session.show_leaderboard() {
        return None;
    }
    let question = question?;
    Some(VoteStats::tally(record.ledger.answers_for(question.id)))
}

/// Participants with any points from the unrevealed live question taken out
fn settled_participants(
    record: &SessionRecord,
    question: Option<&Question>,
    revealed: bool,
) -> Vec<Participant> {
    let live = question.filter(|_| !revealed);
    record
        .participants
        .values()
        .map(|p| {
            let pending = live
                .and_then(|q| record.ledger.get(p.id, q.id))
                .map_or(0, |answer| answer.score);
            Participant {
                score: p.score.saturating_sub(pending),
                ..p.clone()
            }
        })
        .collect()
}

/// Builds the host view of a session
pub fn host_view(record: &SessionRecord, quiz: &Quiz) -> HostView {
    let current = quiz.question_at(record.session.current_question_index());

    HostView {
        session: record.session.clone(),
        quiz: quiz.clone(),
        participants: leaderboard::rank(record.participants.values()),
        current_question: current.cloned(),
        vote_stats: vote_stats(record, current),
        answered_count: current.map_or(0, |q| record.ledger.answered_count(q.id)),
    }
}

/// Builds the view of a session for one of its participants
///
/// Returns `None` if the participant does not belong to the session.
pub fn player_view(
    record: &SessionRecord,
    quiz: &Quiz,
    participant: ParticipantId,
) -> Option<PlayerView> {
    let current = quiz.question_at(record.session.current_question_index());
    let revealed = revealed(&record.session);
    let settled = settled_participants(record, current, revealed);
    let viewer = settled.iter().find(|p| p.id == participant)?.clone();
    let own_answer = current.and_then(|q| record.ledger.get(participant, q.id));

    Some(PlayerView {
        session: record.session.clone(),
        participant: viewer,
        participants: leaderboard::rank(&settled),
        current_question: current.map(|q| PlayerQuestion::new(q, revealed)),
        vote_stats: vote_stats(record, current),
        has_answered: own_answer.is_some(),
        own_answer: own_answer.filter(|_| revealed).cloned(),
    })
}
