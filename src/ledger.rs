//! Answer ledger
//!
//! The ledger keeps at most one answer per participant and question. The
//! first submission wins: later submissions for the same pair are dropped
//! without touching the stored answer or the participant's score. Recording
//! an answer and crediting its points happen in the same call, which the
//! store runs inside the session's transaction.

use std::collections::HashMap;

use indexmap::{IndexMap, map::Entry};
use serde::Serialize;

use crate::{
    ids::{ParticipantId, QuestionId},
    quiz::{OptionLabel, Question},
    scoring,
    session::Participant,
};

/// A participant's recorded response to one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Who answered
    pub participant_id: ParticipantId,
    /// Which question was answered
    pub question_id: QuestionId,
    /// The option picked
    pub answer: OptionLabel,
    /// Whether the option was the correct one
    pub correct: bool,
    /// Points awarded
    pub score: u64,
    /// Seconds taken to answer, clamped to the time limit as used for scoring
    pub time_taken: f64,
}

/// Result of submitting an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Submission {
    /// The answer was stored and its points credited
    Recorded {
        /// Whether the answer was correct
        correct: bool,
        /// Points awarded
        score: u64,
    },
    /// The participant had already answered; nothing changed
    Duplicate,
}

/// All answers given within one session
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// Answers per question, in submission order
    by_question: HashMap<QuestionId, IndexMap<ParticipantId, Answer>>,
}

impl Ledger {
    /// Looks up the answer a participant gave to a question
    pub fn get(&self, participant: ParticipantId, question: QuestionId) -> Option<&Answer> {
        self.by_question.get(&question)?.get(&participant)
    }

    /// Whether the participant has answered the question
    pub fn has_answered(&self, participant: ParticipantId, question: QuestionId) -> bool {
        self.get(participant, question).is_some()
    }

    /// Iterates over every answer to a question, in submission order
    pub fn answers_for(&self, question: QuestionId) -> impl Iterator<Item = &Answer> {
        self.by_question
            .get(&question)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    /// Number of participants who answered a question
    pub fn answered_count(&self, question: QuestionId) -> usize {
        self.by_question.get(&question).map_or(0, IndexMap::len)
    }

    /// Total number of answers across all questions
    pub fn len(&self) -> usize {
        self.by_question.values().map(IndexMap::len).sum()
    }

    /// Whether no answer has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a participant's first answer to a question and credits its points
    ///
    /// A repeated submission for the same participant and question returns
    /// `Submission::Duplicate` and changes nothing.
    pub fn record(
        &mut self,
        participant: &mut Participant,
        question: &Question,
        answer: OptionLabel,
        time_taken: f64,
    ) -> Submission {
        let slot = match self
            .by_question
            .entry(question.id)
            .or_default()
            .entry(participant.id)
        {
            Entry::Occupied(_) => return Submission::Duplicate,
            Entry::Vacant(slot) => slot,
        };

        let scored = scoring::score(
            question.time_limit,
            question.correct_answer,
            answer,
            time_taken,
        );

        slot.insert(Answer {
            participant_id: participant.id,
            question_id: question.id,
            answer,
            correct: scored.correct,
            score: scored.points,
            time_taken: scoring::effective_time(question.time_limit, time_taken),
        });
        participant.score += scored.points;

        Submission::Recorded {
            correct: scored.correct,
            score: scored.points,
        }
    }
}
