//! Quizzes, questions and answer options
//!
//! A quiz is authored once and never mutated afterwards. Authors submit a
//! [`QuizDraft`], which is validated with `garde` and turned into an immutable
//! [`Quiz`] whose questions carry dense, zero-based order indices.

use std::{str::FromStr, time::Duration};

use enum_map::{Enum, EnumMap};
use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    constants,
    error::Error,
    ids::{QuestionId, QuizId},
};

/// Label of an answer option
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum OptionLabel {
    /// First option, always present
    A,
    /// Second option, always present
    B,
    /// Third option, optional
    C,
    /// Fourth option, optional
    D,
}

impl FromStr for OptionLabel {
    type Err = Error;

    /// Parses a single option letter, ignoring case and surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOption` for anything other than `A` to `D`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(Error::InvalidOption(s.to_owned())),
        }
    }
}

type ValidationResult = garde::Result;

/// Validates that a duration falls within specified bounds.
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the specified bounds.
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) && !val.is_zero() {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates the time limit for answering a question
fn validate_time_limit(val: &Duration, ctx: &()) -> ValidationResult {
    validate_duration::<
        { constants::question::MIN_TIME_LIMIT },
        { constants::question::MAX_TIME_LIMIT },
    >(val, ctx)
}

/// Author-supplied definition of a single question
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionDraft {
    /// The prompt shown to players
    #[garde(length(min = constants::question::MIN_PROMPT_LENGTH, max = constants::question::MAX_PROMPT_LENGTH))]
    pub prompt: String,
    /// Optional image reference displayed with the prompt
    #[garde(length(max = constants::question::MAX_IMAGE_LENGTH))]
    pub image: Option<String>,
    /// Text of option A
    #[garde(length(min = 1, max = constants::question::MAX_OPTION_LENGTH))]
    pub option_a: String,
    /// Text of option B
    #[garde(length(min = 1, max = constants::question::MAX_OPTION_LENGTH))]
    pub option_b: String,
    /// Text of option C, blank means absent
    #[garde(length(max = constants::question::MAX_OPTION_LENGTH))]
    pub option_c: Option<String>,
    /// Text of option D, blank means absent
    #[garde(length(max = constants::question::MAX_OPTION_LENGTH))]
    pub option_d: Option<String>,
    /// The label of the correct option
    #[garde(skip)]
    pub correct_answer: OptionLabel,
    /// Time players have to answer
    #[garde(custom(validate_time_limit))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_limit: Duration,
}

/// Author-supplied definition of a whole quiz
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizDraft {
    /// The quiz title
    #[garde(length(min = 1, max = constants::quiz::MAX_TITLE_LENGTH))]
    pub title: String,
    /// Optional longer description
    #[garde(length(max = constants::quiz::MAX_DESCRIPTION_LENGTH))]
    pub description: Option<String>,
    /// Questions in play order
    #[garde(length(min = 1, max = constants::quiz::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<QuestionDraft>,
}

/// A question as stored and played
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier of the question
    pub id: QuestionId,
    /// The quiz this question belongs to
    pub quiz_id: QuizId,
    /// The prompt shown to players
    pub prompt: String,
    /// Optional image reference
    pub image: Option<String>,
    /// Option texts; A and B are always present
    pub options: EnumMap<OptionLabel, Option<String>>,
    /// The label of the correct option
    pub correct_answer: OptionLabel,
    /// Time players have to answer
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_limit: Duration,
    /// Zero-based position within the quiz
    pub order: usize,
}

impl Question {
    /// Iterates over the options this question defines, in label order
    pub fn defined_options(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        self.options
            .iter()
            .filter_map(|(label, text)| Some((label, text.as_deref()?)))
    }
}

/// An immutable quiz with its ordered questions
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique identifier of the quiz
    pub id: QuizId,
    /// Identity of the author, the only one allowed to host it
    pub creator_id: String,
    /// The quiz title
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Questions ordered by their `order` index
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Returns the number of questions in this quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks if this quiz contains any questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at a zero-based position
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Finds a question of this quiz by id
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

fn present(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

impl QuestionDraft {
    fn into_question(self, quiz_id: QuizId, order: usize) -> Result<Question, Error> {
        let mut options = EnumMap::default();
        options[OptionLabel::A] = Some(self.option_a);
        options[OptionLabel::B] = Some(self.option_b);
        options[OptionLabel::C] = present(self.option_c);
        options[OptionLabel::D] = present(self.option_d);

        if options[self.correct_answer].is_none() {
            return Err(Error::InvalidQuiz(format!(
                "question {order}: correct answer {} is not an option",
                self.correct_answer
            )));
        }

        Ok(Question {
            id: QuestionId::new(),
            quiz_id,
            prompt: self.prompt,
            image: present(self.image),
            options,
            correct_answer: self.correct_answer,
            time_limit: self.time_limit,
            order,
        })
    }
}

impl QuizDraft {
    /// Validates the draft and assigns identifiers and order indices
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuiz` if any field fails validation or a
    /// question's correct answer names an option it does not define.
    pub fn into_quiz(self, creator_id: &str) -> Result<Quiz, Error> {
        self.validate()
            .map_err(|report| Error::InvalidQuiz(report.to_string()))?;

        let id = QuizId::new();
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(order, draft)| draft.into_question(id, order))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Quiz {
            id,
            creator_id: creator_id.to_owned(),
            title: self.title,
            description: present(self.description),
            questions,
        })
    }
}
