//! Leaderboard and vote statistics
//!
//! Standings and vote counts are never stored. They are derived from the
//! participants and the answer ledger whenever a view is built, so they always
//! agree with the data they summarize.

use std::cmp::Reverse;

use enum_map::EnumMap;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    ids::ParticipantId,
    ledger::Answer,
    quiz::OptionLabel,
    session::Participant,
};

/// A participant's place on the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Place on the leaderboard (1-indexed)
    pub position: usize,
    /// The participant ranked
    pub participant_id: ParticipantId,
    /// The participant's display name
    pub name: String,
    /// Total points earned
    pub score: u64,
}

/// Ranks participants by score, highest first
///
/// Ties keep join order: whoever joined earlier is listed first.
///
/// # Examples
///
/// ```rust
/// use quizlive::ids::{ParticipantId, SessionId};
/// use quizlive::leaderboard::rank;
/// use quizlive::session::Participant;
///
/// let session_id = SessionId::new();
/// let players = [("Ada", 500), ("Bob", 900), ("Cy", 500)].map(|(name, score)| {
///     Participant { id: ParticipantId::new(), session_id, name: name.into(), score, joined: 0 }
/// });
/// let standings = rank(&players);
/// assert_eq!(standings[0].name, "Bob");
/// assert_eq!(standings[1].name, "Ada");
/// ```
pub fn rank<'a, I>(participants: I) -> Vec<Standing>
where
    I: IntoIterator<Item = &'a Participant>,
{
    participants
        .into_iter()
        .sorted_by_key(|p| (Reverse(p.score), p.joined))
        .enumerate()
        .map(|(index, p)| Standing {
            position: index + 1,
            participant_id: p.id,
            name: p.name.clone(),
            score: p.score,
        })
        .collect_vec()
}

/// Number of answers per option label for one question
///
/// Every label is present, including options the question does not define.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoteStats(EnumMap<OptionLabel, usize>);

impl VoteStats {
    /// Counts answers by the option they picked
    pub fn tally<'a, I>(answers: I) -> Self
    where
        I: IntoIterator<Item = &'a Answer>,
    {
        let mut counts = EnumMap::default();
        for answer in answers {
            counts[answer.answer] += 1;
        }
        Self(counts)
    }

    /// Votes for one option
    pub fn count(&self, label: OptionLabel) -> usize {
        self.0[label]
    }

    /// Total votes cast
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Iterates over every label with its vote count
    pub fn iter(&self) -> impl Iterator<Item = (OptionLabel, usize)> {
        self.0.iter().map(|(label, count)| (label, *count))
    }
}
