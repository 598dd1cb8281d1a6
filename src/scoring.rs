//! Time-decayed scoring
//!
//! A correct answer earns between 1000 points (answered instantly) and 500
//! points (answered at the time limit), decreasing linearly in between. An
//! incorrect answer earns nothing, so there is a jump from 0 to 500 at the
//! correctness boundary.
//!
//! Rounding is half away from zero (`f64::round`).

use std::time::Duration;

use serde::Serialize;

use crate::{
    constants::scoring::{MAX_POINTS, MAX_TIME_PENALTY, MIN_CORRECT_POINTS},
    quiz::OptionLabel,
};

/// Outcome of scoring one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scored {
    /// Whether the answer matched the correct option
    pub correct: bool,
    /// Points awarded
    pub points: u64,
}

/// Scores a submitted answer
///
/// `time_taken` is in seconds and is clamped into `[0, time_limit]` before
/// use. A non-finite `time_taken` counts as the full time limit.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use quizlive::quiz::OptionLabel;
/// use quizlive::scoring::score;
///
/// let scored = score(Duration::from_secs(30), OptionLabel::B, OptionLabel::B, 6.0);
/// assert!(scored.correct);
/// assert_eq!(scored.points, 900);
/// ```
pub fn score(
    time_limit: Duration,
    correct_answer: OptionLabel,
    answer: OptionLabel,
    time_taken: f64,
) -> Scored {
    let correct = answer == correct_answer;
    Scored {
        correct,
        points: if correct {
            time_decayed_points(time_limit, time_taken)
        } else {
            0
        },
    }
}

/// The answer time scoring actually uses, in seconds
///
/// Clamps `time_taken` into `[0, time_limit]`; a non-finite value counts as
/// the whole time limit.
pub fn effective_time(time_limit: Duration, time_taken: f64) -> f64 {
    let limit = time_limit.as_secs_f64();
    if time_taken.is_finite() {
        time_taken.clamp(0., limit)
    } else {
        limit
    }
}

/// Points for a correct answer given after `time_taken` seconds
pub fn time_decayed_points(time_limit: Duration, time_taken: f64) -> u64 {
    let limit = time_limit.as_secs_f64();
    if limit <= 0. {
        return MIN_CORRECT_POINTS;
    }

    let effective = effective_time(time_limit, time_taken);
    let penalty = (effective / limit) * MAX_TIME_PENALTY as f64;

    (MAX_POINTS as f64 - penalty).round() as u64
}
