//! Configuration constants for the live session engine
//!
//! This module contains the limits and fixed parameters used throughout the
//! engine: join code shape, scoring bounds, and the validation boundaries
//! applied to quizzes, questions and display names.

/// Join code configuration constants
pub mod join_code {
    /// Number of characters in a join code
    pub const LENGTH: usize = 6;
    /// Symbols a join code is drawn from (no `I`, `O`, `0` or `1`)
    pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    /// Candidates tried before giving up on allocation
    pub const MAX_ATTEMPTS: usize = 10;
}

/// Scoring constants
pub mod scoring {
    /// Points for a correct answer submitted instantly
    pub const MAX_POINTS: u64 = 1000;
    /// Points lost by a correct answer submitted at the time limit
    pub const MAX_TIME_PENALTY: u64 = 500;
    /// Points for a correct answer submitted at (or after) the time limit
    pub const MIN_CORRECT_POINTS: u64 = MAX_POINTS - MAX_TIME_PENALTY;
}

/// Quiz configuration constants
pub mod quiz {
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of a quiz description in characters
    pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
    /// Maximum number of questions in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum number of participants allowed in a single session
    pub const MAX_PLAYER_COUNT: usize = 1000;
}

/// Question configuration constants
pub mod question {
    /// Minimum length of a question prompt
    pub const MIN_PROMPT_LENGTH: usize = 1;
    /// Maximum length of a question prompt
    pub const MAX_PROMPT_LENGTH: usize = 200;
    /// Maximum length of an answer option text
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Maximum length of an image reference
    pub const MAX_IMAGE_LENGTH: usize = 2048;
    /// Minimum time limit in seconds for answering a question
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum time limit in seconds for answering a question
    pub const MAX_TIME_LIMIT: u64 = 240;
}

/// Display name configuration constants
pub mod names {
    /// Maximum length of a display name in bytes
    pub const MAX_LENGTH: usize = 30;
}
