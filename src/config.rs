//! Engine configuration
//!
//! Runtime knobs that an embedding application may tune. Every field has a
//! default, so an empty JSON object is a valid configuration. Compile-time
//! limits that never change at runtime live in [`crate::constants`].

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::constants;

/// Where the elapsed time used for scoring comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingPolicy {
    /// Trust the `time_taken` reported with each submission
    #[default]
    ClientReported,
    /// Measure from when the server started the current question
    ServerMeasured,
}

/// Tunable behaviour of an [`Engine`](crate::engine::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// How answer time is determined
    #[garde(skip)]
    pub timing: TimingPolicy,
    /// Maximum number of participants per session
    #[garde(range(min = 1, max = constants::quiz::MAX_PLAYER_COUNT))]
    pub max_participants: usize,
    /// How many join code candidates to try before giving up
    #[garde(range(min = 1, max = 100))]
    pub code_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timing: TimingPolicy::default(),
            max_participants: constants::quiz::MAX_PLAYER_COUNT,
            code_attempts: constants::join_code::MAX_ATTEMPTS,
        }
    }
}

/// Reasons a configuration could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for this configuration
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(#[from] garde::Report),
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON or unknown enum values,
    /// and `ConfigError::Invalid` if a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        info!(
            timing = ?config.timing,
            max_participants = config.max_participants,
            code_attempts = config.code_attempts,
            "loaded engine config"
        );
        Ok(config)
    }
}
