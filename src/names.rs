//! Display name validation
//!
//! Players pick their own display name when joining. Names are trimmed,
//! length-limited, filtered for inappropriate content and must be unique
//! within the session, ignoring case.

use rustrict::CensorStr;
use serde::Serialize;
use thiserror::Error;

use crate::constants::names::MAX_LENGTH;

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another player
    #[error("name already in-use")]
    Used,
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Validates a requested display name against the names already taken
///
/// # Returns
///
/// The cleaned name on success.
///
/// # Errors
///
/// * `Error::TooLong` - Name exceeds 30 bytes
/// * `Error::Empty` - Name is empty after trimming whitespace
/// * `Error::Sinful` - Name contains inappropriate content
/// * `Error::Used` - Name is already taken by another player
pub fn validate<'a, I>(name: &str, taken: I) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    if name.len() > MAX_LENGTH {
        return Err(Error::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    let lowered = name.to_lowercase();
    if taken.into_iter().any(|other| other.to_lowercase() == lowered) {
        return Err(Error::Used);
    }
    Ok(name.to_owned())
}
