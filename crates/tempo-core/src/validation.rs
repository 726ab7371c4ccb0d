//! Input validation for entity fields.

use crate::errors::CoreError;

/// Maximum title length for epics and stories, in characters.
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum username length, in characters.
pub const MAX_USERNAME_LEN: usize = 150;

/// Validate an epic or story title: non-blank and at most [`MAX_TITLE_LEN`] chars.
///
/// # Errors
///
/// Returns `CoreError::Validation` naming the entity kind.
pub fn validate_title(kind: &str, title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(format!("{kind} title must not be empty")));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "{kind} title is {len} characters long, the limit is {MAX_TITLE_LEN}"
        )));
    }
    Ok(())
}

/// Validate a username: non-empty, no whitespace, at most [`MAX_USERNAME_LEN`] chars.
///
/// # Errors
///
/// Returns `CoreError::Validation` describing the problem.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() {
        return Err(CoreError::Validation("username must not be empty".into()));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(format!(
            "username '{username}' must not contain whitespace"
        )));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "username is longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}
