//! Request handlers, grouped by resource.
//!
//! Handlers stay thin: extract, validate input, consult the authorization policy, delegate to
//! the repository or the comment tree manager, and wrap the result in an `ApiResponse`.
//! Every failure is an `AppError`, which renders the `{status, error}` envelope.

pub mod admin;
pub mod comments;
pub mod posts;
pub mod taxonomy;
pub mod users;

use crate::error::{AppError, Result};

/// Trims a required text field, rejecting it when blank.
pub(crate) fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(message));
    }
    Ok(trimmed.to_string())
}
