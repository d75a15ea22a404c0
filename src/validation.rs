//! Input validation for identity ids and profile documents.
//!
//! Identity ids end up in two sensitive places: as the prefix of every scoped
//! key and as a profile filename. Scoped keys are built by plain
//! `"{id}_{key}"` concatenation, so an id containing `_` could alias another
//! identity's namespace; such ids are refused at login.

use crate::progress::errors::ProgressError;
use crate::progress::types::{DEFAULT_STUDENT_ID, DEFAULT_TEACHER_ID};

/// Longest identity id accepted.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Generate a filesystem-safe filename stem from an identity id using URL encoding.
pub fn safe_filename(identity_id: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(identity_id, NON_ALPHANUMERIC).to_string()
}

/// Validate an identity id supplied by a login flow. Returns the trimmed id.
pub fn validate_identity_id(id: &str) -> Result<String, ProgressError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ProgressError::InvalidIdentity("empty id".to_string()));
    }
    if trimmed.chars().count() > MAX_IDENTITY_LEN {
        return Err(ProgressError::InvalidIdentity(format!(
            "id longer than {} characters",
            MAX_IDENTITY_LEN
        )));
    }
    if trimmed.contains('_') {
        return Err(ProgressError::InvalidIdentity(
            "id may not contain '_'".to_string(),
        ));
    }
    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ProgressError::InvalidIdentity(
            "id may not contain whitespace or control characters".to_string(),
        ));
    }
    if trimmed == DEFAULT_STUDENT_ID || trimmed == DEFAULT_TEACHER_ID {
        return Err(ProgressError::InvalidIdentity(format!(
            "'{}' is reserved",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// Reject documents above `max_bytes` and strip leading NULs left behind by
/// interrupted writes before handing the text to a parser.
pub fn bounded_document(content: &str, max_bytes: usize) -> Result<&str, ProgressError> {
    if content.len() > max_bytes {
        return Err(ProgressError::Remote(format!(
            "profile document exceeds {} bytes",
            max_bytes
        )));
    }
    Ok(content.trim_start_matches('\0'))
}
