//! Input validators used by clap's `value_parser`.

use crate::domain::{MAX_NOTE_LENGTH, MAX_TAG_LENGTH};
use crate::id_generation::validate_connection_id;

/// Longest accepted user or connection ID.
const MAX_ID_LENGTH: usize = 128;

/// Validate a user or connection ID: non-blank, no whitespace, bounded length.
pub fn validate_id(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("ID cannot be empty".to_string());
    }
    if trimmed.len() > MAX_ID_LENGTH {
        return Err(format!("ID cannot exceed {MAX_ID_LENGTH} characters"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err("ID cannot contain whitespace".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a connection ID argument (`conn-` followed by lowercase base36).
pub fn validate_connection(s: &str) -> Result<String, String> {
    let id = s.trim();
    if !validate_connection_id(id) {
        return Err(format!(
            "Invalid connection ID '{id}', expected something like conn-a1b2c3"
        ));
    }
    Ok(id.to_string())
}

/// Validate a request note.
pub fn validate_note(s: &str) -> Result<String, String> {
    bounded(s, "Note", MAX_NOTE_LENGTH)
}

/// Validate a relationship tag.
pub fn validate_tag(s: &str) -> Result<String, String> {
    bounded(s, "Relationship tag", MAX_TAG_LENGTH)
}

fn bounded(s: &str, field: &str, max: usize) -> Result<String, String> {
    if s.trim().chars().count() > max {
        return Err(format!("{field} cannot exceed {max} characters"));
    }
    Ok(s.to_string())
}
