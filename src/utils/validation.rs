//! Input validation utilities

use validator::ValidationError;

/// Maximum length of an opaque platform identifier
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate an opaque platform identifier (tenant, actor, channel, role)
pub fn validate_identifier(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_IDENTIFIER_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Validate a bridge event name (lowercase snake case)
pub fn validate_event_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 64 {
        return false;
    }

    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// `validator` hook for identifier fields
pub fn check_identifier(id: &str) -> Result<(), ValidationError> {
    if validate_identifier(id) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_identifier"))
    }
}
