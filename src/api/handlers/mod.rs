//! Route handlers and the input checks they share.
//!
//! Handlers validate every identifier-shaped input before touching the store,
//! so a malformed id never costs a round trip.

pub mod comments;
pub mod health;
pub mod login;
pub mod posts;
pub mod users;

use super::error::ApiError;
use crate::model::{ObjectId, INVALID_OBJECT_ID};
use regex::Regex;

pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Normalize an email for lookup and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Parse a 24-hex-digit object id or fail with `400 Invalid ObjectId value.`
pub(crate) fn parse_object_id(value: &str) -> Result<ObjectId, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::Validation(INVALID_OBJECT_ID.to_string()))
}

/// Empty strings in request bodies count as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email(""));
    }

    #[test]
    fn parse_object_id_reports_invalid_ids() {
        assert!(parse_object_id("5a266bd64765b940ec7e8765").is_ok());
        let err = parse_object_id("123");
        assert!(matches!(err, Err(ApiError::Validation(m)) if m == INVALID_OBJECT_ID));
    }

    #[test]
    fn non_empty_drops_empty_strings() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
