/// Input validators for registration and login fields
///
/// Mirrors the constraints enforced by the API contract:
/// - login: 4-20 characters, alphanumeric only
/// - email: RFC 5322 (simplified) format, bounded length

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_LOGIN_LENGTH: usize = 4;
const MAX_LOGIN_LENGTH: usize = 20;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    // Multiple @ symbols slip past some regex engines; reject outright
    if trimmed.matches('@').count() != 1 {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Validates a login handle
/// - 4 to 20 characters
/// - ASCII alphanumeric only
pub fn is_valid_login(login: &str) -> Result<String, ValidationError> {
    let trimmed = login.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("login".to_string()));
    }

    if trimmed.len() < MIN_LOGIN_LENGTH {
        return Err(ValidationError::TooShort("login".to_string(), MIN_LOGIN_LENGTH));
    }

    if trimmed.len() > MAX_LOGIN_LENGTH {
        return Err(ValidationError::TooLong("login".to_string(), MAX_LOGIN_LENGTH));
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat(
            "login may only contain letters and digits".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}
