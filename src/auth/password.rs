/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password strength validation.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 32;
const ALLOWED_SPECIAL_CHARS: &str = "!@#$%^&*";

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - Plain text password to hash
///
/// # Errors
/// Returns error if:
/// - Password fails validation (too short, weak, etc.)
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Arguments
/// * `password` - Plain text password to verify
/// * `hash` - Bcrypt hash to verify against
///
/// # Errors
/// Returns error if verification fails
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Validate password strength requirements
///
/// Requirements:
/// - 8 to 32 characters
/// - At least one digit, one lowercase letter, one uppercase letter
/// - Only letters, digits, and the special characters !@#$%^&*
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(c);
    if !password.chars().all(allowed) {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password may only contain letters, digits, and the special characters !@#$%^&*"
                .to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "ValidPass123";
        let hash = hash_password(password).expect("Failed to hash password");

        // Hash should not be the same as password
        assert_ne!(password, hash);
        // Hash should start with bcrypt identifier
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let password = "ValidPass123";
        let hash = hash_password(password).expect("Failed to hash password");

        let is_valid = verify_password(password, &hash).expect("Failed to verify password");
        assert!(is_valid);
    }

    #[test]
    fn test_verify_wrong_password() {
        let password = "ValidPass123";
        let hash = hash_password(password).expect("Failed to hash password");

        let is_valid = verify_password("WrongPass123", &hash).expect("Failed to verify password");
        assert!(!is_valid);
    }

    #[test]
    fn test_too_short_password() {
        let result = hash_password("Short1");
        assert!(result.is_err());
    }

    #[test]
    fn test_too_long_password() {
        let long_password = format!("Aa1{}", "a".repeat(MAX_PASSWORD_LENGTH));
        let result = hash_password(&long_password);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_digits() {
        let result = hash_password("NoDigitsHere");
        assert!(result.is_err());
    }

    #[test]
    fn test_no_lowercase() {
        let result = hash_password("NOLOWERCASE1");
        assert!(result.is_err());
    }

    #[test]
    fn test_no_uppercase() {
        let result = hash_password("nouppercase1");
        assert!(result.is_err());
    }

    #[test]
    fn test_disallowed_special_characters() {
        assert!(hash_password("ValidPass1<>").is_err());
        assert!(hash_password("Valid Pass1").is_err());
    }

    #[test]
    fn test_valid_password() {
        assert!(hash_password("ValidPass123").is_ok());
        assert!(hash_password("Password1!").is_ok());
        assert!(hash_password("Str0ng#Pass*").is_ok());
    }
}
