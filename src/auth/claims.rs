/// JWT Claims structures
///
/// Payloads of the access and refresh tokens, containing user information
/// and standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Claims carried by an access token
///
/// `is_authenticated` distinguishes a full session token from the partial
/// token minted mid-2FA-challenge. A partial token is only ever accepted by
/// the 2FA continuation endpoint; every other consumer must reject it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User login handle
    pub login: String,
    /// User email
    pub email: String,
    /// Whether the second factor (if any) has been satisfied
    pub is_authenticated: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        login: String,
        email: String,
        is_authenticated: bool,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            login,
            email,
            is_authenticated,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns error if user ID is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }

    /// Check if token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

/// Claims carried by a refresh token
///
/// Refresh tokens only need to name their owner; validity is decided by the
/// refresh token store, not by the payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "alice".to_string(),
            "alice@example.com".to_string(),
            true,
            3600,
            "test".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.login, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.is_authenticated);
        assert_eq!(claims.iss, "test");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_partial_claims_flag() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            false,
            3600,
            "test".to_string(),
        );

        assert!(!claims.is_authenticated);
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "alice".to_string(),
            "alice@example.com".to_string(),
            true,
            3600,
            "test".to_string(),
        );

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            true,
            3600,
            "test".to_string(),
        );
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_refresh_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = RefreshClaims::new(user_id, 604800, "test".to_string());

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.exp > claims.iat);
    }
}
