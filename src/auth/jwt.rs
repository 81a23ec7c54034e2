/// JWT Token Generation and Validation
///
/// The token codec: signs and verifies access tokens and refresh tokens.
/// Access and refresh tokens use separate secrets; both are HS256.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Generate an access token for a user
///
/// `is_authenticated = false` produces a partial token for the 2FA
/// handshake; such a token is rejected by the JWT middleware and only
/// accepted by the 2FA continuation endpoint.
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(
    user_id: &Uuid,
    login: &str,
    email: &str,
    is_authenticated: bool,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        login.to_string(),
        email.to_string(),
        is_authenticated,
        config.access_token_expiry,
        config.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate and extract claims from an access token
///
/// Checks signature, expiry, and issuer. Does NOT check the
/// `is_authenticated` flag; callers gating access must do that themselves.
///
/// # Errors
/// Returns error if token is invalid, expired, or tampered with
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.access_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })
}

/// Generate a refresh token for a user
///
/// The signed token string is handed to the client as-is; the store keeps
/// only a digest of it. Signed with the refresh secret.
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_refresh_token(user_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = RefreshClaims::new(
        *user_id,
        config.refresh_token_expiry,
        config.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate a refresh token's signature, expiry, and issuer
///
/// A good signature is necessary but not sufficient: the session flow also
/// requires a matching record in the refresh token store.
pub fn validate_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Refresh token validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })
}
