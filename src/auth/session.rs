/// Session Orchestration
///
/// The composition layer for the auth flows: registration, login (with or
/// without a 2FA challenge), 2FA continuation, refresh, and logout. Each
/// flow combines credential checks, token generation, and the refresh token
/// store; the HTTP layer only translates these outcomes into responses.

use sqlx::PgPool;

use crate::auth::credentials::verify_credentials;
use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, validate_access_token,
    validate_refresh_token,
};
use crate::auth::password::hash_password;
use crate::auth::refresh_token::{
    is_refresh_token_stored, revoke_refresh_token, save_refresh_token,
};
use crate::auth::two_factor::validate_code;
use crate::auth::users::{find_user_by_id, insert_user, login_or_email_taken, User};
use crate::configuration::Settings;
use crate::error::{AppError, AuthError};
use crate::validators::{is_valid_email, is_valid_login};

/// A fully established session: both tokens plus the owning user
#[derive(Debug)]
pub struct AuthenticatedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Outcome of a credential login
///
/// A user with 2FA enabled does not get a session from credentials alone;
/// they get a partial access token that only the 2FA continuation endpoint
/// accepts.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    TwoFactorRequired { partial_access_token: String },
}

/// Register a new user and establish their first session
///
/// New users start without 2FA, so registration never awaits a second
/// factor; it issues a full token pair directly.
///
/// # Errors
/// - Validation errors for a malformed login, email, or weak password
/// - `AuthError::UserAlreadyExists` when the login or email is taken
pub async fn register(
    pool: &PgPool,
    settings: &Settings,
    login: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedSession, AppError> {
    let login = is_valid_login(login)?;
    let email = is_valid_email(email)?;
    let password_hash = hash_password(password)?;

    if login_or_email_taken(pool, &login, &email).await? {
        tracing::warn!(login = %login, "Registration rejected: login or email taken");
        return Err(AppError::Auth(AuthError::UserAlreadyExists));
    }

    let user = insert_user(pool, &login, &email, &password_hash).await?;
    tracing::info!(user_id = %user.id, "New user registered");

    issue_session(pool, settings, user).await
}

/// Log a user in with an identifier (login or email) and password
///
/// A user with 2FA enabled may supply the code directly; without it they
/// get the partial-token outcome and complete the handshake at the
/// continuation endpoint.
///
/// # Errors
/// - `AuthError::UserNotFound` when no user matches the identifier
/// - `AuthError::WrongPassword` when the password does not verify
/// - `AuthError::WrongTwoFaCode` when a supplied code does not validate
pub async fn login(
    pool: &PgPool,
    settings: &Settings,
    identifier: &str,
    password: &str,
    two_fa_code: Option<&str>,
) -> Result<LoginOutcome, AppError> {
    let user = verify_credentials(pool, identifier, password).await?;

    if user.has_two_fa_enabled() {
        match two_fa_code {
            None => {
                let partial_access_token = generate_access_token(
                    &user.id,
                    &user.login,
                    &user.email,
                    false,
                    &settings.jwt,
                )?;
                tracing::info!(user_id = %user.id, "Credentials accepted, awaiting second factor");

                return Ok(LoginOutcome::TwoFactorRequired {
                    partial_access_token,
                });
            }
            Some(code) => {
                if !validate_code(&user, code)? {
                    tracing::warn!(user_id = %user.id, "Login rejected: invalid 2FA code");
                    return Err(AppError::Auth(AuthError::WrongTwoFaCode));
                }
            }
        }
    }

    let session = issue_session(pool, settings, user).await?;
    tracing::info!(user_id = %session.user.id, "User logged in");

    Ok(LoginOutcome::Authenticated(session))
}

/// Complete a pending 2FA login with a partial access token and a code
///
/// The partial token is fully verified (signature, expiry, issuer); only
/// its `is_authenticated = false` flag marks it as mid-handshake. The user
/// is re-loaded from storage so a 2FA toggle between the two steps is
/// honored.
///
/// # Errors
/// - `AuthError::TokenInvalid` for a bad token or a vanished user
/// - `AuthError::AlreadyAuthenticated` for a full session token
/// - `AuthError::TwoFaNotEnabled` when 2FA was disabled mid-handshake
/// - `AuthError::WrongTwoFaCode` when the code does not validate
pub async fn continue_with_two_factor(
    pool: &PgPool,
    settings: &Settings,
    partial_token: &str,
    code: &str,
) -> Result<AuthenticatedSession, AppError> {
    let claims = validate_access_token(partial_token, &settings.jwt)?;

    if claims.is_authenticated {
        return Err(AppError::Auth(AuthError::AlreadyAuthenticated));
    }

    let user_id = claims.user_id()?;
    let user = find_user_by_id(pool, user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "2FA continuation for unknown user");
        AppError::Auth(AuthError::TokenInvalid)
    })?;

    if !validate_code(&user, code)? {
        tracing::warn!(user_id = %user.id, "2FA continuation rejected: invalid code");
        return Err(AppError::Auth(AuthError::WrongTwoFaCode));
    }

    let session = issue_session(pool, settings, user).await?;
    tracing::info!(user_id = %session.user.id, "Second factor accepted, session established");

    Ok(session)
}

/// Exchange a stored refresh token for a fresh token pair
///
/// The presented token must carry a valid signature AND match a record in
/// the store; either alone is not enough. The presented token is not
/// consumed: it stays valid until logout or eviction, and the new token is
/// stored alongside it.
///
/// # Errors
/// Returns `AuthError::TokenInvalid` for a bad signature, an expired or
/// revoked token, or a vanished user
pub async fn refresh(
    pool: &PgPool,
    settings: &Settings,
    refresh_token: &str,
) -> Result<AuthenticatedSession, AppError> {
    let claims = validate_refresh_token(refresh_token, &settings.jwt)?;
    let user_id = claims.user_id()?;

    if !is_refresh_token_stored(pool, user_id, refresh_token).await? {
        tracing::warn!(user_id = %user_id, "Refresh attempt with revoked or unknown token");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    let user = find_user_by_id(pool, user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "Refresh attempt for unknown user");
        AppError::Auth(AuthError::TokenInvalid)
    })?;

    let session = issue_session(pool, settings, user).await?;
    tracing::info!(user_id = %session.user.id, "Session refreshed");

    Ok(session)
}

/// Log out by revoking the presented refresh token
///
/// Idempotent: an invalid, expired, or already-revoked token is a no-op.
/// Logout must never fail in a way that leaks whether a token existed.
pub async fn logout(
    pool: &PgPool,
    settings: &Settings,
    refresh_token: &str,
) -> Result<(), AppError> {
    let claims = match validate_refresh_token(refresh_token, &settings.jwt) {
        Ok(claims) => claims,
        Err(_) => {
            tracing::debug!("Logout with unverifiable refresh token, nothing to revoke");
            return Ok(());
        }
    };

    let user_id = claims.user_id()?;
    revoke_refresh_token(pool, user_id, refresh_token).await?;
    tracing::info!(user_id = %user_id, "User logged out");

    Ok(())
}

/// Mint a full token pair for a user and record the refresh token
async fn issue_session(
    pool: &PgPool,
    settings: &Settings,
    user: User,
) -> Result<AuthenticatedSession, AppError> {
    let access_token =
        generate_access_token(&user.id, &user.login, &user.email, true, &settings.jwt)?;
    let refresh_token = generate_refresh_token(&user.id, &settings.jwt)?;

    save_refresh_token(
        pool,
        user.id,
        &refresh_token,
        settings.auth.max_refresh_tokens_per_user,
    )
    .await?;

    Ok(AuthenticatedSession {
        access_token,
        refresh_token,
        user,
    })
}
