/// Authentication Routes
///
/// HTTP surface over the session flows: registration, login, the 2FA
/// handshake and management endpoints, token refresh, logout, and current
/// user information. Tokens travel as httpOnly cookies, with an
/// `Authorization: Bearer` fallback for non-browser clients.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    continue_with_two_factor, disable_two_fa, enable_two_fa, find_user_by_id, login as login_flow,
    logout as logout_flow, qr_code_png, refresh as refresh_flow, register as register_flow,
    two_fa_status, AuthenticatedSession, Claims, LoginOutcome, User,
};
use crate::configuration::Settings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// User login request; `login` accepts a login handle or an email
#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    pub two_fa_code: Option<String>,
}

/// Body fallback for refresh/logout when cookies are unavailable
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ToggleQuery {
    pub code: Option<String>,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub login: String,
    pub email: String,
    pub two_fa_enabled: bool,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            login: user.login.clone(),
            email: user.email.clone(),
            two_fa_enabled: user.has_two_fa_enabled(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Authentication response with access and refresh tokens
///
/// Tokens are also set as cookies; the body copy serves non-browser
/// clients.
#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

fn token_cookie(name: &'static str, value: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .finish()
}

/// Build the standard session response: both cookies plus the body copy
fn session_response(
    session: &AuthenticatedSession,
    settings: &Settings,
    mut builder: actix_web::HttpResponseBuilder,
) -> HttpResponse {
    builder
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            &session.access_token,
            settings.jwt.access_token_expiry,
        ))
        .cookie(token_cookie(
            REFRESH_TOKEN_COOKIE,
            &session.refresh_token,
            settings.jwt.refresh_token_expiry,
        ))
        .json(SessionResponse {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: settings.jwt.access_token_expiry,
            user: UserResponse::from(&session.user),
        })
}

/// Pull the refresh token from the cookie, falling back to the body
fn extract_refresh_token(
    req: &HttpRequest,
    body: Option<&RefreshRequest>,
) -> Result<String, AppError> {
    if let Some(cookie) = req.cookie(REFRESH_TOKEN_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    body.map(|b| b.refresh_token.clone())
        .ok_or(AppError::Auth(AuthError::MissingRefreshToken))
}

/// Pull the access token from the cookie or the Bearer header
///
/// Used by the 2FA continuation route, which sits outside the JWT
/// middleware because it must accept partial tokens.
fn extract_access_token(req: &HttpRequest) -> Result<String, AppError> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AppError::Auth(AuthError::MissingToken))
}

/// Load the user behind validated middleware claims
async fn current_user(pool: &PgPool, claims: &Claims) -> Result<User, AppError> {
    let user_id = claims.user_id()?;
    find_user_by_id(pool, user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::UserNotFound))
}

/// POST /auth/register
///
/// Register a new user with login, email, and password. Registration
/// establishes the first session: both tokens are issued right away.
///
/// # Errors
/// - 400: Validation errors (invalid login/email/password)
/// - 409: Login or email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let session = register_flow(
        pool.get_ref(),
        settings.get_ref(),
        &form.login,
        &form.email,
        &form.password,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "User registered successfully"
    );

    Ok(session_response(
        &session,
        settings.get_ref(),
        HttpResponse::Created(),
    ))
}

/// POST /auth/login
///
/// Authenticate with a login-or-email identifier and password, optionally
/// with the 2FA code inline.
///
/// A user with 2FA enabled who omits the code gets a 401 with code
/// `MISSING_2FA_CODE` and a partial access token; the handshake completes
/// at `POST /auth/2fa/authenticate/{code}`.
///
/// # Errors
/// - 404: No user matches the identifier
/// - 403: Wrong password or wrong inline 2FA code
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let outcome = login_flow(
        pool.get_ref(),
        settings.get_ref(),
        &form.login,
        &form.password,
        form.two_fa_code.as_deref(),
    )
    .await?;

    match outcome {
        LoginOutcome::Authenticated(session) => {
            tracing::info!(
                request_id = %context.request_id,
                user_id = %session.user.id,
                "User logged in successfully"
            );
            Ok(session_response(&session, settings.get_ref(), HttpResponse::Ok()))
        }
        LoginOutcome::TwoFactorRequired {
            partial_access_token,
        } => {
            tracing::info!(
                request_id = %context.request_id,
                "Login pending second factor"
            );
            // The partial token travels in the cookie and the body, like a
            // full token, but no refresh token is issued yet. The token is
            // why this response is built here instead of going through
            // `ResponseError`.
            let challenge = AuthError::MissingTwoFaCode;
            let (status, code) = challenge.status_and_code();
            Ok(HttpResponse::build(status)
                .cookie(token_cookie(
                    ACCESS_TOKEN_COOKIE,
                    &partial_access_token,
                    settings.jwt.access_token_expiry,
                ))
                .json(serde_json::json!({
                    "code": code,
                    "message": challenge.to_string(),
                    "access_token": partial_access_token,
                })))
        }
    }
}

/// POST /auth/2fa/authenticate/{code}
///
/// Complete a pending 2FA login. Accepts the partial access token from the
/// login step plus a TOTP or recovery code, and establishes the full
/// session.
///
/// # Errors
/// - 401: Missing/invalid partial token, or token already fully authenticated
/// - 403: Wrong 2FA code
/// - 409: 2FA no longer enabled for the user
pub async fn authenticate_two_fa(
    req: HttpRequest,
    code: web::Path<String>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("two_fa_authenticate");

    let partial_token = extract_access_token(&req)?;
    let session =
        continue_with_two_factor(pool.get_ref(), settings.get_ref(), &partial_token, &code)
            .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "Two-factor authentication completed"
    );

    Ok(session_response(&session, settings.get_ref(), HttpResponse::Ok()))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a fresh token pair. The presented token is
/// not consumed; it stays stored until logout or eviction.
///
/// # Errors
/// - 400: No refresh token in cookie or body
/// - 401: Invalid, expired, or revoked refresh token
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = extract_refresh_token(&req, body.as_deref())?;
    let session = refresh_flow(pool.get_ref(), settings.get_ref(), &refresh_token).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "Token refreshed successfully"
    );

    Ok(session_response(&session, settings.get_ref(), HttpResponse::Ok()))
}

/// DELETE /auth/logout
///
/// Revoke the presented refresh token and clear both cookies. Idempotent:
/// logging out with an unknown or already-revoked token still succeeds.
///
/// # Errors
/// - 400: No refresh token in cookie or body
pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_refresh_token(&req, body.as_deref())?;

    logout_flow(pool.get_ref(), settings.get_ref(), &refresh_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .json(serde_json::json!({ "message": "Logged out" })))
}

/// GET /auth/me
///
/// Current authenticated user's information. Requires a full session token
/// (the JWT middleware rejects partial tokens).
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(pool.get_ref(), &claims).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// GET /auth/2fa/status
///
/// Whether 2FA is enabled, plus the secret material when it is.
pub async fn get_two_fa_status(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(pool.get_ref(), &claims).await?;
    let status = two_fa_status(&user, &settings.auth.totp_issuer)?;
    Ok(HttpResponse::Ok().json(status))
}

/// POST /auth/2fa/toggle/{enabled}?code=
///
/// Enable or disable 2FA. Enabling is idempotent and returns the secret
/// material; disabling requires a valid TOTP or recovery code via the
/// `code` query parameter.
///
/// # Errors
/// - 403: Missing or wrong code when disabling
/// - 409: Disabling while 2FA is not enabled
pub async fn toggle_two_fa(
    claims: web::ReqData<Claims>,
    enabled: web::Path<bool>,
    query: web::Query<ToggleQuery>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(pool.get_ref(), &claims).await?;

    if *enabled {
        let data = enable_two_fa(pool.get_ref(), &user, &settings.auth.totp_issuer).await?;
        Ok(HttpResponse::Ok().json(data))
    } else {
        disable_two_fa(pool.get_ref(), &user, query.code.as_deref()).await?;
        Ok(HttpResponse::Ok().json(serde_json::json!({ "is_enabled": false })))
    }
}

/// GET /auth/2fa/qr-code
///
/// The user's otpauth URL rendered as a PNG QR code.
///
/// # Errors
/// - 409: 2FA is not enabled
pub async fn get_two_fa_qr_code(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(pool.get_ref(), &claims).await?;
    let png = qr_code_png(&user, &settings.auth.totp_issuer)?;

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
