/// Two-Factor Authentication Manager
///
/// Owns the TOTP secret and recovery code stored on the user record:
/// generation, validation, and the enable/disable toggle. TOTP parameters
/// follow RFC 6238 defaults (SHA-1, 6 digits, 30 second step, one step of
/// tolerance either way).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use sqlx::PgPool;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::auth::users::User;
use crate::error::{AppError, AuthError};

const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

/// Two-factor secret material returned to the user on enable/status
#[derive(Debug, Clone, Serialize)]
pub struct TwoFaData {
    pub secret: String,
    pub otpauth_url: String,
    pub recovery_code: String,
}

/// Two-factor status for the authenticated user
#[derive(Debug, Serialize)]
pub struct TwoFaStatus {
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TwoFaData>,
}

fn build_totp(secret: &str, issuer: &str, account: &str) -> Result<TOTP, AppError> {
    let secret_bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| AppError::Internal(format!("Invalid TOTP secret: {:?}", e)))?;

    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AppError::Internal(format!("TOTP creation failed: {}", e)))
}

/// Derive the otpauth:// URL for a stored secret
///
/// Deterministic in (secret, issuer, login): previously scanned QR codes
/// stay valid as long as the secret is unchanged.
pub fn otpauth_url(secret: &str, issuer: &str, login: &str) -> Result<String, AppError> {
    let totp = build_totp(secret, issuer, login)?;
    Ok(totp.get_url())
}

/// Generate a recovery code (16 random bytes, hex-encoded)
fn generate_recovery_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Read the user's current two-factor status
pub fn two_fa_status(user: &User, issuer: &str) -> Result<TwoFaStatus, AppError> {
    match (&user.two_fa_secret, &user.two_fa_recovery_code) {
        (Some(secret), recovery) => Ok(TwoFaStatus {
            is_enabled: true,
            data: Some(TwoFaData {
                secret: secret.clone(),
                otpauth_url: otpauth_url(secret, issuer, &user.login)?,
                recovery_code: recovery.clone().unwrap_or_default(),
            }),
        }),
        (None, _) => Ok(TwoFaStatus {
            is_enabled: false,
            data: None,
        }),
    }
}

/// Enable 2FA for a user, or return the existing material unchanged
///
/// Idempotent: an existing secret is never rotated. First-time enablement
/// generates a fresh TOTP secret and recovery code and persists both in a
/// single update.
pub async fn enable_or_fetch(
    pool: &PgPool,
    user: &User,
    issuer: &str,
) -> Result<TwoFaData, AppError> {
    if let Some(secret) = &user.two_fa_secret {
        return Ok(TwoFaData {
            secret: secret.clone(),
            otpauth_url: otpauth_url(secret, issuer, &user.login)?,
            recovery_code: user.two_fa_recovery_code.clone().unwrap_or_default(),
        });
    }

    let secret = Secret::generate_secret().to_encoded().to_string();
    let recovery_code = generate_recovery_code();
    let url = otpauth_url(&secret, issuer, &user.login)?;

    sqlx::query(
        r#"
        UPDATE users
        SET two_fa_secret = $1, two_fa_recovery_code = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(&secret)
    .bind(&recovery_code)
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.id, "2FA enabled");

    Ok(TwoFaData {
        secret,
        otpauth_url: url,
        recovery_code,
    })
}

/// Disable 2FA for a user
///
/// Requires a valid TOTP or recovery code. Secret and recovery code are
/// cleared together; clearing one without the other would corrupt the
/// enabled-iff-secret invariant.
///
/// # Errors
/// - `AuthError::TwoFaNotEnabled` when the user has no secret
/// - `AuthError::MissingTwoFaCodeForToggle` when no code was supplied
/// - `AuthError::WrongTwoFaCode` when the code does not validate
pub async fn disable(pool: &PgPool, user: &User, code: Option<&str>) -> Result<(), AppError> {
    if user.two_fa_secret.is_none() {
        return Err(AppError::Auth(AuthError::TwoFaNotEnabled));
    }

    let code = code.ok_or(AppError::Auth(AuthError::MissingTwoFaCodeForToggle))?;

    if !validate_code(user, code)? {
        tracing::warn!(user_id = %user.id, "2FA disable rejected: invalid code");
        return Err(AppError::Auth(AuthError::WrongTwoFaCode));
    }

    sqlx::query(
        r#"
        UPDATE users
        SET two_fa_secret = NULL, two_fa_recovery_code = NULL, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.id, "2FA disabled");

    Ok(())
}

/// Validate a submitted code against the user's TOTP secret or recovery code
///
/// The recovery code is a permanent secondary credential here: it is not
/// invalidated after use.
///
/// # Errors
/// Returns `AuthError::TwoFaNotEnabled` when the user has no secret
pub fn validate_code(user: &User, code: &str) -> Result<bool, AppError> {
    let secret = user
        .two_fa_secret
        .as_deref()
        .ok_or(AppError::Auth(AuthError::TwoFaNotEnabled))?;

    // Issuer/account don't affect code verification; any labels work here
    let totp = build_totp(secret, "verify", "verify")?;
    let current_matches = totp
        .check_current(code)
        .map_err(|e| AppError::Internal(format!("TOTP verification failed: {}", e)))?;

    if current_matches {
        return Ok(true);
    }

    if let Some(recovery) = &user.two_fa_recovery_code {
        if code == recovery {
            tracing::warn!(user_id = %user.id, "Recovery code used for 2FA verification");
            return Ok(true);
        }
    }

    Ok(false)
}

/// Render the user's otpauth URL as a PNG QR code
///
/// # Errors
/// Returns `AuthError::TwoFaNotEnabled` when the user has no secret
pub fn qr_code_png(user: &User, issuer: &str) -> Result<Vec<u8>, AppError> {
    let secret = user
        .two_fa_secret
        .as_deref()
        .ok_or(AppError::Auth(AuthError::TwoFaNotEnabled))?;

    let totp = build_totp(secret, issuer, &user.login)?;
    let encoded = totp
        .get_qr_base64()
        .map_err(|e| AppError::Internal(format!("QR code generation failed: {}", e)))?;

    BASE64
        .decode(encoded)
        .map_err(|e| AppError::Internal(format!("QR code decoding failed: {}", e)))
}
