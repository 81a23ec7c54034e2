/// Credential Verification
///
/// Checks a login-or-email identifier plus password against stored user
/// records. The two failure kinds stay distinct so the HTTP layer can map
/// them to 404 and 403, but neither the logs nor the response bodies echo
/// anything beyond the identifier.

use sqlx::PgPool;

use crate::auth::password::verify_password;
use crate::auth::users::{find_user_by_identifier, User};
use crate::error::{AppError, AuthError};

/// Verify an identifier/password pair and return the matching user
///
/// # Errors
/// - `AuthError::UserNotFound` when no user matches the identifier
/// - `AuthError::WrongPassword` when the password does not verify
pub async fn verify_credentials(
    pool: &PgPool,
    identifier: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = find_user_by_identifier(pool, identifier)
        .await?
        .ok_or_else(|| {
            tracing::warn!(identifier = %identifier, "Login attempt for unknown user");
            AppError::Auth(AuthError::UserNotFound)
        })?;

    let password_valid = verify_password(password, &user.password_hash)?;
    if !password_valid {
        tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AppError::Auth(AuthError::WrongPassword));
    }

    Ok(user)
}
