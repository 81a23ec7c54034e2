/// User record storage access
///
/// Thin query layer over the `users` table shared by the auth flows. The
/// two-factor columns are read here but written only by the two-factor
/// module.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// A stored user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub two_fa_secret: Option<String>,
    pub two_fa_recovery_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A user has 2FA enabled if and only if a secret is stored.
    pub fn has_two_fa_enabled(&self) -> bool {
        self.two_fa_secret.is_some()
    }
}

const USER_COLUMNS: &str =
    "id, login, email, password_hash, two_fa_secret, two_fa_recovery_code, created_at";

/// Fetch a user by primary key
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Fetch a user by login or email
///
/// The login comparison is case-insensitive; the email comparison is exact.
pub async fn find_user_by_identifier(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE lower(login) = lower($1) OR email = $1",
        USER_COLUMNS
    ))
    .bind(identifier)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Check whether a login or email is already taken
pub async fn login_or_email_taken(
    pool: &PgPool,
    login: &str,
    email: &str,
) -> Result<bool, AppError> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE lower(login) = lower($1) OR email = $2",
    )
    .bind(login)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(existing > 0)
}

/// Insert a new user record and return it
///
/// New users start without 2FA.
pub async fn insert_user(
    pool: &PgPool,
    login: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, login, email, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(login)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id,
        login: login.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        two_fa_secret: None,
        two_fa_recovery_code: None,
        created_at: now,
    })
}
