/// Refresh Token Store
///
/// Persists refresh tokens per user, bounded in count:
/// - Tokens are hashed with SHA-256 before storage (never store plaintext)
/// - Each user holds at most a configured number of records; issuing one
///   more evicts that user's single oldest record first
/// - Lookup and revocation are scoped to the owning user
/// - Revocation of an unknown token is a silent no-op (idempotent logout)

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Hash a refresh token using SHA-256
///
/// Never store plaintext tokens in the database. The digest is
/// deterministic, so matching a presented token against a user's records is
/// an indexed equality lookup.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Save a refresh token to the database, evicting the oldest if needed
///
/// Count check, eviction, and insert run in one transaction so concurrent
/// issuance for the same user cannot leave the store above the bound.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `user_id` - User ID that owns this token
/// * `token` - Plaintext refresh token
/// * `max_per_user` - Per-user record bound
///
/// # Errors
/// Returns error if a database operation fails
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    max_per_user: i64,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);

    let mut tx = pool.begin().await?;

    let stored = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut tx)
    .await?;

    if stored >= max_per_user {
        tracing::info!(
            user_id = %user_id,
            stored = stored,
            "Refresh token bound reached, evicting oldest record"
        );

        sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE id = (
                SELECT id FROM refresh_tokens
                WHERE user_id = $1
                ORDER BY created_at ASC
                LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .execute(&mut tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(token_hash)
    .bind(Utc::now())
    .execute(&mut tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Check whether a plaintext refresh token is stored for a user
///
/// # Returns
/// `true` if the token's digest matches one of the user's records
pub async fn is_refresh_token_stored(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
) -> Result<bool, AppError> {
    let token_hash = hash_token(token);

    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND token_hash = $2",
    )
    .bind(user_id)
    .bind(&token_hash)
    .fetch_one(pool)
    .await?;

    Ok(found > 0)
}

/// Revoke a single refresh token for a user
///
/// Deleting a token that was never stored is NOT an error: logout must be
/// idempotent and must not leak whether a token existed.
///
/// # Errors
/// Returns error if the database operation fails
pub async fn revoke_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);

    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token_hash = $2")
        .bind(user_id)
        .bind(&token_hash)
        .execute(pool)
        .await?;

    Ok(())
}
