//! User record storage operations for SQL backends.
//!
//! This module implements the CRUD operations for user records using sqlx.

use crate::Result;
use crate::backend::errors::BackendError;
use crate::user::{SecretHash, UserId, UserRecord};

use super::{SqlxBackend, SqlxResultExt};

/// Row shape shared by every user query.
type UserRow = (String, String, String, String, String);

const SELECT_USER: &str =
    "SELECT id, username, password_hash, streamkey_hash, streamkey_lookup FROM users";

fn row_to_record(row: UserRow) -> Result<UserRecord> {
    let (id, username, password_hash, streamkey_hash, streamkey_lookup) = row;
    let id = UserId::parse(&id).map_err(|e| BackendError::CorruptRecord {
        reason: format!("invalid id for user {username}: {e}"),
    })?;
    Ok(UserRecord::from_parts(
        id,
        username,
        SecretHash::from_phc(password_hash),
        SecretHash::from_phc(streamkey_hash),
        streamkey_lookup,
    ))
}

/// Get a user by username.
pub async fn get(backend: &SqlxBackend, username: &str) -> Result<UserRecord> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE username = $1"))
        .bind(username)
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get user")?;

    match row {
        Some(row) => row_to_record(row),
        None => Err(BackendError::UserNotFound {
            username: username.to_string(),
        }
        .into()),
    }
}

/// All users ordered by id.
pub async fn list(backend: &SqlxBackend) -> Result<Vec<UserRecord>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!("{SELECT_USER} ORDER BY id"))
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to list users")?;

    rows.into_iter().map(row_to_record).collect()
}

/// Number of stored users.
pub async fn count(backend: &SqlxBackend) -> Result<usize> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to count users")?;

    Ok(usize::try_from(count).unwrap_or_default())
}

/// Insert a new user, relying on the UNIQUE constraint for username conflicts.
pub async fn insert(backend: &SqlxBackend, record: &UserRecord) -> Result<()> {
    let result = sqlx::query(
        "INSERT INTO users (id, username, password_hash, streamkey_hash, streamkey_lookup)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id().to_string())
    .bind(record.username())
    .bind(record.password_hash().as_phc())
    .bind(record.streamkey_hash().as_phc())
    .bind(record.streamkey_lookup())
    .execute(backend.pool())
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(BackendError::DuplicateUsername {
                username: record.username().to_string(),
            }
            .into())
        }
        Err(e) => Err(e).sql_context("Failed to insert user"),
    }
}

/// Replace the secrets of an existing user.
pub async fn update(backend: &SqlxBackend, record: &UserRecord) -> Result<()> {
    let result = sqlx::query(
        "UPDATE users
         SET password_hash = $1, streamkey_hash = $2, streamkey_lookup = $3
         WHERE username = $4",
    )
    .bind(record.password_hash().as_phc())
    .bind(record.streamkey_hash().as_phc())
    .bind(record.streamkey_lookup())
    .bind(record.username())
    .execute(backend.pool())
    .await
    .sql_context("Failed to update user")?;

    if result.rows_affected() == 0 {
        return Err(BackendError::UserNotFound {
            username: record.username().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Delete a user.
pub async fn remove(backend: &SqlxBackend, username: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(backend.pool())
        .await
        .sql_context("Failed to remove user")?;

    if result.rows_affected() == 0 {
        return Err(BackendError::UserNotFound {
            username: username.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Users whose lookup digest matches, ordered by id.
pub async fn find_by_stream_key_lookup(
    backend: &SqlxBackend,
    lookup: &str,
) -> Result<Vec<UserRecord>> {
    let rows: Vec<UserRow> =
        sqlx::query_as(&format!("{SELECT_USER} WHERE streamkey_lookup = $1 ORDER BY id"))
            .bind(lookup)
            .fetch_all(backend.pool())
            .await
            .sql_context("Failed to look up stream key")?;

    rows.into_iter().map(row_to_record).collect()
}
