//! Persistence operations for the InMemory backend
//!
//! This module handles serialization and file I/O for saving/loading
//! the user set to/from a JSON file. The file holds a top-level array of
//! user objects in id order.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::UserMap;
use crate::{
    Error, Result,
    backend::errors::BackendError,
    user::{SecretHash, UserId, UserRecord},
};

/// On-disk form of a user record.
#[derive(Serialize, Deserialize)]
struct PersistedUser {
    id: UserId,
    username: String,
    password_hash: SecretHash,
    streamkey_hash: SecretHash,
    streamkey_lookup: String,
}

impl From<&UserRecord> for PersistedUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id(),
            username: record.username().to_string(),
            password_hash: record.password_hash().clone(),
            streamkey_hash: record.streamkey_hash().clone(),
            streamkey_lookup: record.streamkey_lookup().to_string(),
        }
    }
}

impl From<PersistedUser> for UserRecord {
    fn from(user: PersistedUser) -> Self {
        UserRecord::from_parts(
            user.id,
            user.username,
            user.password_hash,
            user.streamkey_hash,
            user.streamkey_lookup,
        )
    }
}

/// Sibling of `path` with `suffix` appended to the file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Sibling path the new contents are written to before the rename.
fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, ".tmp")
}

/// Sibling path holding the advisory lock for `path`.
///
/// The user file itself is replaced on every write, so the lock lives on a
/// file that is never renamed.
pub(crate) fn lock_path(path: &Path) -> PathBuf {
    sibling_path(path, ".lock")
}

/// Claim exclusive use of the user file at `path`.
///
/// The lock is held until the returned file is dropped. A second claim, from
/// this process or another, fails with `BackendError::FileLocked` instead of
/// waiting.
pub(crate) async fn lock_user_file(path: &Path) -> Result<File> {
    let lock = lock_path(path);
    let io_err = |e| -> Error { BackendError::FileIo { source: e }.into() };

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(false);
    #[cfg(unix)]
    options.mode(0o600);
    let file = options.open(&lock).await.map_err(io_err)?.into_std().await;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            Err(BackendError::FileLocked {
                path: path.display().to_string(),
            }
            .into())
        }
        Err(e) => Err(io_err(e)),
    }
}

/// Writes the whole user set to `path`.
///
/// The data is written and synced to a temporary sibling file which is then
/// renamed over `path`, and the directory is synced so the rename survives a
/// crash. A truncated file is never left behind, and neither is the temporary
/// file when any step fails. On unix the file is created readable by the
/// owner only.
pub(crate) async fn write_users(path: &Path, users: &UserMap) -> Result<()> {
    let mut persisted: Vec<PersistedUser> = users.values().map(PersistedUser::from).collect();
    persisted.sort_by_key(|u| u.id);

    let json = serde_json::to_vec_pretty(&persisted)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;

    let tmp = temp_path(path);
    let replaced = async {
        write_synced(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;
    if let Err(e) = replaced {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(BackendError::FileIo { source: e }.into());
    }

    sync_parent_dir(path)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

// Directories cannot be opened for syncing here
#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Reads the user set from `path`.
///
/// # Returns
/// `Ok(None)` if the file does not exist, the users otherwise. Duplicate
/// usernames in the file are reported as a corrupt record.
pub(crate) async fn read_users(path: &Path) -> Result<Option<UserMap>> {
    let json = match tokio::fs::read(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BackendError::FileIo { source: e }.into()),
    };

    let persisted: Vec<PersistedUser> = serde_json::from_slice(&json)
        .map_err(|e| -> Error { BackendError::DeserializationFailed { source: e }.into() })?;

    let mut users = UserMap::new();
    for user in persisted {
        let record = UserRecord::from(user);
        let username = record.username().to_string();
        if users.insert(username.clone(), record).is_some() {
            return Err(BackendError::CorruptRecord {
                reason: format!("duplicate username in user file: {username}"),
            }
            .into());
        }
    }
    Ok(Some(users))
}
