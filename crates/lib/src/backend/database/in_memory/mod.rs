//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the `CredentialBackend`
//! trait, optionally bound to a JSON file that is rewritten on every mutation.

mod persistence;

use std::any::Any;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::CredentialBackend;
use crate::backend::errors::BackendError;
use crate::user::UserRecord;

/// Users keyed by username.
pub(crate) type UserMap = BTreeMap<String, UserRecord>;

/// A simple in-memory backend using a `BTreeMap` keyed by username.
///
/// Without a file this is suitable for tests and ephemeral deployments. When
/// opened with [`InMemory::load_from_file`] the whole user set is written to
/// that file on every mutation, which is O(n) per write and only reasonable
/// for small user counts.
///
/// Mutations are applied to a copy of the map, persisted, and only then
/// swapped in, all while holding the write lock. A failed write therefore
/// leaves memory in agreement with what would be reloaded from disk. The swap
/// happens after the file write completes, so callers must not drop a
/// mutation future midway; `CredentialStore` runs them on their own task.
///
/// A file-backed instance holds an exclusive lock on the file for as long as
/// it lives, so two processes never rewrite the same user set.
#[derive(Debug)]
pub struct InMemory {
    users: RwLock<UserMap>,
    path: Option<PathBuf>,
    _lock: Option<File>,
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemory {
    /// Creates a new, empty `InMemory` backend with no file behind it.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            path: None,
            _lock: None,
        }
    }

    /// Loads the user set from a JSON file and binds the backend to it.
    ///
    /// If the file does not exist the backend starts empty; the file is first
    /// created by the first mutation. The lock is taken before reading and
    /// released when the backend is dropped.
    ///
    /// # Returns
    /// The loaded backend, `BackendError::FileLocked` if another backend has
    /// the file open, or an I/O or deserialization error.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = persistence::lock_user_file(&path).await?;
        let users = persistence::read_users(&path).await?.unwrap_or_default();
        tracing::debug!(path = %path.display(), users = users.len(), "Loaded user file");
        Ok(Self {
            users: RwLock::new(users),
            path: Some(path),
            _lock: Some(lock),
        })
    }

    /// The file this backend persists to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply `mutate` to a copy of the map, persist the copy, then swap it in.
    async fn commit<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut UserMap) -> Result<()> + Send,
    {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        mutate(&mut next)?;

        if let Some(path) = &self.path {
            if let Err(e) = persistence::write_users(path, &next).await {
                tracing::error!(path = %path.display(), "Failed to persist users: {e}");
                return Err(e);
            }
        }

        *users = next;
        Ok(())
    }
}

#[async_trait]
impl CredentialBackend for InMemory {
    async fn get(&self, username: &str) -> Result<UserRecord> {
        let users = self.users.read().await;
        users.get(username).cloned().ok_or_else(|| {
            BackendError::UserNotFound {
                username: username.to_string(),
            }
            .into()
        })
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut records: Vec<UserRecord> = users.values().cloned().collect();
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.users.read().await.len())
    }

    async fn insert(&self, record: UserRecord) -> Result<()> {
        self.commit(move |users| {
            if users.contains_key(record.username()) {
                return Err(BackendError::DuplicateUsername {
                    username: record.username().to_string(),
                }
                .into());
            }
            users.insert(record.username().to_string(), record);
            Ok(())
        })
        .await
    }

    async fn update(&self, record: UserRecord) -> Result<()> {
        self.commit(move |users| match users.get_mut(record.username()) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(BackendError::UserNotFound {
                username: record.username().to_string(),
            }
            .into()),
        })
        .await
    }

    async fn remove(&self, username: &str) -> Result<()> {
        self.commit(|users| match users.remove(username) {
            Some(_) => Ok(()),
            None => Err(BackendError::UserNotFound {
                username: username.to_string(),
            }
            .into()),
        })
        .await
    }

    async fn find_by_stream_key_lookup(&self, lookup: &str) -> Result<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut records: Vec<UserRecord> = users
            .values()
            .filter(|r| r.streamkey_lookup() == lookup)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
