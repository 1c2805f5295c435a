//! The credential store: sole authority over user records.
//!
//! `CredentialStore` layers secret hashing, username validation and a single
//! writer lock over a [`CredentialBackend`]. Reads go straight to the backend
//! and never wait on the writer lock; mutations are serialised so each one
//! owns its whole read-modify-persist sequence.
//!
//! Hashing is slow on purpose, so secrets are hashed before the writer lock is
//! taken and verified before it is taken where the operation allows it.

use std::{fmt, future::Future, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    Result,
    backend::{BackendError, CredentialBackend},
    user::{LookupKey, SecretHasher, UserId, UserRecord},
};

mod errors;
pub use errors::StoreError;


/// Shared state behind every clone of a `CredentialStore`.
struct StoreInternal {
    backend: Box<dyn CredentialBackend>,
    hasher: SecretHasher,
    lookup: LookupKey,
    /// Held for the duration of each mutation
    writer: Mutex<()>,
}

impl fmt::Debug for StoreInternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreInternal")
            .field("backend", &"<CredentialBackend>")
            .field("hasher", &self.hasher)
            .field("lookup", &self.lookup)
            .finish()
    }
}

/// Handle to the credential store.
///
/// Cloning is cheap; all clones share the same backend and writer lock, so
/// one store is built at startup and handed to every request handler.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    inner: Arc<StoreInternal>,
}

/// Reject usernames that cannot act as a lookup key.
fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(StoreError::InvalidUsername {
            reason: "username must not be empty".to_string(),
        }
        .into());
    }
    if username.chars().any(char::is_control) {
        return Err(StoreError::InvalidUsername {
            reason: "username must not contain control characters".to_string(),
        }
        .into());
    }
    Ok(())
}

impl CredentialStore {
    /// Create a store over `backend`.
    ///
    /// `lookup` keys the deterministic stream-key digest; changing it makes
    /// every stored stream key unreachable by reverse lookup until rotated.
    pub fn new(
        backend: Box<dyn CredentialBackend>,
        hasher: SecretHasher,
        lookup: LookupKey,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInternal {
                backend,
                hasher,
                lookup,
                writer: Mutex::new(()),
            }),
        }
    }

    /// The hasher shared by every verification in this store.
    pub fn hasher(&self) -> &SecretHasher {
        &self.inner.hasher
    }

    /// The underlying backend, for inspection and downcasting.
    pub fn backend(&self) -> &dyn CredentialBackend {
        self.inner.backend.as_ref()
    }

    /// Run `op` under the writer lock on its own task.
    ///
    /// The caller only awaits the task, so a caller that stops waiting leaves
    /// the commit to finish rather than abandoning it halfway.
    async fn commit<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<StoreInternal>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = inner.writer.lock().await;
            op(Arc::clone(&inner)).await
        })
        .await
        .map_err(|e| StoreError::CommitAborted {
            reason: e.to_string(),
        })?
    }

    /// Provision a new user.
    ///
    /// Both secrets are hashed before the writer lock is taken. The record is
    /// persisted before this returns.
    ///
    /// # Errors
    /// - `BackendError::DuplicateUsername` if the username is taken
    /// - `StoreError::InvalidUsername` for an empty username
    /// - persistence or hashing errors; nothing is stored in that case
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        stream_key: &str,
    ) -> Result<UserRecord> {
        validate_username(username)?;

        // Cheap early rejection; the backend insert is the authoritative check
        if self.exists(username).await? {
            return Err(BackendError::DuplicateUsername {
                username: username.to_string(),
            }
            .into());
        }

        let hasher = self.hasher();
        let (password_hash, streamkey_hash) =
            tokio::try_join!(hasher.hash_async(password), hasher.hash_async(stream_key))?;

        let record = UserRecord::from_parts(
            UserId::generate(),
            username,
            password_hash,
            streamkey_hash,
            self.inner.lookup.digest(stream_key),
        );

        let stored = record.clone();
        self.commit(move |inner| async move { inner.backend.insert(stored).await })
            .await?;

        tracing::info!(username, id = %record.id(), "Created user");
        Ok(record)
    }

    /// Look up a user by username.
    ///
    /// # Returns
    /// An independent copy of the record, or `BackendError::UserNotFound`.
    pub async fn get(&self, username: &str) -> Result<UserRecord> {
        self.inner.backend.get(username).await
    }

    /// Whether a user with this username exists.
    pub async fn exists(&self, username: &str) -> Result<bool> {
        match self.inner.backend.get(username).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Snapshot of all users ordered by id.
    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        self.inner.backend.list().await
    }

    /// Number of users.
    pub async fn len(&self) -> Result<usize> {
        self.inner.backend.count().await
    }

    /// Whether the store holds no users.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Delete a user and persist the result.
    pub async fn remove(&self, username: &str) -> Result<()> {
        let name = username.to_string();
        self.commit(move |inner| async move { inner.backend.remove(&name).await })
            .await?;

        tracing::info!(username, "Removed user");
        Ok(())
    }

    /// Check a user's login password.
    ///
    /// An unknown user and a wrong password both yield
    /// `StoreError::AuthenticationFailed`, and both cost one verification.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord> {
        let record = match self.get(username).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                self.hasher().verify_decoy(password).await?;
                return Err(StoreError::AuthenticationFailed {
                    username: username.to_string(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        if record.verify_password(self.hasher(), password).await? {
            Ok(record)
        } else {
            Err(StoreError::AuthenticationFailed {
                username: username.to_string(),
            }
            .into())
        }
    }

    /// Rotate a password after verifying the current one.
    ///
    /// Verification happens outside the writer lock. Under the lock the stored
    /// hash must still be the one that was verified, otherwise the rotation is
    /// refused with `StoreError::ConcurrentModification`.
    ///
    /// # Errors
    /// - `BackendError::UserNotFound` if there is no such user
    /// - `StoreError::AuthenticationFailed` if `current` does not verify;
    ///   state is unchanged
    pub async fn change_password(&self, username: &str, current: &str, new: &str) -> Result<()> {
        let record = self.get(username).await?;

        if !record.verify_password(self.hasher(), current).await? {
            tracing::warn!(username, "Password change rejected: current password mismatch");
            return Err(StoreError::AuthenticationFailed {
                username: username.to_string(),
            }
            .into());
        }

        let verified = record.password_hash().clone();
        let new_hash = self.hasher().hash_async(new).await?;
        let name = username.to_string();

        self.commit(move |inner| async move {
            let latest = inner.backend.get(&name).await?;
            if !latest.password_hash().ct_eq(&verified) {
                return Err(StoreError::ConcurrentModification { username: name }.into());
            }
            inner.backend.update(latest.with_password_hash(new_hash)).await
        })
        .await?;

        tracing::info!(username, "Changed password");
        Ok(())
    }

    /// Administrative password reset; no current password required.
    pub async fn set_password(&self, username: &str, new: &str) -> Result<()> {
        let new_hash = self.hasher().hash_async(new).await?;
        let name = username.to_string();

        self.commit(move |inner| async move {
            let latest = inner.backend.get(&name).await?;
            inner.backend.update(latest.with_password_hash(new_hash)).await
        })
        .await?;

        tracing::info!(username, "Reset password");
        Ok(())
    }

    /// Replace a user's stream key.
    ///
    /// Unconditional: no current key is required. Callers exposing this must
    /// apply their own reauthentication policy.
    pub async fn change_stream_key(&self, username: &str, new_stream_key: &str) -> Result<()> {
        let new_hash = self.hasher().hash_async(new_stream_key).await?;
        let new_lookup = self.inner.lookup.digest(new_stream_key);
        let name = username.to_string();

        self.commit(move |inner| async move {
            let latest = inner.backend.get(&name).await?;
            inner
                .backend
                .update(latest.with_stream_key(new_hash, new_lookup))
                .await
        })
        .await?;

        tracing::info!(username, "Rotated stream key");
        Ok(())
    }

    /// Find the user owning a stream key.
    ///
    /// Candidates are fetched by the keyed lookup digest and each is checked
    /// against its salted hash. An unknown key and a key that only collides on
    /// the digest both yield `None`.
    pub async fn verify_stream_key_owner(&self, stream_key: &str) -> Result<Option<String>> {
        let lookup = self.inner.lookup.digest(stream_key);
        let candidates = self.inner.backend.find_by_stream_key_lookup(&lookup).await?;

        if candidates.is_empty() {
            self.hasher().verify_decoy(stream_key).await?;
            return Ok(None);
        }

        for candidate in candidates {
            if candidate.verify_stream_key(self.hasher(), stream_key).await? {
                return Ok(Some(candidate.username().to_string()));
            }
        }
        Ok(None)
    }

    /// Seed an initial user when the store is empty.
    ///
    /// # Returns
    /// `true` if the user was created, `false` if the store already had users.
    pub async fn bootstrap(
        &self,
        username: &str,
        password: &str,
        stream_key: &str,
    ) -> Result<bool> {
        validate_username(username)?;

        if !self.is_empty().await? {
            tracing::debug!("Store already populated, skipping bootstrap");
            return Ok(false);
        }

        let hasher = self.hasher();
        let (password_hash, streamkey_hash) =
            tokio::try_join!(hasher.hash_async(password), hasher.hash_async(stream_key))?;
        let record = UserRecord::from_parts(
            UserId::generate(),
            username,
            password_hash,
            streamkey_hash,
            self.inner.lookup.digest(stream_key),
        );

        let created = self
            .commit(move |inner| async move {
                if inner.backend.count().await? > 0 {
                    return Ok(false);
                }
                inner.backend.insert(record).await?;
                Ok(true)
            })
            .await?;

        if created {
            tracing::info!(username, "Bootstrapped initial user");
        }
        Ok(created)
    }
}
