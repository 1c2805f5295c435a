//! Backend implementations for castgate storage
//!
//! This module provides the core `CredentialBackend` trait and its implementations.
//!
//! The trait defines how user records are stored and retrieved. The credential
//! store layers hashing, validation and writer serialisation on top, so backends
//! stay simple persistence adapters.

use std::any::Any;

use async_trait::async_trait;

use crate::Result;
use crate::user::UserRecord;

pub mod database;
pub mod errors;

pub use errors::BackendError;

/// Persistence for user records.
///
/// Implementations must be `Send` and `Sync` so one instance can serve every
/// request handler, and implement `Any` to allow for downcasting if needed.
///
/// ## Contract
///
/// - Every read returns owned copies; nothing handed out aliases backend state.
/// - A mutation is either fully persisted before it returns `Ok`, or it
///   returns an error and leaves both durable and in-memory state untouched.
/// - Readers never observe a half-applied mutation.
/// - Usernames are unique and compared case-sensitively.
#[async_trait]
pub trait CredentialBackend: Send + Sync + Any {
    /// Retrieves a user by username.
    ///
    /// # Returns
    /// The record, or `BackendError::UserNotFound`.
    async fn get(&self, username: &str) -> Result<UserRecord>;

    /// Snapshot of all users, ordered by id.
    async fn list(&self) -> Result<Vec<UserRecord>>;

    /// Number of stored users.
    async fn count(&self) -> Result<usize>;

    /// Stores a new user.
    ///
    /// # Returns
    /// `BackendError::DuplicateUsername` if the username is taken.
    async fn insert(&self, record: UserRecord) -> Result<()>;

    /// Replaces the stored record with the same username.
    ///
    /// # Returns
    /// `BackendError::UserNotFound` if there is no such user.
    async fn update(&self, record: UserRecord) -> Result<()>;

    /// Deletes a user.
    ///
    /// # Returns
    /// `BackendError::UserNotFound` if there is no such user.
    async fn remove(&self, username: &str) -> Result<()>;

    /// Users whose stream-key lookup digest equals `lookup`, ordered by id.
    ///
    /// Candidates still have to be verified against their salted hash.
    async fn find_by_stream_key_lookup(&self, lookup: &str) -> Result<Vec<UserRecord>>;

    /// Returns a reference to the backend as a dynamic `Any` type.
    fn as_any(&self) -> &dyn Any;
}
