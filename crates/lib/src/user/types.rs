//! Core data types for the user system

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypto::{SecretHash, SecretHasher};
use crate::Result;

/// Unique, immutable, time-ordered user identifier (UUIDv7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new identifier ordered after every previously generated one.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse an identifier from its string form.
    pub fn parse(s: &str) -> std::result::Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted user identity.
///
/// A record always carries both secret hashes and the stream-key lookup
/// digest; there is no way to build a partial one. Fields are private so a
/// record handed out by the store is an independent copy that cannot be used
/// to reach store-internal state.
#[derive(Clone)]
pub struct UserRecord {
    id: UserId,
    username: String,
    password_hash: SecretHash,
    streamkey_hash: SecretHash,
    streamkey_lookup: String,
}

impl UserRecord {
    /// Assemble a record from its stored parts.
    pub fn from_parts(
        id: UserId,
        username: impl Into<String>,
        password_hash: SecretHash,
        streamkey_hash: SecretHash,
        streamkey_lookup: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password_hash,
            streamkey_hash,
            streamkey_lookup: streamkey_lookup.into(),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &SecretHash {
        &self.password_hash
    }

    pub fn streamkey_hash(&self) -> &SecretHash {
        &self.streamkey_hash
    }

    /// Deterministic digest indexing the stream key for reverse lookup.
    pub fn streamkey_lookup(&self) -> &str {
        &self.streamkey_lookup
    }

    /// Check a login password. Never accepts the stream key.
    pub async fn verify_password(&self, hasher: &SecretHasher, password: &str) -> Result<bool> {
        hasher.verify_async(password, &self.password_hash).await
    }

    /// Check a stream key. Never accepts the login password.
    pub async fn verify_stream_key(&self, hasher: &SecretHasher, stream_key: &str) -> Result<bool> {
        hasher.verify_async(stream_key, &self.streamkey_hash).await
    }

    /// Copy of this record with a rotated password hash.
    pub fn with_password_hash(&self, password_hash: SecretHash) -> Self {
        Self {
            password_hash,
            ..self.clone()
        }
    }

    /// Copy of this record with a rotated stream key.
    pub fn with_stream_key(&self, streamkey_hash: SecretHash, streamkey_lookup: String) -> Self {
        Self {
            streamkey_hash,
            streamkey_lookup,
            ..self.clone()
        }
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.username)
    }
}
