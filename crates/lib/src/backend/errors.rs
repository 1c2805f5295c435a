//! Backend error types for castgate.
//!
//! This module defines structured error types for persistence operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// No user with this username.
    #[error("User not found: {username}")]
    UserNotFound {
        /// The username that was looked up
        username: String,
    },

    /// A user with this username already exists.
    #[error("Username already exists: {username}")]
    DuplicateUsername {
        /// The username that was rejected
        username: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Another backend, possibly in another process, has the user file open.
    #[error("User file is in use by another open backend: {path}")]
    FileLocked {
        /// The user file that could not be claimed
        path: String,
    },

    /// Stored data could not be turned back into a user record.
    #[error("Corrupt user record: {reason}")]
    CorruptRecord {
        /// Description of what was wrong
        reason: String,
    },

    /// SQL database error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Description of the failure, including context
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if this error indicates a user was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::UserNotFound { .. })
    }

    /// Check if this error indicates a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::DuplicateUsername { .. })
    }

    /// Check if this error comes from the storage medium rather than the data.
    pub fn is_persistence_error(&self) -> bool {
        !self.is_not_found() && !self.is_conflict()
    }

    /// Check if the user file is held by another open backend.
    pub fn is_locked(&self) -> bool {
        matches!(self, BackendError::FileLocked { .. })
    }
}

// Conversion from BackendError to the main Error type
impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
