//! Error types for credential store operations.

use thiserror::Error;

/// Errors raised by the credential store itself.
///
/// Missing users and duplicate usernames come from the backend as
/// [`crate::backend::BackendError`]; this enum covers what the store adds on
/// top: secret checks, validation and writer serialisation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The presented secret did not verify, or the user does not exist and
    /// the caller asked for the two cases to be indistinguishable.
    #[error("Authentication failed for user: {username}")]
    AuthenticationFailed { username: String },

    /// The record changed between verification and commit.
    #[error("User was modified concurrently: {username}")]
    ConcurrentModification { username: String },

    /// The username cannot be stored.
    #[error("Invalid username: {reason}")]
    InvalidUsername { reason: String },

    /// The task running a commit did not finish.
    #[error("Commit task aborted: {reason}")]
    CommitAborted { reason: String },
}

impl StoreError {
    /// Check if this error is a secret mismatch.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, StoreError::AuthenticationFailed { .. })
    }

    /// Check if this error indicates a lost race against another writer.
    pub fn is_concurrency_error(&self) -> bool {
        matches!(self, StoreError::ConcurrentModification { .. })
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, StoreError::InvalidUsername { .. })
    }

    /// Check if the commit outcome is unknown because its task died.
    pub fn is_commit_error(&self) -> bool {
        matches!(self, StoreError::CommitAborted { .. })
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
