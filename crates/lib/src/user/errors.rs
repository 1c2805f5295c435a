//! Error types for secret hashing
use thiserror::Error;

/// Errors raised by the secret hasher and the stream-key lookup digest.
///
/// A failure while provisioning at startup is fatal; anywhere else it only
/// fails the operation that triggered it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UserError {
    #[error("Invalid work factor: {reason}")]
    InvalidWorkFactor { reason: String },

    #[error("Secret hashing failed: {reason}")]
    HashingFailed { reason: String },

    #[error("Secret verification failed: {reason}")]
    VerificationFailed { reason: String },

    #[error("Hashing worker failed: {reason}")]
    WorkerFailed { reason: String },

    #[error("Invalid lookup key: {reason}")]
    InvalidLookupKey { reason: String },
}

impl UserError {
    /// Check if this error comes from configuration rather than a single call.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidWorkFactor { .. } | UserError::InvalidLookupKey { .. }
        )
    }
}

impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}
