//! Error types for session operations.

use thiserror::Error;

/// Errors that can occur while managing cookie sessions.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login was refused. Deliberately carries no detail about why.
    #[error("Invalid login")]
    InvalidLogin,

    /// The session cookie could not be written.
    #[error("Failed to write session cookie: {reason}")]
    CookieWrite { reason: String },

    /// The configured cookie key is unusable.
    #[error("Invalid session key: {reason}")]
    InvalidSessionKey { reason: String },
}

impl SessionError {
    /// Check if this error is the uniform login denial.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, SessionError::InvalidLogin)
    }

    /// Check if this error comes from session configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, SessionError::InvalidSessionKey { .. })
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
