//!
//! castgate: the credential and session core of a self-hosted broadcast server.
//!
//! ## Core Concepts
//!
//! * **Secret hashing (`user::crypto::SecretHasher`)**: Salted Argon2id hashing and verification
//!   shared by login passwords and stream keys.
//! * **User records (`user::UserRecord`)**: A persisted identity holding a unique username and two
//!   independent secret hashes.
//! * **Backends (`backend::CredentialBackend`)**: Pluggable persistence for user records, either an
//!   in-memory map rewritten to a JSON file or a SQL table through sqlx.
//! * **Credential store (`store::CredentialStore`)**: The single authority over user records. It
//!   serialises writers, hashes secrets and enforces username uniqueness.
//! * **Sessions (`session::SessionManager`)**: Encrypted cookie sessions with a login/logout state
//!   machine and an axum middleware gating protected routes.
//! * **Ingest gate (`ingest`)**: Stateless bearer stream-key authorization for the ingest path.
//! * **Service (`service`)**: The HTTP payload layer wiring the pieces into an axum router.

pub mod backend;
pub mod constants;
pub mod ingest;
pub mod service;
pub mod session;
pub mod store;
pub mod user;

pub use store::CredentialStore;
pub use user::UserRecord;

/// Result type used throughout the castgate library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the castgate library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured hashing errors from the user module
    #[error(transparent)]
    User(user::UserError),

    /// Structured persistence errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured credential errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::User(_) => "user",
            Error::Backend(_) => "backend",
            Error::Store(_) => "store",
            Error::Session(_) => "session",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a user was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates the username is already taken.
    pub fn is_duplicate_username(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    ///
    /// Covers secret mismatches and the uniform login denial.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_authentication_error(),
            Error::Session(session_err) => session_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error is a persistence failure (I/O, serialization or SQL).
    ///
    /// A mutation that fails with a persistence error was not committed.
    pub fn is_persistence_error(&self) -> bool {
        match self {
            Error::Io(_) | Error::Serialize(_) => true,
            Error::Backend(backend_err) => backend_err.is_persistence_error(),
            Error::Store(store_err) => store_err.is_commit_error(),
            _ => false,
        }
    }

    /// Check if this error means the user file is already open elsewhere.
    pub fn is_locked(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_locked(),
            _ => false,
        }
    }

    /// Check if this error came from the secret hasher.
    pub fn is_hashing_error(&self) -> bool {
        matches!(self, Error::User(_))
    }

    /// Check if this error indicates a lost race against another writer.
    pub fn is_concurrency_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_concurrency_error(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_validation_error(),
            Error::Session(session_err) => session_err.is_configuration_error(),
            _ => false,
        }
    }
}
