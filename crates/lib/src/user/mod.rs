//! User system for castgate
//!
//! Provides the user record and the secret hashing primitives shared by
//! password and stream-key verification.

pub mod crypto;
pub mod errors;
pub mod types;

pub use crypto::{HasherConfig, LookupKey, SecretHash, SecretHasher, generate_stream_key};
pub use errors::UserError;
pub use types::*;
