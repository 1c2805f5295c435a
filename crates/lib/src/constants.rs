//! Constants used throughout the castgate library.
//!
//! Central definitions for cookie names, header prefixes and the generic
//! response bodies shared by the HTTP-facing modules.

/// Default name of the session cookie.
pub const SESSION_COOKIE: &str = "castgate_session";

/// Prefix of an `Authorization` header carrying a stream key.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Length of a generated stream key.
pub const STREAM_KEY_LENGTH: usize = 26;

/// Minimum length of the key material used for session cookies.
pub const SESSION_KEY_MIN_LENGTH: usize = 64;

/// Key for the stream-key lookup digest when none is configured.
///
/// Deployments should configure their own secret so that a leaked user file
/// cannot be used to confirm guessed stream keys offline.
pub const DEFAULT_LOOKUP_KEY: &[u8] = b"castgate/streamkey-lookup/v1";

/// Body returned for every failed login, whatever the reason.
pub const INVALID_LOGIN_BODY: &str = "Invalid login data.";

/// Body returned when a session-gated route is hit without an authenticated session.
pub const LOGIN_REQUIRED_BODY: &str = "Please log in.";

/// Body returned when the ingest path is missing its bearer token.
pub const MISSING_STREAM_KEY_BODY: &str = "Authorization was not set";

/// Body returned when ingest authorization is denied.
pub const INVALID_STREAM_KEY_BODY: &str = "Invalid streamkey";

/// Body returned for internal failures; details only go to the logs.
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// Body returned when a store call outlives the request timeout.
pub const TIMEOUT_BODY: &str = "Request timed out";

/// Default bound on store calls made while serving a request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
