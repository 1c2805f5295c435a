//! Cookie sessions and the authentication gate.
//!
//! A session lives entirely in an encrypted, authenticated cookie holding a
//! [`Session`]. The server keeps no session table; the credential store is
//! consulted only at login time.
//!
//! Each client session is in one of two states:
//!
//! - `Anonymous`: the initial state, and the result of any failed login or of
//!   a cookie that does not decrypt
//! - `Authenticated(username)`: reached by a successful login, left by logout

use std::{fmt, sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies, Key, cookie::SameSite};

use crate::{
    CredentialStore, Result,
    constants::{LOGIN_REQUIRED_BODY, SESSION_COOKIE, SESSION_KEY_MIN_LENGTH},
};

mod errors;
pub use errors::SessionError;

/// Cookie session settings.
#[derive(Clone)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Key encrypting and authenticating the cookie
    pub key: Key,
    /// Cookie lifetime; `None` makes it a browser-session cookie
    pub max_age: Option<Duration>,
    /// Only send the cookie over HTTPS
    pub secure: bool,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie_name", &self.cookie_name)
            .field("key", &"<redacted>")
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionConfig {
    /// Settings with the default cookie name and the given key.
    pub fn new(key: Key) -> Self {
        Self {
            cookie_name: SESSION_COOKIE.to_string(),
            key,
            max_age: None,
            secure: false,
        }
    }

    /// Settings with a freshly generated key.
    ///
    /// Sessions issued under a generated key do not survive a restart.
    pub fn generated() -> Self {
        Self::new(Key::generate())
    }

    /// Decode a base64 cookie key of at least 64 bytes.
    pub fn key_from_base64(encoded: &str) -> Result<Key> {
        let bytes = Base64::decode_vec(encoded.trim()).map_err(|e| {
            SessionError::InvalidSessionKey {
                reason: format!("not valid base64: {e}"),
            }
        })?;

        if bytes.len() < SESSION_KEY_MIN_LENGTH {
            return Err(SessionError::InvalidSessionKey {
                reason: format!(
                    "key is {} bytes, at least {SESSION_KEY_MIN_LENGTH} required",
                    bytes.len()
                ),
            }
            .into());
        }

        Key::try_from(bytes.as_slice()).map_err(|e| {
            SessionError::InvalidSessionKey {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// The cookie payload.
///
/// `username` is only a claim; it means nothing unless `authenticated` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub username: String,
}

/// Interpreted state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(String),
}

impl Session {
    /// A session for a user who just logged in.
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            username: username.into(),
        }
    }

    /// The state this payload represents.
    pub fn state(&self) -> SessionState {
        if self.authenticated && !self.username.is_empty() {
            SessionState::Authenticated(self.username.clone())
        } else {
            SessionState::Anonymous
        }
    }
}

/// Identity of the caller, inserted by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Login/logout transitions over encrypted cookie sessions.
///
/// Cloning is cheap. The manager never mutates user records.
#[derive(Clone, Debug)]
pub struct SessionManager {
    store: CredentialStore,
    config: Arc<SessionConfig>,
}

impl SessionManager {
    pub fn new(store: CredentialStore, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read the session carried by the request cookies.
    ///
    /// A missing cookie, or one that fails to decrypt or parse, reads as an
    /// anonymous session.
    pub fn session(&self, cookies: &Cookies) -> Session {
        let private = cookies.private(&self.config.key);
        let Some(cookie) = private.get(&self.config.cookie_name) else {
            return Session::default();
        };

        match serde_json::from_str(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("Discarding unreadable session cookie: {e}");
                Session::default()
            }
        }
    }

    /// The session's state.
    pub fn state(&self, cookies: &Cookies) -> SessionState {
        self.session(cookies).state()
    }

    /// Username of an authenticated session, for display only.
    pub fn current_username(&self, cookies: &Cookies) -> Option<String> {
        match self.state(cookies) {
            SessionState::Authenticated(username) => Some(username),
            SessionState::Anonymous => None,
        }
    }

    /// Check credentials and, on success, mark the session authenticated.
    ///
    /// An unknown user and a wrong password both fail with
    /// `SessionError::InvalidLogin` after the same amount of hashing work. A
    /// failed login leaves the cookie untouched.
    ///
    /// # Returns
    /// The logged-in username.
    pub async fn login(&self, cookies: &Cookies, username: &str, password: &str) -> Result<String> {
        match self.store.authenticate(username, password).await {
            Ok(_) => {}
            Err(e) if e.is_authentication_error() => {
                tracing::warn!(username, "Rejected login");
                return Err(SessionError::InvalidLogin.into());
            }
            Err(e) => return Err(e),
        }

        self.write(cookies, &Session::authenticated(username))?;
        tracing::info!(username, "User logged in");
        Ok(username.to_string())
    }

    /// End the session. Idempotent.
    pub fn logout(&self, cookies: &Cookies) {
        if let Some(username) = self.current_username(cookies) {
            tracing::info!(username, "User logged out");
        }
        cookies
            .private(&self.config.key)
            .remove(self.base_cookie(String::new()));
    }

    fn write(&self, cookies: &Cookies, session: &Session) -> Result<()> {
        let value = serde_json::to_string(session).map_err(|e| SessionError::CookieWrite {
            reason: e.to_string(),
        })?;

        let mut cookie = self.base_cookie(value);
        if let Some(max_age) = self.config.max_age {
            let max_age = time::Duration::try_from(max_age).map_err(|e| {
                SessionError::CookieWrite {
                    reason: e.to_string(),
                }
            })?;
            cookie.set_max_age(max_age);
        }

        cookies.private(&self.config.key).add(cookie);
        Ok(())
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .build()
    }
}

/// Middleware running the inner handler only for authenticated sessions.
///
/// Other requests get 401 with a fixed body. On success the username is
/// available to handlers as an [`AuthenticatedUser`] extension.
///
/// ```ignore
/// Router::new()
///     .route("/user/info", get(info))
///     .layer(middleware::from_fn_with_state(sessions, require_session))
/// ```
pub async fn require_session(
    State(sessions): State<SessionManager>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    match sessions.state(&cookies) {
        SessionState::Authenticated(username) => {
            request.extensions_mut().insert(AuthenticatedUser(username));
            next.run(request).await
        }
        SessionState::Anonymous => (StatusCode::UNAUTHORIZED, LOGIN_REQUIRED_BODY).into_response(),
    }
}
