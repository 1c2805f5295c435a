//! HTTP payload layer.
//!
//! Wires the credential store, session manager and ingest gate into axum
//! routes. TLS, CORS and the media engine are external; the embedding server
//! merges [`router`] into its own and wraps its ingest routes with
//! [`protect_ingest`].

use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;

use crate::{
    CredentialStore,
    constants::DEFAULT_REQUEST_TIMEOUT_SECS,
    ingest::{IngestGate, require_stream_key},
    session::{SessionConfig, SessionManager, require_session},
};

mod handlers;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: CredentialStore,
    pub sessions: SessionManager,
    /// Bound on store calls made while serving a request
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(store: CredentialStore, session_config: SessionConfig) -> Self {
        Self {
            sessions: SessionManager::new(store.clone(), session_config),
            store,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for IngestGate {
    fn from_ref(state: &AppState) -> Self {
        IngestGate::new(state.store.clone()).with_timeout(state.request_timeout)
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Authentication routes.
///
/// - `POST /auth/login`: form `username`, `password`; 200 with the username
///   and a session cookie, or 401 with a fixed body
/// - `POST /auth/logout`: session required; clears the cookie
/// - `GET /user/info`: session required; the username
/// - `GET /health`: backend kind once the store answers
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/user/info", get(handlers::user_info))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            require_session,
        ));

    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// Put every route of `ingest` behind the stream-key gate.
///
/// Routes must carry a `{username}` path parameter naming the stream owner.
/// The check is bounded by the request timeout of `state`.
pub fn protect_ingest(ingest: Router, state: &AppState) -> Router {
    ingest.route_layer(middleware::from_fn_with_state(
        IngestGate::from_ref(state),
        require_stream_key,
    ))
}
