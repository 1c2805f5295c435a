//! Stream-key authorization for the ingest path.
//!
//! Stateless per request: no cookie and no session are involved. Every check
//! reads the credential store directly and never takes its writer lock, so
//! any number of ingest requests can be authorized at once.

use std::{collections::HashMap, time::Duration};

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    CredentialStore,
    constants::{
        BEARER_PREFIX, DEFAULT_REQUEST_TIMEOUT_SECS, INTERNAL_ERROR_BODY, INVALID_STREAM_KEY_BODY,
        MISSING_STREAM_KEY_BODY, TIMEOUT_BODY,
    },
};

/// State of the [`require_stream_key`] middleware.
#[derive(Clone, Debug)]
pub struct IngestGate {
    store: CredentialStore,
    /// Bound on the authorization check of one request
    timeout: Duration,
}

impl IngestGate {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Identity of an authorized ingest request, inserted by [`require_stream_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestIdentity {
    pub username: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent, not UTF-8, uses another scheme,
/// or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether `stream_key` is the stream key of `username`.
///
/// A missing user, a wrong key and a store failure all yield `false`; the
/// failure is logged but not surfaced. Unknown users cost one decoy
/// verification so they take as long as a wrong key.
pub async fn authorize_ingest(store: &CredentialStore, username: &str, stream_key: &str) -> bool {
    match check_stream_key(store, username, stream_key).await {
        Ok(authorized) => authorized,
        Err(e) => {
            tracing::error!(username, "Ingest authorization failed: {e}");
            false
        }
    }
}

async fn check_stream_key(
    store: &CredentialStore,
    username: &str,
    stream_key: &str,
) -> crate::Result<bool> {
    match store.get(username).await {
        Ok(record) => record.verify_stream_key(store.hasher(), stream_key).await,
        Err(e) if e.is_not_found() => {
            store.hasher().verify_decoy(stream_key).await?;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Middleware gating `/{username}` ingest routes on a bearer stream key.
///
/// Responds 401 when the header is missing or the key does not belong to the
/// user named in the path, and 504 when the check outlives the gate timeout.
/// On success the inner handler sees an [`IngestIdentity`] extension.
pub async fn require_stream_key(
    State(gate): State<IngestGate>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(username) = params.get("username") else {
        tracing::error!("Ingest route has no username path parameter");
        return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response();
    };

    let Some(token) = extract_bearer_token(request.headers()) else {
        return (StatusCode::UNAUTHORIZED, MISSING_STREAM_KEY_BODY).into_response();
    };

    match tokio::time::timeout(gate.timeout, authorize_ingest(&gate.store, username, token)).await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(username, "Denied ingest");
            return (StatusCode::UNAUTHORIZED, INVALID_STREAM_KEY_BODY).into_response();
        }
        Err(_) => {
            tracing::warn!(username, timeout = ?gate.timeout, "Ingest authorization timed out");
            return (StatusCode::GATEWAY_TIMEOUT, TIMEOUT_BODY).into_response();
        }
    }

    request.extensions_mut().insert(IngestIdentity {
        username: username.clone(),
    });
    next.run(request).await
}
