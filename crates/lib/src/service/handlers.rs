//! Route handlers for the authentication endpoints.

use std::{any::Any, future::Future};

use axum::{
    Extension, Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::AppState;
use crate::{
    backend::database::InMemory,
    constants::{INTERNAL_ERROR_BODY, INVALID_LOGIN_BODY, TIMEOUT_BODY},
    session::AuthenticatedUser,
};

/// Login form. Missing fields read as empty and fail like wrong ones.
#[derive(Deserialize)]
pub(super) struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

/// Await `fut` for at most the request timeout.
///
/// On expiry the caller stops waiting; a commit already handed to the store
/// still completes.
async fn bounded<T>(
    state: &AppState,
    fut: impl Future<Output = crate::Result<T>>,
) -> Result<T, Response> {
    match tokio::time::timeout(state.request_timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.is_authentication_error() => {
            Err((StatusCode::UNAUTHORIZED, INVALID_LOGIN_BODY).into_response())
        }
        Ok(Err(e)) => {
            tracing::error!(module = e.module(), "Request failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response())
        }
        Err(_) => {
            tracing::warn!(timeout = ?state.request_timeout, "Request timed out");
            Err((StatusCode::GATEWAY_TIMEOUT, TIMEOUT_BODY).into_response())
        }
    }
}

/// Handler for POST /auth/login
pub(super) async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Response {
    match bounded(
        &state,
        state.sessions.login(&cookies, &form.username, &form.password),
    )
    .await
    {
        Ok(username) => (StatusCode::OK, username).into_response(),
        Err(response) => response,
    }
}

/// Handler for POST /auth/logout
pub(super) async fn logout(State(state): State<AppState>, cookies: Cookies) -> StatusCode {
    state.sessions.logout(&cookies);
    StatusCode::OK
}

/// Handler for GET /user/info
pub(super) async fn user_info(Extension(user): Extension<AuthenticatedUser>) -> String {
    user.0
}

/// Handler for GET /health
///
/// Reads the store to prove it answers but keeps the user count private.
pub(super) async fn health(State(state): State<AppState>) -> Response {
    match bounded(&state, state.store.len()).await {
        Ok(_) => Json(HealthResponse {
            status: "healthy",
            backend: backend_kind(&state),
        })
        .into_response(),
        Err(response) => response,
    }
}

fn backend_kind(state: &AppState) -> &'static str {
    let backend = state.store.backend().as_any();
    if let Some(kind) = sql_kind(backend) {
        kind
    } else if backend.is::<InMemory>() {
        "inmemory"
    } else {
        "unknown"
    }
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
fn sql_kind(backend: &dyn Any) -> Option<&'static str> {
    use crate::backend::database::{DbKind, SqlxBackend};

    backend
        .downcast_ref::<SqlxBackend>()
        .map(|sqlx| match sqlx.kind() {
            DbKind::Sqlite => "sqlite",
            DbKind::Postgres => "postgres",
        })
}

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
fn sql_kind(_backend: &dyn Any) -> Option<&'static str> {
    None
}
