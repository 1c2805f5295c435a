use std::{any::Any, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use castgate::{
    CredentialStore, Result,
    backend::{CredentialBackend, database::InMemory},
    service::{self, AppState},
    session::SessionConfig,
    user::{HasherConfig, LookupKey, SecretHasher, UserId, UserRecord},
};
use tower::ServiceExt;

// ==========================
// CORE TEST FACTORIES
// ==========================
// These are the foundation for all test setup. They provide a single point of change
// for backend matrix testing via TEST_BACKEND env var.

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend (requires `postgres` feature and TEST_POSTGRES_URL)
///
/// # Example
/// ```bash
/// # Run tests with InMemory (default)
/// cargo test
///
/// # Run tests with SQLite
/// TEST_BACKEND=sqlite cargo test --features sqlite
///
/// # Run tests with PostgreSQL
/// TEST_BACKEND=postgres TEST_POSTGRES_URL="postgres://localhost/castgate_test" \
///   cargo test --features postgres
/// ```
pub async fn test_backend() -> Box<dyn CredentialBackend> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use castgate::backend::database::Sqlite;
                Box::new(
                    Sqlite::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use castgate::backend::database::Postgres;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/castgate_test".to_string());
                Box::new(
                    Postgres::connect_postgres_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                )
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Box::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite, postgres")
        }
    }
}

/// A hasher with the cheapest Argon2 parameters.
pub fn test_hasher() -> SecretHasher {
    SecretHasher::new(HasherConfig::insecure_fast()).expect("Failed to create hasher")
}

/// Creates an empty store over the TEST_BACKEND backend.
pub async fn test_store() -> CredentialStore {
    store_over(test_backend().await)
}

/// The lookup key shared by every test store.
pub fn test_lookup_key() -> LookupKey {
    LookupKey::new(b"integration-tests").expect("Failed to create lookup key")
}

/// Creates a store over the given backend.
pub fn store_over(backend: Box<dyn CredentialBackend>) -> CredentialStore {
    CredentialStore::new(backend, test_hasher(), test_lookup_key())
}

/// Creates a store holding `alice` with password `password123` and stream key `lol123`.
pub async fn test_store_with_alice() -> CredentialStore {
    let store = test_store().await;
    store
        .create("alice", "password123", "lol123")
        .await
        .expect("Failed to create alice");
    store
}

/// Application state over a store, with a generated session key.
pub fn test_state(store: CredentialStore) -> AppState {
    AppState::new(store, SessionConfig::generated())
}

/// The authentication router over a store holding alice.
pub async fn test_app() -> (Router, AppState) {
    let state = test_state(test_store_with_alice().await);
    (service::router(state.clone()), state)
}

/// A backend whose reads hang for an hour before answering.
///
/// Pair with `#[tokio::test(start_paused = true)]` so deadlines fire without
/// waiting in real time.
#[derive(Debug)]
pub struct StalledBackend {
    inner: InMemory,
}

const STALL: Duration = Duration::from_secs(3600);

#[async_trait]
impl CredentialBackend for StalledBackend {
    async fn get(&self, username: &str) -> Result<UserRecord> {
        tokio::time::sleep(STALL).await;
        self.inner.get(username).await
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        tokio::time::sleep(STALL).await;
        self.inner.list().await
    }

    async fn count(&self) -> Result<usize> {
        tokio::time::sleep(STALL).await;
        self.inner.count().await
    }

    async fn insert(&self, record: UserRecord) -> Result<()> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: UserRecord) -> Result<()> {
        self.inner.update(record).await
    }

    async fn remove(&self, username: &str) -> Result<()> {
        self.inner.remove(username).await
    }

    async fn find_by_stream_key_lookup(&self, lookup: &str) -> Result<Vec<UserRecord>> {
        tokio::time::sleep(STALL).await;
        self.inner.find_by_stream_key_lookup(lookup).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A store over a [`StalledBackend`] already holding alice.
///
/// Alice is inserted below the store, since `create` would stall on its
/// existence check.
pub async fn stalled_store_with_alice() -> CredentialStore {
    let hasher = test_hasher();
    let lookup = test_lookup_key();
    let inner = InMemory::new();
    inner
        .insert(UserRecord::from_parts(
            UserId::generate(),
            "alice",
            hasher.hash("password123").expect("Failed to hash password"),
            hasher.hash("lol123").expect("Failed to hash stream key"),
            lookup.digest("lol123"),
        ))
        .await
        .expect("Failed to insert alice");
    CredentialStore::new(Box::new(StalledBackend { inner }), hasher, lookup)
}

// ==========================
// HTTP HELPERS
// ==========================

/// Send one request through a router.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone()
        .oneshot(request)
        .await
        .expect("Router is infallible")
}

/// A form-encoded login request.
pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::post("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

/// A request carrying an optional cookie header.
pub fn request_with_cookie(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// The full `Set-Cookie` header for the session cookie, if the response has one.
pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// The `name=value` pair of the session cookie, suitable for a `Cookie` header.
pub fn session_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookie_header(response, name)
        .and_then(|header| header.split(';').next().map(str::to_string))
}

/// Read a response body as a string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
