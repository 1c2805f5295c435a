//! Stream-key authorization of the ingest path.

use std::time::Duration;

use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post,
};
use castgate::{
    constants::{INVALID_STREAM_KEY_BODY, MISSING_STREAM_KEY_BODY, SESSION_COOKIE, TIMEOUT_BODY},
    ingest::{IngestIdentity, authorize_ingest},
    service::{self, protect_ingest},
};

use crate::helpers::{
    body_string, login_request, send, session_cookie, stalled_store_with_alice, test_state,
    test_store_with_alice,
};

async fn whip(Extension(identity): Extension<IngestIdentity>) -> (StatusCode, String) {
    (StatusCode::CREATED, identity.username)
}

async fn ingest_app() -> (Router, Router) {
    let state = test_state(test_store_with_alice().await);
    let ingest = Router::new().route("/api/whip/{username}", post(whip));
    (
        protect_ingest(ingest, &state),
        service::router(state),
    )
}

fn whip_request(username: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(format!("/api/whip/{username}"));
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_authorize_ingest_scenario() {
    let store = test_store_with_alice().await;

    assert!(authorize_ingest(&store, "alice", "lol123").await);
    assert!(!authorize_ingest(&store, "alice", "wrong").await);
    assert!(!authorize_ingest(&store, "bob", "lol123").await);
}

#[tokio::test]
async fn test_gate_accepts_the_owners_key() {
    let (ingest, _) = ingest_app().await;

    let response = send(&ingest, whip_request("alice", Some("Bearer lol123"))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_string(response).await, "alice");
}

#[tokio::test]
async fn test_gate_denies_wrong_key_and_unknown_user_alike() {
    let (ingest, _) = ingest_app().await;

    let wrong = send(&ingest, whip_request("alice", Some("Bearer wrong"))).await;
    let unknown = send(&ingest, whip_request("bob", Some("Bearer lol123"))).await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(wrong).await, INVALID_STREAM_KEY_BODY);
    assert_eq!(body_string(unknown).await, INVALID_STREAM_KEY_BODY);
}

#[tokio::test]
async fn test_gate_requires_bearer_header() {
    let (ingest, _) = ingest_app().await;

    for authorization in [None, Some("lol123"), Some("Basic lol123")] {
        let response = send(&ingest, whip_request("alice", authorization)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, MISSING_STREAM_KEY_BODY);
    }
}

#[tokio::test]
async fn test_session_does_not_authorize_ingest() {
    let (ingest, auth) = ingest_app().await;

    let response = send(&auth, login_request("alice", "password123")).await;
    let cookie = session_cookie(&response, SESSION_COOKIE).unwrap();

    let request = Request::post("/api/whip/alice")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&ingest, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_is_not_a_stream_key() {
    let (ingest, _) = ingest_app().await;

    let response = send(&ingest, whip_request("alice", Some("Bearer password123"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_authorization_is_a_gateway_timeout() {
    let state = test_state(stalled_store_with_alice().await)
        .with_request_timeout(Duration::from_millis(50));
    let ingest = protect_ingest(
        Router::new().route("/api/whip/{username}", post(whip)),
        &state,
    );

    let response = send(&ingest, whip_request("alice", Some("Bearer lol123"))).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_string(response).await, TIMEOUT_BODY);
}
