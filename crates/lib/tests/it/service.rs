//! Health reporting and request timeouts.

use std::time::Duration;

use axum::http::StatusCode;
use castgate::{constants::TIMEOUT_BODY, service};

use crate::helpers::{
    body_string, login_request, request_with_cookie, send, stalled_store_with_alice, test_app,
    test_state,
};

#[tokio::test]
async fn test_health_reports_backend() {
    let (app, _) = test_app().await;

    let response = send(&app, request_with_cookie("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    let backend = body["backend"].as_str().unwrap();
    assert!(["inmemory", "sqlite", "postgres"].contains(&backend));
    // The user count is not public
    assert!(body.get("users").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_login_is_a_gateway_timeout() {
    let state = test_state(stalled_store_with_alice().await)
        .with_request_timeout(Duration::from_millis(50));
    let app = service::router(state);

    let response = send(&app, login_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_string(response).await, TIMEOUT_BODY);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_health_is_a_gateway_timeout() {
    let state = test_state(stalled_store_with_alice().await)
        .with_request_timeout(Duration::from_millis(50));
    let app = service::router(state);

    let response = send(&app, request_with_cookie("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
