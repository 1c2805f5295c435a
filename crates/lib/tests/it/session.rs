//! Session lifecycle through the authentication router.

use std::time::Duration;

use axum::http::StatusCode;
use castgate::{
    constants::{INVALID_LOGIN_BODY, LOGIN_REQUIRED_BODY, SESSION_COOKIE},
    service::{self, AppState},
    session::SessionConfig,
};

use crate::helpers::{
    body_string, login_request, request_with_cookie, send, session_cookie, set_cookie_header,
    test_app, test_store_with_alice,
};

#[tokio::test]
async fn test_login_info_logout_lifecycle() {
    let (app, _) = test_app().await;

    // Login
    let response = send(&app, login_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response, SESSION_COOKIE).expect("session cookie set");
    assert_eq!(body_string(response).await, "alice");

    // Authenticated request
    let response = send(&app, request_with_cookie("GET", "/user/info", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");

    // Logout clears the cookie
    let response = send(&app, request_with_cookie("POST", "/auth/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = session_cookie(&response, SESSION_COOKIE).expect("cookie removal sent");
    assert_eq!(cleared, format!("{SESSION_COOKIE}="));

    // The client now holds the cleared cookie
    let response = send(&app, request_with_cookie("GET", "/user/info", Some(&cleared))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, LOGIN_REQUIRED_BODY);
}

#[tokio::test]
async fn test_gate_requires_a_session() {
    let (app, _) = test_app().await;

    for (method, uri) in [("GET", "/user/info"), ("POST", "/auth/logout")] {
        let response = send(&app, request_with_cookie(method, uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_enumeration_resistance() {
    let (app, _) = test_app().await;

    let unknown = send(&app, login_request("mallory", "password123")).await;
    let wrong = send(&app, login_request("alice", "wrong")).await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), unknown.status());
    assert!(session_cookie(&unknown, SESSION_COOKIE).is_none());
    assert!(session_cookie(&wrong, SESSION_COOKIE).is_none());
    assert_eq!(body_string(unknown).await, INVALID_LOGIN_BODY);
    assert_eq!(body_string(wrong).await, INVALID_LOGIN_BODY);
}

#[tokio::test]
async fn test_incomplete_form_is_an_invalid_login() {
    let (app, _) = test_app().await;

    let request = axum::http::Request::post("/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("username=alice"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, INVALID_LOGIN_BODY);
}

#[tokio::test]
async fn test_forged_cookies_are_anonymous() {
    let (app, _) = test_app().await;

    let plaintext = format!(
        "{SESSION_COOKIE}={}",
        r#"{"authenticated":true,"username":"alice"}"#
    );
    for cookie in [plaintext, format!("{SESSION_COOKIE}=garbage")] {
        let response = send(&app, request_with_cookie("GET", "/user/info", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_cookie_from_another_key_is_rejected() {
    let store = test_store_with_alice().await;
    let app_a = service::router(AppState::new(store.clone(), SessionConfig::generated()));
    let app_b = service::router(AppState::new(store, SessionConfig::generated()));

    let response = send(&app_a, login_request("alice", "password123")).await;
    let cookie = session_cookie(&response, SESSION_COOKIE).unwrap();

    let response = send(&app_b, request_with_cookie("GET", "/user/info", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_attributes() {
    let store = test_store_with_alice().await;
    let mut config = SessionConfig::generated();
    config.cookie_name = "stream_session".to_string();
    config.secure = true;
    config.max_age = Some(Duration::from_secs(3600));
    let app = service::router(AppState::new(store, config));

    let response = send(&app, login_request("alice", "password123")).await;
    let header = set_cookie_header(&response, "stream_session").expect("cookie set");

    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Lax"));
    assert!(header.contains("Path=/"));
    assert!(header.contains("Secure"));
    assert!(header.contains("Max-Age=3600"));
    assert!(!header.contains("authenticated"));
}

#[tokio::test]
async fn test_relogin_after_password_change() {
    let (app, state) = test_app().await;

    state
        .store
        .change_password("alice", "password123", "rotated")
        .await
        .unwrap();

    let old = send(&app, login_request("alice", "password123")).await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
    let new = send(&app, login_request("alice", "rotated")).await;
    assert_eq!(new.status(), StatusCode::OK);
}
