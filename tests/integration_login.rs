#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub
)]
mod common;

use common::{TEST_PASSWORD, TEST_USERNAME, TestApp};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": TEST_USERNAME, "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "data": "invalid username or password" }));
}

#[tokio::test]
async fn test_login_unknown_user() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "john@example.com", "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_success_returns_token() {
    let app = TestApp::spawn().await;
    let token = app.login().await;

    assert_eq!(token.split('.').count(), 3, "token should be a compact JWS");

    let resp = app.client.get(app.url("/me")).bearer_auth(&token).send().await.unwrap();
    // Authenticated, but no card issued yet.
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = TestApp::spawn().await;

    let resp = app.client.post(app.url("/login")).json(&json!({ "username": TEST_USERNAME })).send().await.unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_cors_mirrors_origin() {
    let app = TestApp::spawn().await;
    let origin = "https://shop.example.com";

    let resp = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/login"))
        .header("Origin", origin)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], origin);
    assert_eq!(resp.headers()["access-control-allow-credentials"], "true");
}
