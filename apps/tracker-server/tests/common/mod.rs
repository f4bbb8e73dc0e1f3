//! Shared helpers for the HTTP tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use record_store::MemoryRecordStore;
use serde_json::Value;
use tower::ServiceExt;
use tracker_server::{bootstrap_admin, config::Config, create_app, create_state};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

fn test_config(with_admin: bool) -> Config {
    Config::from_lookup(|key| match key {
        "TRACKER_JWT_SECRET" => Some("test-secret-key-must-be-long-enough".to_string()),
        "DATABASE_URL" => Some("memory".to_string()),
        "TRACKER_ADMIN_EMAIL" if with_admin => Some(ADMIN_EMAIL.to_string()),
        "TRACKER_ADMIN_PASSWORD" if with_admin => Some(ADMIN_PASSWORD.to_string()),
        _ => None,
    })
    .unwrap()
}

/// Router over an empty in-memory store.
pub fn app() -> Router {
    create_app(create_state(test_config(false), MemoryRecordStore::new()))
}

/// Router whose store already holds the bootstrap admin.
pub async fn app_with_admin() -> Router {
    let state = create_state(test_config(true), MemoryRecordStore::new());
    bootstrap_admin(&state).await.unwrap();
    create_app(state)
}

/// Sends a request and returns the status and the JSON body (`Null` if empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Adds `Authorization: Bearer <token>`.
pub fn authorized(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

pub async fn register(app: &Router, email: &str, password: &str) -> i64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/auth_service/auth/register",
            serde_json::json!({"username": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body.as_i64().unwrap()
}

/// Logs in through the form endpoint and returns the whole token response.
pub async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/auth_service/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={email}&password={password}")))
        .unwrap();
    send(app, request).await
}

pub async fn token_for(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = login(app, email, password).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}
