#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use kilog_api::{build_router, mint_token, AppState};
use kilog_metrics::MetricsService;
use kilog_models::{Config, CreateUserRequest, User};
use kilog_store::Store;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const JWT_KEY: &str = "api-test-key";
// base64("kilog-test-signing-key")
pub const WEBHOOK_SECRET: &str = "whsec_a2lsb2ctdGVzdC1zaWduaW5nLWtleQ==";

pub async fn create_test_app_state() -> AppState {
    let mut config = Config::default();
    config.auth.jwt_key = JWT_KEY.to_string();
    config.auth.clerk_webhook_secret = Some(WEBHOOK_SECRET.to_string());
    AppState::new(
        config,
        Store::in_memory().await.unwrap(),
        Arc::new(MetricsService::new().unwrap()),
    )
}

pub async fn app() -> (AppState, Router) {
    let state = create_test_app_state().await;
    let router = build_router(state.clone());
    (state, router)
}

pub async fn signed_in(state: &AppState, handle: &str) -> (User, String) {
    let user = state
        .store
        .create_user(CreateUserRequest {
            email: format!("{handle}@example.com"),
            auth_id: format!("user_{handle}"),
            username: Some(handle.to_string()),
        })
        .await
        .unwrap();
    let token = mint_token(JWT_KEY, &user.auth_id, chrono::Duration::hours(1)).unwrap();
    (user, token)
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Id of a seeded system exercise; user 0 never exists, so only the system
/// catalog is visible.
pub async fn system_exercise_id(state: &AppState, name: &str) -> i64 {
    state
        .store
        .list_exercises(0, Some(name), Some(10))
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.name == name && e.is_system())
        .map(|e| e.id)
        .unwrap()
}
