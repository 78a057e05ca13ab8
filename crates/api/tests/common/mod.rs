//! Shared helpers for HTTP-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use biodata_api::auth::jwt::{generate_access_token, JwtConfig};
use biodata_api::background::expiry_sweep::SweepMonitor;
use biodata_api::config::ServerConfig;
use biodata_api::router::build_app_router;
use biodata_api::state::AppState;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        expiry_sweep_interval: Duration::from_secs(3600),
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sweep_monitor: Arc::new(SweepMonitor::new()),
    };
    build_app_router(state, &config)
}

/// Sign an access token the test app will accept.
pub fn token(role: &str, name: &str) -> String {
    generate_access_token(1, role, name, &test_config().jwt).unwrap()
}

pub fn admin_token() -> String {
    token("admin", "Asha Admin")
}

pub fn agent_token() -> String {
    token("agent", "Meera Agent")
}

/// Send a request through the router without a TCP listener.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, bearer: Option<&str>) -> Response {
    send(app, Method::GET, uri, bearer, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, bearer, Some(body)).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PATCH, uri, bearer, Some(body)).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, uri, bearer, Some(body)).await
}

pub async fn delete(app: Router, uri: &str, bearer: Option<&str>) -> Response {
    send(app, Method::DELETE, uri, bearer, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
