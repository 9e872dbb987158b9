// Unit tests for the router middleware stack

use auth_orchestrator::api::{create_router, AppState, Config};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::common::*;

fn app_with_config(config: Config) -> axum::Router {
    let state = AppState {
        security_service: Arc::new(MockSecurityService::default()),
        user_service: Arc::new(MockUserService::default()),
        config: Arc::new(config),
    };
    create_router(state, None)
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app_with_config(Config::test_config("http://localhost:8088"));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/auth/login")
        .header(header::ORIGIN, "http://frontend.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_header_on_simple_request() {
    let app = app_with_config(Config::test_config("http://localhost:8088"));

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://frontend.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_body_size_limit() {
    let mut config = Config::test_config("http://localhost:8088");
    config.body_size_limit_bytes = 64;
    let app = app_with_config(config);

    let payload = format!(
        r#"{{"username":"user","password":"{}"}}"#,
        "x".repeat(256)
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let mut config = Config::test_config("http://localhost:8088");
    config.request_timeout_secs = 1;
    let state = AppState {
        security_service: Arc::new(MockSecurityService {
            auth_delay: Some(Duration::from_secs(3)),
            ..Default::default()
        }),
        user_service: Arc::new(MockUserService::default()),
        config: Arc::new(config),
    };
    let app = create_router(state, None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"user","password":"password"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "O_TIMEOUT");
    assert_eq!(body["errors"][0]["message"], "Request timed out");
}
