// Unit tests for API response types

use auth_orchestrator::api::responses::*;
use auth_orchestrator::core::errors::*;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::common::{body_json, sample_auth_response};

#[test]
fn test_envelope_serialization() {
    let envelope = ResponseEnvelope::ok(sample_auth_response());
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["headers"], serde_json::json!({}));
    assert_eq!(value["statusCode"], "OK");
    assert_eq!(value["statusCodeValue"], 200);
    assert_eq!(value["body"]["access_token"], "access-token");
    assert_eq!(value["body"]["expires_in"], 300);
    assert_eq!(value["body"]["refresh_token"], "refresh-token");
    assert_eq!(value["body"]["token_type"], "Bearer");
}

#[test]
fn test_error_response_omits_missing_request_id() {
    let response = ErrorResponse {
        errors: vec![ErrorDetail {
            code: "O_LOGIN_ERROR".to_string(),
            message: "Error from Keycloak: {}".to_string(),
        }],
        request_id: None,
    };
    let value = serde_json::to_value(&response).unwrap();

    assert!(value.get("request_id").is_none());
    assert_eq!(value["errors"][0]["code"], "O_LOGIN_ERROR");
}

#[test]
fn test_api_error_from_rejection() {
    let err = OrchestratorError::rejected(401, r#"{"error":"invalid_grant"}"#, LOGIN_ERROR);
    let api_error = ApiError::from_orchestrator_error(err);

    assert_eq!(api_error.status, StatusCode::UNAUTHORIZED);
    assert_eq!(api_error.code, "O_LOGIN_ERROR");
    assert_eq!(api_error.message, r#"Error from Keycloak: {"error":"invalid_grant"}"#);
    assert!(api_error.request_id.is_none());
}

#[test]
fn test_api_error_hides_upstream_detail() {
    let err = OrchestratorError::Upstream("connection refused 10.0.0.3:8080".to_string());
    let api_error = ApiError::from_orchestrator_error_with_id(err, "req-1".to_string());

    assert_eq!(api_error.status, StatusCode::BAD_GATEWAY);
    assert_eq!(api_error.code, "O_UPSTREAM_ERROR");
    assert_eq!(api_error.message, "Service unavailable");
    assert_eq!(api_error.request_id.as_deref(), Some("req-1"));
}

#[tokio::test]
async fn test_api_error_into_response() {
    let api_error = ApiError::from_orchestrator_error_with_id(
        OrchestratorError::Registration("duplicate email".to_string()),
        "req-42".to_string(),
    );
    let response = api_error.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "O_REGISTER_USER_ERROR");
    assert_eq!(body["errors"][0]["message"], "Failed to register user");
    assert_eq!(body["request_id"], "req-42");
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "healthy".to_string(),
        identity_provider: "connected".to_string(),
    };
    let value = serde_json::to_value(&health).unwrap();

    assert_eq!(value["status"], "healthy");
    assert_eq!(value["identity_provider"], "connected");
}
