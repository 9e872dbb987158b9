// Response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Success wrapper for token and profile responses
///
/// Clients read the payload under `body`, e.g. `$.body.access_token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: T,
    pub status_code: String,
    pub status_code_value: u16,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(body: T) -> Self {
        Self {
            headers: BTreeMap::new(),
            body,
            status_code: "OK".to_string(),
            status_code_value: StatusCode::OK.as_u16(),
        }
    }
}

/// Single error entry
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub identity_provider: String,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, code: &str, message: String) -> Self {
        Self {
            status,
            code: code.to_string(),
            message,
            request_id: None,
        }
    }

    /// Create from OrchestratorError
    pub fn from_orchestrator_error(err: crate::core::errors::OrchestratorError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            code: err.error_code().to_string(),
            message: err.user_message(),
            request_id: None,
        }
    }

    /// Create from OrchestratorError with request ID
    pub fn from_orchestrator_error_with_id(
        err: crate::core::errors::OrchestratorError,
        request_id: String,
    ) -> Self {
        Self {
            request_id: Some(request_id),
            ..Self::from_orchestrator_error(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            errors: vec![ErrorDetail {
                code: self.code,
                message: self.message,
            }],
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<crate::core::errors::OrchestratorError> for ApiError {
    fn from(err: crate::core::errors::OrchestratorError) -> Self {
        ApiError::from_orchestrator_error(err)
    }
}
