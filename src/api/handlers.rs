// Request handlers for API endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::responses::{ApiError, HealthResponse, ResponseEnvelope};
use crate::api::AppState;
use crate::core::errors::OrchestratorError;
use crate::core::models::{AuthRequest, AuthResponse, RefreshTokenRequest, UserInfo};

/// Extract request ID from headers or generate one
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Unwrap a JSON body, answering malformed input in the API error format
fn parse_body<T>(body: Result<Json<T>, JsonRejection>, request_id: &str) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        debug!(error = %rejection.body_text(), request_id = %request_id, "Malformed request body");
        ApiError::from_orchestrator_error_with_id(
            OrchestratorError::Validation(rejection.body_text()),
            request_id.to_string(),
        )
    })
}

/// POST /api/v1/auth/login
pub async fn login_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope<AuthResponse>>, ApiError> {
    let request_id = request_id(&headers);
    let request = parse_body(body, &request_id)?;

    let response = app_state
        .security_service
        .authenticate(&request)
        .await
        .map_err(|e| {
            warn!(error = %e, request_id = %request_id, "Login failed");
            ApiError::from_orchestrator_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(ResponseEnvelope::ok(response)))
}

/// POST /api/v1/auth/register
///
/// Answers 201 with `Location: /users/{id}` and an empty body.
pub async fn register_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = request_id(&headers);
    let request = parse_body(body, &request_id).map_err(|_| {
        ApiError::from_orchestrator_error_with_id(
            OrchestratorError::Registration("Malformed request body".to_string()),
            request_id.clone(),
        )
    })?;

    let user_id = app_state
        .user_service
        .register(&request)
        .await
        .map_err(|e| ApiError::from_orchestrator_error_with_id(e, request_id.clone()))?;

    info!(user_id = %user_id, request_id = %request_id, "User registered");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/users/{}", user_id))],
    ))
}

/// POST /api/v1/auth/refresh-token
pub async fn refresh_token_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope<AuthResponse>>, ApiError> {
    let request_id = request_id(&headers);
    let request = parse_body(body, &request_id)?;

    let response = app_state
        .security_service
        .refresh_token(&request)
        .await
        .map_err(|e| {
            warn!(error = %e, request_id = %request_id, "Token refresh failed");
            ApiError::from_orchestrator_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(ResponseEnvelope::ok(response)))
}

/// GET /api/v1/profile
///
/// The caller's `Authorization` header is forwarded to the userinfo endpoint.
pub async fn profile_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResponseEnvelope<UserInfo>>, ApiError> {
    let request_id = request_id(&headers);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::from_orchestrator_error_with_id(
                OrchestratorError::Unauthorized("Missing Authorization header".to_string()),
                request_id.clone(),
            )
        })?;

    let info = app_state
        .user_service
        .get_info(authorization)
        .await
        .map_err(|e| {
            warn!(error = %e, request_id = %request_id, "Profile lookup failed");
            ApiError::from_orchestrator_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(ResponseEnvelope::ok(info)))
}

/// Health check handler
///
/// GET /health
///
/// Always 200 while the process serves requests; the identity provider
/// state is reported, not enforced.
pub async fn health_handler(
    State(app_state): State<AppState>,
) -> Json<HealthResponse> {
    let identity_provider = match tokio::time::timeout(
        Duration::from_millis(800),
        app_state.security_service.ping(),
    )
    .await
    {
        Ok(Ok(())) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Identity provider ping failed");
            format!("unavailable: {}", e.user_message())
        }
        Err(_) => {
            debug!("Identity provider ping timed out in health check");
            "slow: timeout".to_string()
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        identity_provider,
    })
}
