// Axum web server layer

use axum::{Router, extract::Request, error_handling::HandleErrorLayer, http::StatusCode, BoxError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower::ServiceBuilder;

pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::core::errors::{OrchestratorError, INTERNAL_ERROR, TIMEOUT_ERROR};
use crate::core::models::{AuthRequest, AuthResponse, RefreshTokenRequest, UserInfo};

pub use crate::config::Config;

pub const AUTH_REST_URL: &str = "/api/v1/auth";
pub const PROFILE_REST_URL: &str = "/api/v1/profile";

/// Application state containing all shared dependencies
///
/// Components must be Send + Sync for thread safety.
#[derive(Clone)]
pub struct AppState {
    pub security_service: Arc<dyn SecurityService + Send + Sync>,
    pub user_service: Arc<dyn UserService + Send + Sync>,
    pub config: Arc<Config>,
}

/// Token operations against the identity provider
#[async_trait::async_trait]
pub trait SecurityService: Send + Sync {
    /// Exchange user credentials for tokens (password grant)
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, OrchestratorError>;

    /// Exchange a refresh token for a new token pair
    async fn refresh_token(&self, request: &RefreshTokenRequest) -> Result<AuthResponse, OrchestratorError>;

    /// Check that the identity provider answers
    async fn ping(&self) -> Result<(), OrchestratorError>;
}

/// User management operations against the identity provider
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Create a user, returning its identifier
    async fn register(&self, request: &AuthRequest) -> Result<String, OrchestratorError>;

    /// Fetch the profile behind the given `Authorization` header value
    async fn get_info(&self, authorization: &str) -> Result<UserInfo, OrchestratorError>;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - CORS
/// - Tracing (tower-http::trace)
/// - Request timeout (tower::timeout), 408 on expiry
/// - Body size limit (tower-http::limit)
/// - Bearer token validation on protected routes, when `auth_state` is set
///
/// `/health` and `/api/v1/auth/*` never require a token.
pub fn create_router(
    app_state: AppState,
    auth_state: Option<Arc<crate::auth::jwt_middleware::JwtAuthState>>,
) -> Router {
    use axum::{middleware::Next, extract::State};
    use axum::routing::{get, post};

    let mut router = Router::<AppState>::new()
        .route(&format!("{}/login", AUTH_REST_URL), post(handlers::login_handler))
        .route(&format!("{}/register", AUTH_REST_URL), post(handlers::register_handler))
        .route(&format!("{}/refresh-token", AUTH_REST_URL), post(handlers::refresh_token_handler))
        .route(PROFILE_REST_URL, get(handlers::profile_handler))
        .route("/health", get(handlers::health_handler));

    if let Some(auth_state) = auth_state {
        router = router.route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            |state: State<Arc<crate::auth::jwt_middleware::JwtAuthState>>,
             request: Request,
             next: Next| async move {
                if is_public_path(request.uri().path()) {
                    return Ok(next.run(request).await);
                }

                crate::auth::jwt_middleware::jwt_auth_middleware(state, request, next).await
            },
        ));
    }

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    router = router.layer(RequestBodyLimitLayer::new(body_limit));

    // HandleErrorLayer must come before the timeout to catch its error
    let timeout_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            if e.is::<tower::timeout::error::Elapsed>() {
                responses::ApiError::new(
                    StatusCode::REQUEST_TIMEOUT,
                    TIMEOUT_ERROR,
                    "Request timed out".to_string(),
                )
            } else {
                responses::ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR,
                    "Internal error".to_string(),
                )
            }
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router
        .layer(timeout_stack)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer())
        .with_state(app_state)
}

/// Routes reachable without a bearer token
pub fn is_public_path(path: &str) -> bool {
    path == "/health" || path.starts_with(&format!("{}/", AUTH_REST_URL))
}
