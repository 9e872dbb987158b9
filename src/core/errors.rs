// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    /// Request body failed validation (HTTP 400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identity provider answered with an error status
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        code: &'static str,
    },

    /// User registration failed (HTTP 400)
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Missing or invalid bearer token (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity provider unreachable or returned garbage (HTTP 502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub const VALIDATION_ERROR: &str = "O_VALIDATION_ERROR";
pub const LOGIN_ERROR: &str = "O_LOGIN_ERROR";
pub const REFRESH_TOKEN_ERROR: &str = "O_REFRESH_TOKEN_ERROR";
pub const GET_INFO_ERROR: &str = "O_GET_INFO_ERROR";
pub const REGISTER_USER_ERROR: &str = "O_REGISTER_USER_ERROR";
pub const UNAUTHORIZED_ERROR: &str = "O_UNAUTHORIZED";
pub const UPSTREAM_ERROR: &str = "O_UPSTREAM_ERROR";
pub const INTERNAL_ERROR: &str = "O_INTERNAL_ERROR";
pub const TIMEOUT_ERROR: &str = "O_TIMEOUT";

impl OrchestratorError {
    /// Build a rejection from an identity provider error body
    pub fn rejected(status: u16, body: &str, code: &'static str) -> Self {
        OrchestratorError::Rejected {
            status,
            message: format!("Error from Keycloak: {}", body),
            code,
        }
    }

    /// Get HTTP status code for this error
    ///
    /// Upstream 4xx statuses pass through; anything else the identity
    /// provider fails with surfaces as a bad gateway.
    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::Validation(_) => 400,
            OrchestratorError::Rejected { status, .. } if (400..500).contains(status) => *status,
            OrchestratorError::Rejected { .. } => 502,
            OrchestratorError::Registration(_) => 400,
            OrchestratorError::Unauthorized(_) => 401,
            OrchestratorError::Upstream(_) => 502,
            OrchestratorError::Configuration(_) => 500,
        }
    }

    /// Machine-readable error code returned to clients
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => VALIDATION_ERROR,
            OrchestratorError::Rejected { code, .. } => *code,
            OrchestratorError::Registration(_) => REGISTER_USER_ERROR,
            OrchestratorError::Unauthorized(_) => UNAUTHORIZED_ERROR,
            OrchestratorError::Upstream(_) => UPSTREAM_ERROR,
            OrchestratorError::Configuration(_) => INTERNAL_ERROR,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::Validation(msg) => msg.clone(),
            OrchestratorError::Rejected { message, .. } => message.clone(),
            OrchestratorError::Registration(_) => "Failed to register user".to_string(),
            OrchestratorError::Unauthorized(_) => "Invalid access token".to_string(),
            OrchestratorError::Upstream(_) => "Service unavailable".to_string(),
            OrchestratorError::Configuration(_) => "Internal error".to_string(),
        }
    }

    /// Whether this error means the identity provider itself is failing.
    /// Only these count against the circuit breaker.
    pub fn is_upstream_failure(&self) -> bool {
        match self {
            OrchestratorError::Upstream(_) => true,
            OrchestratorError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
