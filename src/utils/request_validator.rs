// Request body validation - fail fast before calling the identity provider

use crate::core::errors::OrchestratorError;
use crate::core::models::{AuthRequest, RefreshTokenRequest};

/// Validates incoming request bodies
pub struct RequestValidator;

impl RequestValidator {
    /// Login needs a principal and a password
    ///
    /// The principal is `username`, or `email` when no username is given.
    pub fn validate_login(request: &AuthRequest) -> Result<(&str, &str), OrchestratorError> {
        let username = non_blank(request.username.as_deref())
            .or_else(|| non_blank(request.email.as_deref()))
            .ok_or_else(|| OrchestratorError::Validation("username must not be blank".to_string()))?;

        let password = non_blank(request.password())
            .ok_or_else(|| OrchestratorError::Validation("password must not be blank".to_string()))?;

        Ok((username, password))
    }

    pub fn validate_refresh(request: &RefreshTokenRequest) -> Result<&str, OrchestratorError> {
        non_blank(request.refresh_token.as_deref())
            .ok_or_else(|| OrchestratorError::Validation("refresh_token must not be blank".to_string()))
    }

    /// Registration needs a well-formed email and a password
    pub fn validate_registration(request: &AuthRequest) -> Result<(&str, &str), OrchestratorError> {
        let email = non_blank(request.email.as_deref())
            .ok_or_else(|| OrchestratorError::Validation("email must not be blank".to_string()))?;

        if !is_email(email) {
            return Err(OrchestratorError::Validation(format!("'{}' is not a valid email", email)));
        }

        let password = non_blank(request.password())
            .ok_or_else(|| OrchestratorError::Validation("password must not be blank".to_string()))?;

        Ok((email, password))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
