// Axum bearer token middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::responses::ApiError;
use crate::auth::jwks::JwksCache;
use crate::core::errors::OrchestratorError;
use crate::core::models::AccessClaims;

/// Authentication state containing all dependencies
pub struct JwtAuthState {
    pub jwks: Arc<JwksCache>,
    pub expected_issuer: Option<String>,
}

impl JwtAuthState {
    pub fn new(jwks: Arc<JwksCache>, expected_issuer: Option<String>) -> Self {
        Self { jwks, expected_issuer }
    }

    /// Verify signature and time claims (`exp`, `nbf`) of an access token
    ///
    /// Only asymmetric algorithms are accepted: keys come from a public JWKS.
    /// The audience is not checked; the issuer only when configured.
    pub async fn validate(&self, token: &str) -> Result<AccessClaims, OrchestratorError> {
        let header = decode_header(token)
            .map_err(|e| OrchestratorError::Unauthorized(format!("Malformed token: {}", e)))?;

        if !is_asymmetric(header.alg) {
            return Err(OrchestratorError::Unauthorized(format!(
                "Unsupported algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| OrchestratorError::Unauthorized("Token has no key id".to_string()))?;
        let key = self.jwks.decoding_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        if let Some(ref issuer) = self.expected_issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| OrchestratorError::Unauthorized(format!("Token rejected: {}", e)))
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::EdDSA
    )
}

/// Authentication middleware function
///
/// Validates the bearer token and stores its claims in request extensions.
pub async fn jwt_auth_middleware(
    State(auth_state): State<Arc<JwtAuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).ok_or_else(|| {
        debug!(path = %request.uri().path(), "Missing bearer token");
        ApiError::from(OrchestratorError::Unauthorized("Missing bearer token".to_string()))
    })?;

    let claims = match auth_state.validate(&token).await {
        Ok(claims) => claims,
        Err(OrchestratorError::Upstream(detail)) => {
            // Keys unavailable: cannot tell valid tokens from forged ones
            warn!(error = %detail, "JWKS unavailable, rejecting request");
            return Err(ApiError::from(OrchestratorError::Upstream(detail)));
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %request.uri().path(),
                user_agent = ?extract_user_agent(request.headers()),
                "Bearer token rejected"
            );
            return Err(ApiError::from(e));
        }
    };

    debug!(sub = ?claims.sub, "Bearer token accepted");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
