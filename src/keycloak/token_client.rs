// OIDC token endpoint client: password and refresh grants

use crate::api::SecurityService;
use crate::config::Config;
use crate::core::errors::{OrchestratorError, LOGIN_ERROR, REFRESH_TOKEN_ERROR, UPSTREAM_ERROR};
use crate::core::models::{AuthRequest, AuthResponse, RefreshTokenRequest, TokenResponse};
use crate::core::resilience::ProviderCircuitBreaker;
use crate::keycloak::{dispatch, dispatch_json};
use crate::utils::request_validator::RequestValidator;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

/// Token operations backed by a Keycloak realm
pub struct KeycloakSecurityService {
    http_client: Client,
    token_endpoint: String,
    discovery_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    cb: Arc<ProviderCircuitBreaker>,
}

impl KeycloakSecurityService {
    pub fn new(config: &Config, http_client: Client, cb: Arc<ProviderCircuitBreaker>) -> Self {
        Self {
            http_client,
            token_endpoint: config.token_endpoint(),
            discovery_endpoint: format!("{}/.well-known/openid-configuration", config.keycloak_issuer_uri),
            client_id: config.keycloak_client_id.clone(),
            client_secret: SecretString::new(config.keycloak_client_secret.expose_secret().clone()),
            cb,
        }
    }

    /// POST a grant to the token endpoint
    async fn request_token(
        &self,
        grant: &[(&str, &str)],
        code: &'static str,
    ) -> Result<AuthResponse, OrchestratorError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
        ];
        form.extend_from_slice(grant);

        let request = self.http_client.post(&self.token_endpoint).form(&form);
        let token: TokenResponse = dispatch_json(&self.cb, request, code).await?;

        Ok(AuthResponse::from(token))
    }
}

#[async_trait]
impl SecurityService for KeycloakSecurityService {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, OrchestratorError> {
        let (username, password) = RequestValidator::validate_login(request)?;
        debug!(username = %username, "Attempting login");

        let response = self
            .request_token(
                &[
                    ("grant_type", "password"),
                    ("scope", "openid profile"),
                    ("username", username),
                    ("password", password),
                ],
                LOGIN_ERROR,
            )
            .await?;

        info!(username = %username, expires_in = response.expires_in, "Login succeeded");
        Ok(response)
    }

    async fn refresh_token(&self, request: &RefreshTokenRequest) -> Result<AuthResponse, OrchestratorError> {
        let refresh_token = RequestValidator::validate_refresh(request)?;

        let response = self
            .request_token(
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
                REFRESH_TOKEN_ERROR,
            )
            .await?;

        debug!(expires_in = response.expires_in, "Token refreshed");
        Ok(response)
    }

    async fn ping(&self) -> Result<(), OrchestratorError> {
        let request = self.http_client.get(&self.discovery_endpoint);
        dispatch(&self.cb, request, UPSTREAM_ERROR).await.map(|_| ())
    }
}
