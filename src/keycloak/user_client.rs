// Keycloak user operations: admin API registration and OIDC userinfo

use crate::api::UserService;
use crate::config::Config;
use crate::core::errors::{OrchestratorError, GET_INFO_ERROR, REGISTER_USER_ERROR};
use crate::core::models::{AuthRequest, KeycloakUserInfo, NewUser, TokenResponse, UserInfo};
use crate::core::resilience::ProviderCircuitBreaker;
use crate::keycloak::{dispatch, dispatch_json};
use crate::utils::request_validator::RequestValidator;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const ADMIN_TOKEN_KEY: &str = "admin";

/// User operations backed by a Keycloak realm
///
/// Registration authenticates against the admin API with a
/// client-credentials token, cached for `admin_token_cache_secs`.
pub struct KeycloakUserService {
    http_client: Client,
    token_endpoint: String,
    userinfo_endpoint: String,
    admin_users_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    admin_token: Cache<&'static str, Arc<SecretString>>,
    cb: Arc<ProviderCircuitBreaker>,
}

impl KeycloakUserService {
    pub fn new(config: &Config, http_client: Client, cb: Arc<ProviderCircuitBreaker>) -> Self {
        let admin_token = Cache::builder()
            .time_to_live(Duration::from_secs(config.admin_token_cache_secs))
            .max_capacity(1)
            .build();

        Self {
            http_client,
            token_endpoint: config.token_endpoint(),
            userinfo_endpoint: config.userinfo_endpoint(),
            admin_users_endpoint: config.admin_users_endpoint(),
            client_id: config.keycloak_client_id.clone(),
            client_secret: SecretString::new(config.keycloak_client_secret.expose_secret().clone()),
            admin_token,
            cb,
        }
    }

    /// Service account token for admin API calls
    async fn admin_token(&self) -> Result<Arc<SecretString>, OrchestratorError> {
        self.admin_token
            .try_get_with(ADMIN_TOKEN_KEY, self.fetch_admin_token())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_admin_token(&self) -> Result<Arc<SecretString>, OrchestratorError> {
        debug!("Requesting service account token");
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("grant_type", "client_credentials"),
        ];

        let request = self.http_client.post(&self.token_endpoint).form(&form);
        let token: TokenResponse = dispatch_json(&self.cb, request, REGISTER_USER_ERROR).await?;

        Ok(Arc::new(SecretString::new(token.access_token)))
    }

    async fn create_user(&self, request: &AuthRequest) -> Result<String, OrchestratorError> {
        let (email, password) = RequestValidator::validate_registration(request)?;
        let user = NewUser::new(request, email, password);
        let token = self.admin_token().await?;

        let create = self
            .http_client
            .post(&self.admin_users_endpoint)
            .bearer_auth(token.expose_secret())
            .json(&user);

        let response = dispatch(&self.cb, create, REGISTER_USER_ERROR).await;
        if let Err(OrchestratorError::Rejected { status: 401, .. }) = response {
            // Service token revoked or expired before the cache noticed
            self.admin_token.invalidate(ADMIN_TOKEN_KEY).await;
        }
        let response = response?;

        if response.status() != StatusCode::CREATED {
            return Err(OrchestratorError::Registration(format!(
                "Unexpected status {} from user creation",
                response.status()
            )));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| OrchestratorError::Registration(
                "Missing location header after user registration".to_string()
            ))?;

        user_id_from_location(location).ok_or_else(|| OrchestratorError::Registration(
            format!("Malformed location header '{}'", location)
        ))
    }
}

/// The user id is the last path segment of the `Location` header
pub fn user_id_from_location(location: &str) -> Option<String> {
    let id = location.rsplit('/').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[async_trait]
impl UserService for KeycloakUserService {
    async fn register(&self, request: &AuthRequest) -> Result<String, OrchestratorError> {
        debug!(email = ?request.email, "Attempting registration");

        match self.create_user(request).await {
            Ok(user_id) => {
                info!(user_id = %user_id, "Registration success");
                Ok(user_id)
            }
            Err(e) => {
                error!(error = %e, email = ?request.email, "Failed to register user");
                Err(match e {
                    OrchestratorError::Registration(cause) => OrchestratorError::Registration(cause),
                    other => OrchestratorError::Registration(other.to_string()),
                })
            }
        }
    }

    async fn get_info(&self, authorization: &str) -> Result<UserInfo, OrchestratorError> {
        let request = self
            .http_client
            .get(&self.userinfo_endpoint)
            .header(AUTHORIZATION, authorization);

        let info: KeycloakUserInfo = dispatch_json(&self.cb, request, GET_INFO_ERROR).await?;

        Ok(UserInfo::from(info))
    }
}
