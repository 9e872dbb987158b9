// Keycloak identity provider clients

use crate::core::errors::OrchestratorError;
use crate::core::resilience::{execute_with_cb, ProviderCircuitBreaker};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::error;

pub mod token_client;
pub mod user_client;

pub use token_client::KeycloakSecurityService;
pub use user_client::KeycloakUserService;

/// Create the pooled HTTP client shared by all Keycloak calls
pub fn build_http_client(timeout_secs: u64) -> Result<Client, OrchestratorError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(2)) // Fail fast on connection
        .tcp_nodelay(true)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| OrchestratorError::Configuration(format!(
            "Failed to create HTTP client: {}", e
        )))
}

/// Send a request to Keycloak behind the circuit breaker
///
/// Non-success statuses become `OrchestratorError::Rejected` carrying the
/// raw response body and the caller's error code.
pub(crate) async fn dispatch(
    cb: &ProviderCircuitBreaker,
    request: RequestBuilder,
    code: &'static str,
) -> Result<Response, OrchestratorError> {
    execute_with_cb(cb, || send(request, code)).await
}

/// Like `dispatch`, decoding the JSON body inside the breaker so that
/// garbage answers count as provider failures
pub(crate) async fn dispatch_json<T: DeserializeOwned>(
    cb: &ProviderCircuitBreaker,
    request: RequestBuilder,
    code: &'static str,
) -> Result<T, OrchestratorError> {
    execute_with_cb(cb, || async move {
        let response = send(request, code).await?;
        read_json(response).await
    })
    .await
}

async fn send(request: RequestBuilder, code: &'static str) -> Result<Response, OrchestratorError> {
    let response = request.send().await.map_err(transport_error)?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, code = code, "Error from Keycloak: {}", body);
        return Err(OrchestratorError::rejected(status.as_u16(), &body, code));
    }

    Ok(response)
}

fn transport_error(e: reqwest::Error) -> OrchestratorError {
    if e.is_timeout() {
        OrchestratorError::Upstream("Keycloak request timed out".to_string())
    } else if e.is_connect() {
        OrchestratorError::Upstream("Keycloak connection failed".to_string())
    } else {
        OrchestratorError::Upstream(format!("Keycloak request failed: {}", e))
    }
}

/// Decode a JSON body, treating garbage as an upstream failure
async fn read_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, OrchestratorError> {
    response.json::<T>().await.map_err(|e| {
        error!(error = %e, "Failed to parse Keycloak response");
        OrchestratorError::Upstream(format!("Failed to parse Keycloak response: {}", e))
    })
}
