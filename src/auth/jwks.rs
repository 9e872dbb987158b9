// Realm signing keys (JWKS) with TTL caching

use crate::core::errors::OrchestratorError;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const JWKS_KEY: &str = "jwks";

/// Minimum spacing between forced refetches triggered by unknown key ids
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Moka-backed cache of the realm's JSON Web Key Set
///
/// A token signed with a key id missing from the cached set triggers one
/// refetch, which picks up rotated keys without waiting for the TTL.
pub struct JwksCache {
    http_client: Client,
    jwks_uri: String,
    cache: Cache<&'static str, Arc<JwkSet>>,
    last_forced_refresh: Mutex<Option<Instant>>,
}

impl JwksCache {
    pub fn new(http_client: Client, jwks_uri: String, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .max_capacity(1)
            .build();

        Self {
            http_client,
            jwks_uri,
            cache,
            last_forced_refresh: Mutex::new(None),
        }
    }

    /// Resolve the verification key for a key id
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, OrchestratorError> {
        let set = self.current().await?;
        if let Some(jwk) = set.find(kid) {
            return to_decoding_key(jwk);
        }

        if !self.may_force_refresh() {
            return Err(unknown_kid(kid));
        }

        debug!(kid = %kid, "Unknown key id, refetching JWKS");
        self.cache.invalidate(JWKS_KEY).await;
        let set = self.current().await?;
        match set.find(kid) {
            Some(jwk) => to_decoding_key(jwk),
            None => Err(unknown_kid(kid)),
        }
    }

    async fn current(&self) -> Result<Arc<JwkSet>, OrchestratorError> {
        self.cache
            .try_get_with(JWKS_KEY, self.fetch())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, OrchestratorError> {
        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, uri = %self.jwks_uri, "JWKS request failed");
                OrchestratorError::Upstream("JWKS request failed".to_string())
            })?;

        if !response.status().is_success() {
            error!(status = %response.status(), uri = %self.jwks_uri, "JWKS endpoint returned error");
            return Err(OrchestratorError::Upstream(format!(
                "JWKS endpoint returned HTTP {}",
                response.status()
            )));
        }

        let set: JwkSet = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse JWKS");
            OrchestratorError::Upstream("Failed to parse JWKS".to_string())
        })?;

        debug!(keys = set.keys.len(), "JWKS loaded");
        Ok(Arc::new(set))
    }

    fn may_force_refresh(&self) -> bool {
        let mut last = match self.last_forced_refresh.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < MIN_REFRESH_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

fn to_decoding_key(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, OrchestratorError> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        warn!(error = %e, "Unusable key in JWKS");
        OrchestratorError::Unauthorized(format!("Unusable signing key: {}", e))
    })
}

fn unknown_kid(kid: &str) -> OrchestratorError {
    OrchestratorError::Unauthorized(format!("Unknown signing key '{}'", kid))
}
