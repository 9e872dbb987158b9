// Configuration management

use crate::core::errors::OrchestratorError;
use secrecy::SecretString;
use std::env;

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Keycloak configuration
    pub keycloak_server_url: String,
    pub keycloak_realm: String,
    pub keycloak_issuer_uri: String,
    pub keycloak_client_id: String,
    pub keycloak_client_secret: SecretString,
    pub keycloak_timeout_secs: u64,
    pub admin_token_cache_secs: u64,

    // Resource server configuration (bearer tokens)
    pub jwk_set_uri: Option<String>,
    pub jwt_expected_issuer: Option<String>,
    pub jwks_cache_ttl_secs: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, OrchestratorError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // File may not exist
        }

        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, OrchestratorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = trim_url(&get_or_default(&lookup, "KEYCLOAK_SERVER_URL", "http://localhost:8088"));
        let realm = get_or_default(&lookup, "KEYCLOAK_REALM", "orchestrator-realm");
        let issuer_uri = get_optional(&lookup, "KEYCLOAK_ISSUER_URI")
            .map(|uri| trim_url(&uri))
            .unwrap_or_else(|| format!("{}/realms/{}", server_url, realm));

        let config = Self {
            bind_address: get_or_default(&lookup, "BIND_ADDRESS", "0.0.0.0"),
            port: parse_port(&lookup)?,
            keycloak_server_url: server_url,
            keycloak_realm: realm,
            keycloak_issuer_uri: issuer_uri,
            keycloak_client_id: get_required(&lookup, "KEYCLOAK_CLIENT_ID")?,
            keycloak_client_secret: SecretString::new(get_required(&lookup, "KEYCLOAK_CLIENT_SECRET")?),
            keycloak_timeout_secs: parse_or_default(&lookup, "KEYCLOAK_TIMEOUT_SECS", 5)?,
            admin_token_cache_secs: parse_or_default(&lookup, "ADMIN_TOKEN_CACHE_SECS", 60)?,
            jwk_set_uri: get_optional(&lookup, "JWK_SET_URI").map(|uri| trim_url(&uri)),
            jwt_expected_issuer: get_optional(&lookup, "JWT_EXPECTED_ISSUER").map(|uri| trim_url(&uri)),
            jwks_cache_ttl_secs: parse_or_default(&lookup, "JWKS_CACHE_TTL_SECS", 300)?,
            request_timeout_secs: parse_or_default(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: parse_or_default(&lookup, "BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: get_or_default(&lookup, "LOG_LEVEL", "info"),
            log_format: get_or_default(&lookup, "LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    /// OIDC token endpoint of the realm
    pub fn token_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.keycloak_issuer_uri)
    }

    /// OIDC userinfo endpoint of the realm
    pub fn userinfo_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/userinfo", self.keycloak_issuer_uri)
    }

    /// Admin REST endpoint for user creation
    pub fn admin_users_endpoint(&self) -> String {
        format!("{}/admin/realms/{}/users", self.keycloak_server_url, self.keycloak_realm)
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), OrchestratorError> {
        validate_url(&self.keycloak_server_url, "KEYCLOAK_SERVER_URL")?;
        validate_url(&self.keycloak_issuer_uri, "KEYCLOAK_ISSUER_URI")?;
        if let Some(ref uri) = self.jwk_set_uri {
            validate_url(uri, "JWK_SET_URI")?;
        }

        if self.keycloak_realm.trim().is_empty() {
            return Err(OrchestratorError::Configuration("KEYCLOAK_REALM is empty".to_string()));
        }

        validate_log_level(&self.log_level)?;
        validate_log_format(&self.log_format)?;

        Ok(())
    }
}

impl Config {
    /// Create a test configuration pointing at the given Keycloak base URL
    ///
    /// Bypasses environment loading. Security is disabled unless the caller
    /// sets `jwk_set_uri`.
    pub fn test_config(keycloak_url: &str) -> Self {
        let server = trim_url(keycloak_url);
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            keycloak_issuer_uri: format!("{}/realms/test-realm", server),
            keycloak_server_url: server,
            keycloak_realm: "test-realm".to_string(),
            keycloak_client_id: "test-client-id".to_string(),
            keycloak_client_secret: SecretString::new("test-client-secret".to_string()),
            keycloak_timeout_secs: 5,
            admin_token_cache_secs: 60,
            jwk_set_uri: None,
            jwt_expected_issuer: None,
            jwks_cache_ttl_secs: 300,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Get value or return default
fn get_or_default<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Get optional value, treating empty strings as unset
fn get_optional<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn get_required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<String, OrchestratorError> {
    match lookup(key) {
        None => Err(OrchestratorError::Configuration(format!("{} not set", key))),
        Some(value) if value.trim().is_empty() => {
            Err(OrchestratorError::Configuration(format!("{} is empty", key)))
        }
        Some(value) => Ok(value),
    }
}

/// Parse port from PORT
fn parse_port<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<u16, OrchestratorError> {
    let port_str = get_or_default(lookup, "PORT", "8080");
    let port = port_str.parse::<u16>()
        .map_err(|e| OrchestratorError::Configuration(
            format!("Invalid PORT value '{}': {}", port_str, e)
        ))?;

    if port == 0 {
        return Err(OrchestratorError::Configuration(
            "PORT must be between 1 and 65535".to_string()
        ));
    }

    Ok(port)
}

/// Parse a positive number or return default
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, OrchestratorError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    match get_optional(lookup, key) {
        Some(value) => {
            let parsed = value.trim().parse::<T>()
                .map_err(|e| OrchestratorError::Configuration(
                    format!("Invalid {} value '{}': {}", key, value, e)
                ))?;

            if parsed == T::default() {
                return Err(OrchestratorError::Configuration(
                    format!("{} must be greater than 0", key)
                ));
            }

            Ok(parsed)
        }
        None => Ok(default),
    }
}

fn validate_url(url: &str, key: &str) -> Result<(), OrchestratorError> {
    url::Url::parse(url)
        .map_err(|e| OrchestratorError::Configuration(
            format!("Invalid {} '{}': {}", key, url, e)
        ))?;
    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), OrchestratorError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&level.to_lowercase().as_str()) {
        return Err(OrchestratorError::Configuration(
            format!("Invalid LOG_LEVEL '{}': must be one of {}", level, valid_levels.join(", "))
        ));
    }
    Ok(())
}

fn validate_log_format(format: &str) -> Result<(), OrchestratorError> {
    if format != "json" && format != "text" {
        return Err(OrchestratorError::Configuration(
            format!("Invalid LOG_FORMAT '{}': must be 'json' or 'text'", format)
        ));
    }
    Ok(())
}
