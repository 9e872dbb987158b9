// Request/response types and identity provider wire formats

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Login and registration request body
///
/// The same shape serves both endpoints: login reads `username`/`password`,
/// registration reads `email`, `password` and the optional names.
#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl AuthRequest {
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret().as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Tokens handed back to clients after login or refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub token_type: String,
}

/// Profile of the authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// OIDC token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl From<TokenResponse> for AuthResponse {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            expires_in: token.expires_in,
            refresh_token: token.refresh_token.unwrap_or_default(),
            token_type: token.token_type,
        }
    }
}

/// OIDC userinfo endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakUserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl From<KeycloakUserInfo> for UserInfo {
    fn from(info: KeycloakUserInfo) -> Self {
        Self {
            email: info.email,
            first_name: info.given_name,
            last_name: info.family_name,
            username: info.name.or(info.preferred_username),
        }
    }
}

/// Credential attached to a new Keycloak user
#[derive(Debug, Serialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(serialize_with = "serialize_secret")]
    pub value: SecretString,
    pub temporary: bool,
}

/// Plaintext on the wire only; `Debug` stays redacted
fn serialize_secret<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.expose_secret())
}

/// Keycloak admin API user representation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub credentials: Vec<Credential>,
}

impl NewUser {
    /// Build an enabled, verified user with a permanent password
    pub fn new(request: &AuthRequest, email: &str, password: &str) -> Self {
        Self {
            username: request.username.clone(),
            email: email.to_string(),
            email_verified: true,
            enabled: true,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            credentials: vec![Credential {
                kind: "password",
                value: SecretString::new(password.to_string()),
                temporary: false,
            }],
        }
    }
}

/// Claims extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: u64,
}
