// Integration tests for registration and userinfo against a mock Keycloak

use auth_orchestrator::api::UserService;
use auth_orchestrator::config::Config;
use auth_orchestrator::core::errors::*;
use auth_orchestrator::core::models::AuthRequest;
use auth_orchestrator::core::resilience::create_circuit_breaker;
use auth_orchestrator::keycloak::{build_http_client, KeycloakUserService};
use mockito::{Matcher, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;

const TOKEN_PATH: &str = "/realms/test-realm/protocol/openid-connect/token";
const USERS_PATH: &str = "/admin/realms/test-realm/users";
const USERINFO_PATH: &str = "/realms/test-realm/protocol/openid-connect/userinfo";

fn service(server: &ServerGuard) -> KeycloakUserService {
    let config = Config::test_config(&server.url());
    let client = build_http_client(config.keycloak_timeout_secs).unwrap();
    KeycloakUserService::new(&config, client, Arc::new(create_circuit_breaker()))
}

fn registration(email: &str) -> AuthRequest {
    AuthRequest {
        email: Some(email.to_string()),
        password: Some(SecretString::new("secret".to_string())),
        first_name: Some("John".to_string()),
        last_name: Some("Doe".to_string()),
        ..Default::default()
    }
}

async fn mock_admin_token(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("POST", TOKEN_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            Matcher::UrlEncoded("client_id".into(), "test-client-id".into()),
            Matcher::UrlEncoded("client_secret".into(), "test-client-secret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"admin-token","expires_in":60,"token_type":"Bearer"}"#)
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_register_creates_user() {
    let mut server = Server::new_async().await;
    let token_mock = mock_admin_token(&mut server, 1).await;
    let location = format!("{}{}/1234-abcd", server.url(), USERS_PATH);
    let create_mock = server
        .mock("POST", USERS_PATH)
        .match_header("authorization", "Bearer admin-token")
        .match_body(Matcher::PartialJson(json!({
            "email": "john@test.com",
            "emailVerified": true,
            "enabled": true,
            "firstName": "John",
            "lastName": "Doe"
        })))
        .with_status(201)
        .with_header("location", &location)
        .create_async()
        .await;

    let user_id = service(&server)
        .register(&registration("john@test.com"))
        .await
        .unwrap();

    assert_eq!(user_id, "1234-abcd");
    token_mock.assert_async().await;
    create_mock.assert_async().await;
}

#[tokio::test]
async fn test_register_sends_permanent_password() {
    let mut server = Server::new_async().await;
    mock_admin_token(&mut server, 1).await;
    let create_mock = server
        .mock("POST", USERS_PATH)
        .match_body(Matcher::Regex(
            r#""credentials":\[\{"type":"password","value":"secret","temporary":false\}\]"#.to_string(),
        ))
        .with_status(201)
        .with_header("location", "/admin/realms/test-realm/users/42")
        .create_async()
        .await;

    let user_id = service(&server)
        .register(&registration("john@test.com"))
        .await
        .unwrap();

    assert_eq!(user_id, "42");
    create_mock.assert_async().await;
}

#[tokio::test]
async fn test_admin_token_is_cached() {
    let mut server = Server::new_async().await;
    let token_mock = mock_admin_token(&mut server, 1).await;
    server
        .mock("POST", USERS_PATH)
        .with_status(201)
        .with_header("location", "/admin/realms/test-realm/users/1")
        .expect(2)
        .create_async()
        .await;

    let service = service(&server);
    service.register(&registration("a@test.com")).await.unwrap();
    service.register(&registration("b@test.com")).await.unwrap();

    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_admin_token_is_dropped() {
    let mut server = Server::new_async().await;
    let token_mock = mock_admin_token(&mut server, 2).await;
    let create_mock = server
        .mock("POST", USERS_PATH)
        .with_status(401)
        .with_body(r#"{"error":"HTTP 401 Unauthorized"}"#)
        .expect(2)
        .create_async()
        .await;

    let service = service(&server);
    assert!(service.register(&registration("a@test.com")).await.is_err());
    assert!(service.register(&registration("a@test.com")).await.is_err());

    token_mock.assert_async().await;
    create_mock.assert_async().await;
}

#[tokio::test]
async fn test_register_conflict() {
    let mut server = Server::new_async().await;
    mock_admin_token(&mut server, 1).await;
    server
        .mock("POST", USERS_PATH)
        .with_status(409)
        .with_body(r#"{"errorMessage":"User exists with same email"}"#)
        .create_async()
        .await;

    let err = service(&server)
        .register(&registration("john@test.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Registration(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.error_code(), "O_REGISTER_USER_ERROR");
    assert_eq!(err.user_message(), "Failed to register user");
}

#[tokio::test]
async fn test_register_missing_location() {
    let mut server = Server::new_async().await;
    mock_admin_token(&mut server, 1).await;
    server
        .mock("POST", USERS_PATH)
        .with_status(201)
        .create_async()
        .await;

    let err = service(&server)
        .register(&registration("john@test.com"))
        .await
        .unwrap_err();

    match err {
        OrchestratorError::Registration(cause) => assert!(cause.contains("Missing location header")),
        other => panic!("Expected registration error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_admin_token_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", TOKEN_PATH)
        .with_status(401)
        .with_body(r#"{"error":"unauthorized_client"}"#)
        .create_async()
        .await;
    let create_mock = server
        .mock("POST", USERS_PATH)
        .expect(0)
        .create_async()
        .await;

    let err = service(&server)
        .register(&registration("john@test.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Registration(_)));
    create_mock.assert_async().await;
}

#[tokio::test]
async fn test_register_invalid_email_never_reaches_keycloak() {
    let mut server = Server::new_async().await;
    let token_mock = mock_admin_token(&mut server, 0).await;

    let err = service(&server)
        .register(&registration("not-an-email"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Registration(_)));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_get_info_maps_userinfo() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", USERINFO_PATH)
        .match_header("authorization", "Bearer user-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "sub": "f1b2c3d4",
                "email_verified": true,
                "name": "Example User",
                "preferred_username": "user",
                "given_name": "Example",
                "family_name": "User",
                "email": "example@keycloak.org"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let info = service(&server).get_info("Bearer user-token").await.unwrap();

    assert_eq!(info.email.as_deref(), Some("example@keycloak.org"));
    assert_eq!(info.first_name.as_deref(), Some("Example"));
    assert_eq!(info.last_name.as_deref(), Some("User"));
    assert_eq!(info.username.as_deref(), Some("Example User"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_info_rejected_token() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", USERINFO_PATH)
        .with_status(401)
        .with_body(r#"{"error":"invalid_token","error_description":"Token verification failed"}"#)
        .create_async()
        .await;

    let err = service(&server).get_info("Bearer stale").await.unwrap_err();

    assert_eq!(err.status_code(), 401);
    assert_eq!(err.error_code(), GET_INFO_ERROR);
    assert!(err.user_message().starts_with("Error from Keycloak: "));
}
