// Main entry point for the auth orchestrator

use auth_orchestrator::api::{create_router, AppState};
use auth_orchestrator::auth::jwks::JwksCache;
use auth_orchestrator::auth::jwt_middleware::JwtAuthState;
use auth_orchestrator::config::Config;
use auth_orchestrator::core::resilience::create_circuit_breaker;
use auth_orchestrator::keycloak::{build_http_client, KeycloakSecurityService, KeycloakUserService};

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber, only once
    init_tracing(&config)?;

    info!("Starting auth orchestrator");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        issuer = %config.keycloak_issuer_uri,
        realm = %config.keycloak_realm,
        "Configuration loaded"
    );

    // 3. Shared Keycloak plumbing
    let http_client = build_http_client(config.keycloak_timeout_secs)?;
    let circuit_breaker = Arc::new(create_circuit_breaker());

    let security_service = Arc::new(KeycloakSecurityService::new(
        &config,
        http_client.clone(),
        circuit_breaker.clone(),
    ));
    let user_service = Arc::new(KeycloakUserService::new(
        &config,
        http_client.clone(),
        circuit_breaker,
    ));

    info!("Keycloak clients initialized");

    // 4. Bearer token validation, only with a JWKS endpoint
    let auth_state = match config.jwk_set_uri {
        Some(ref jwks_uri) => {
            let jwks = Arc::new(JwksCache::new(
                http_client,
                jwks_uri.clone(),
                config.jwks_cache_ttl_secs,
            ));
            info!(jwks_uri = %jwks_uri, "Bearer token validation enabled");
            Some(Arc::new(JwtAuthState::new(jwks, config.jwt_expected_issuer.clone())))
        }
        None => {
            warn!("JWK_SET_URI not set, protected routes accept any caller");
            None
        }
    };

    // 5. Create router
    let app_state = AppState {
        security_service,
        user_service,
        config: Arc::new(config.clone()),
    };
    let router = create_router(app_state, auth_state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
