//! # API REST
//!
//! HTTP surface of the reading application's server side.
//!
//! Handles:
//! - The authenticated forwarding endpoint under `/api/proxy`
//! - The visualisation relay and health check
//! - OpenAPI document, request tracing and CORS
//!
//! Token lookup goes through the `api-shared` session seam; configuration comes from `reader-core`.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod proxy;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use api_shared::{SessionAuthenticator, SessionCookie};
use reader_core::{
    config::{
        max_body_bytes_from_env_value, rest_addr_from_env_value, server_url_from_env_value,
        session_cookie_from_env_value,
    },
    ApiClient, ReaderApi, ReaderConfig, RequestContext, PROXY_MOUNT,
};

pub use error::{ErrorBody, ProxyError};

/// Shared state for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ReaderConfig>,
    /// Client used for forwarding; redirects are followed.
    pub http: reqwest::Client,
    pub sessions: Arc<dyn SessionAuthenticator>,
    /// Privileged reader API, used by the visualisation relay.
    pub reader: ReaderApi,
}

impl AppState {
    /// Build state around one shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the TLS backend cannot be initialised.
    pub fn new(
        cfg: Arc<ReaderConfig>,
        sessions: Arc<dyn SessionAuthenticator>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        let reader = ReaderApi::new(ApiClient::new(
            RequestContext::privileged(&cfg),
            http.clone(),
        ));
        Ok(Self {
            cfg,
            http,
            sessions,
            reader,
        })
    }

    /// State that reads the session token from the configured cookie.
    ///
    /// # Errors
    ///
    /// See [`AppState::new`].
    pub fn with_session_cookie(cfg: Arc<ReaderConfig>) -> Result<Self, reqwest::Error> {
        let sessions = Arc::new(SessionCookie::new(cfg.session_cookie()));
        Self::new(cfg, sessions)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let forward = get(proxy::forward)
        .post(proxy::forward)
        .put(proxy::forward)
        .delete(proxy::forward)
        .patch(proxy::forward);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/visualization", get(routes::visualization))
        .route(&format!("{PROXY_MOUNT}/*path"), forward)
        .route("/api-docs/openapi.json", get(routes::openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolve the server configuration from the process environment.
///
/// # Environment Variables
/// - `SERVER_URL`: Backend origin (default: [`reader_core::DEFAULT_SERVER_URL`])
/// - `READER_REST_ADDR`: Bind address (default: "0.0.0.0:3000")
/// - `READER_SESSION_COOKIE`: Session cookie name (default: "__session")
/// - `READER_PROXY_MAX_BODY_BYTES`: Largest request body relayed (default: 10 MiB)
///
/// # Errors
///
/// Returns an error if any variable is set to an invalid value.
pub fn config_from_env() -> anyhow::Result<ReaderConfig> {
    let server_url = server_url_from_env_value(std::env::var("SERVER_URL").ok())?;
    let rest_addr = rest_addr_from_env_value(std::env::var("READER_REST_ADDR").ok());
    let session_cookie =
        session_cookie_from_env_value(std::env::var("READER_SESSION_COOKIE").ok())?;
    let max_body_bytes =
        max_body_bytes_from_env_value(std::env::var("READER_PROXY_MAX_BODY_BYTES").ok())?;

    Ok(ReaderConfig::new(
        server_url,
        rest_addr,
        session_cookie,
        max_body_bytes,
    )?)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the address cannot be bound, or the
/// server fails while running.
pub async fn serve(cfg: ReaderConfig) -> anyhow::Result<()> {
    let cfg = Arc::new(cfg);
    let addr = cfg.rest_addr().to_owned();

    tracing::info!(
        "-- Starting Reader REST API on {} (backend {})",
        addr,
        cfg.server_url()
    );

    let app = router(AppState::with_session_cookie(cfg)?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Reader REST API shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
