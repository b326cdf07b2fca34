/// Main entry point for the Reader server
///
/// Loads `.env`, initialises tracing and serves the REST API: the authenticated forwarding
/// endpoint, the visualisation relay and the health check.
///
/// # Environment Variables
/// - `SERVER_URL`: Backend origin (default: "http://127.0.0.1:8000")
/// - `READER_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `READER_SESSION_COOKIE`: Cookie holding the session token (default: "__session")
/// - `READER_PROXY_MAX_BODY_BYTES`: Largest request body relayed (default: 10 MiB)
/// - `RUST_LOG`: Extra tracing directives
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reader_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = api_rest::config_from_env()?;
    api_rest::serve(cfg).await
}
