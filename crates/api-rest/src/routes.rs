use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use reqwest::Method;
use utoipa::OpenApi;

use api_shared::{HealthRes, HealthService, StaticToken};

use crate::error::{ErrorBody, ProxyError};
use crate::{proxy, AppState};

#[derive(OpenApi)]
#[openapi(
    paths(health, visualization, proxy_doc),
    components(schemas(HealthRes, ErrorBody))
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint
///
/// # Returns
/// * `Json<HealthRes>` - Always `ok: true` while the server is accepting requests
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/visualization",
    responses(
        (status = 200, description = "Embeddings visualisation page (HTML)", body = String, content_type = "text/html"),
        (status = 500, description = "Relay failed", body = ErrorBody)
    )
)]
/// Fetch the backend's visualisation page with the caller's session token.
///
/// The backend response is relayed unchanged, including non-2xx statuses.
#[axum::debug_handler]
pub async fn visualization(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match relay_visualization(&state, &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn relay_visualization(state: &AppState, headers: &HeaderMap) -> Result<Response, ProxyError> {
    let tokens = StaticToken::from(state.sessions.resolve(headers).await?);
    let response = state
        .reader
        .client()
        .fetch(Method::GET, "/visualization", &tokens)
        .await?;
    proxy::relay_response(response).await
}

/// Documentation anchor for the forwarding endpoint; the route itself is served by
/// [`proxy::forward`] for GET, POST, PUT, DELETE and PATCH.
#[utoipa::path(
    get,
    path = "/api/proxy/{path}",
    params(("path" = String, Path, description = "Backend path, forwarded with the query string")),
    responses(
        (status = 200, description = "Backend response, relayed verbatim"),
        (status = 500, description = "Relay failed", body = ErrorBody)
    )
)]
#[allow(dead_code)]
async fn proxy_doc() {}

/// Serve the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
