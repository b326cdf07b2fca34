use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use api_shared::AuthError;
use reader_core::ApiError;

/// Body returned for every relay failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Anything that can go wrong while relaying a request upstream.
///
/// Every variant maps to the same opaque 500 response; the detail only goes to the log.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to resolve session token: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("path {0:?} contains a dot segment")]
    DotSegment(String),
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("upstream call failed: {0}")]
    Api(#[from] ApiError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!("Proxy error: {:?}", self);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: "Internal Server Error".into(),
            }),
        )
            .into_response()
    }
}
