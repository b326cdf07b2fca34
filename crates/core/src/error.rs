use crate::constants::ONBOARDING_REQUIRED_STATUS;

/// Errors raised while resolving startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Outcome classification of a fetch-client call.
///
/// `Http` and `Schema` are separate kinds: the first is a failed request, the
/// second means the backend answered successfully with a shape the caller did not declare.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API path {0:?}: must start with '/'")]
    InvalidPath(String),
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to serialize request body: {0}")]
    Serialization(serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}")]
    Http { status: u16, body: String },
    #[error("response does not match schema at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(serde_json::Error),
}

impl ApiError {
    /// The upstream status code, for [`ApiError::Http`] only.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the backend refused the request because onboarding is incomplete.
    pub fn requires_onboarding(&self) -> bool {
        self.status() == Some(ONBOARDING_REQUIRED_STATUS)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ApiError::Schema { .. })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
