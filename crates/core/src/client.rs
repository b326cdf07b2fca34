//! Schema-validated fetch client for the backend API.
//!
//! Every call issues exactly one upstream request and classifies the outcome as either a typed
//! payload or an [`ApiError`]. There is no caching, no retry and no timeout beyond the
//! transport's defaults.
//!
//! Where a request goes depends on the injected [`RequestContext`]:
//!
//! ```text
//! Privileged    GET /flavours  ->  {SERVER_URL}/flavours            + Authorization: Bearer <token>
//! Unprivileged  GET /flavours  ->  {frontend}/api/proxy/flavours    (no Authorization)
//! ```
//!
//! Only the privileged context ever asks the [`TokenProvider`] for a token. Unprivileged callers
//! rely on the forwarding endpoint to attach it.

use api_shared::auth::authorization_header;
use api_shared::TokenProvider;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;
use url::Url;

use crate::constants::PROXY_MOUNT;
use crate::{ApiError, ApiResult, ConfigResult, ReaderConfig};

/// The execution context a call is made from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestContext {
    /// Trusted server-side code: talks to the backend directly and attaches the bearer token.
    Privileged { backend: Url },
    /// Untrusted client-side code: goes through the forwarding endpoint and never sees a token.
    Unprivileged { proxy_base: Url },
}

impl RequestContext {
    /// Privileged context targeting the configured backend origin.
    pub fn privileged(cfg: &ReaderConfig) -> Self {
        RequestContext::Privileged {
            backend: cfg.server_url().clone(),
        }
    }

    /// Unprivileged context routed through the forwarding endpoint served at `frontend_origin`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ConfigError`] if the origin cannot be combined with the proxy mount.
    pub fn unprivileged(frontend_origin: &Url) -> ConfigResult<Self> {
        let proxy_base = Url::parse(&format!(
            "{}{}",
            frontend_origin.as_str().trim_end_matches('/'),
            PROXY_MOUNT
        ))?;
        Ok(RequestContext::Unprivileged { proxy_base })
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, RequestContext::Privileged { .. })
    }

    /// Resolve a backend-relative `path` (which must start with `/`) to the URL to call.
    ///
    /// The path, including any query string, is appended verbatim to the base.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidPath`] if `path` does not start with `/`, or
    /// [`ApiError::Url`] if the combined URL does not parse.
    pub fn target(&self, path: &str) -> ApiResult<Url> {
        if !path.starts_with('/') {
            return Err(ApiError::InvalidPath(path.to_owned()));
        }

        let base = match self {
            RequestContext::Privileged { backend } => backend,
            RequestContext::Unprivileged { proxy_base } => proxy_base,
        };

        Ok(Url::parse(&format!(
            "{}{}",
            base.as_str().trim_end_matches('/'),
            path
        ))?)
    }
}

/// HTTP client bound to one [`RequestContext`].
///
/// Cheap to clone: the underlying `reqwest::Client` is a pooled handle.
#[derive(Clone, Debug)]
pub struct ApiClient {
    context: RequestContext,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(context: RequestContext, http: reqwest::Client) -> Self {
        Self { context, http }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Issue a request and return the raw response without looking at its status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidPath`] or [`ApiError::Url`] for a bad path and
    /// [`ApiError::Transport`] if the request could not be sent.
    pub async fn fetch(
        &self,
        method: Method,
        path: &str,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<Response> {
        self.send(method, path, None, tokens).await
    }

    /// `GET path` and validate the JSON body as `T`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] if the status is outside 200–299,
    /// - [`ApiError::Schema`] if the JSON does not match `T`,
    /// - [`ApiError::Decode`] if the body is not JSON at all,
    /// - [`ApiError::Transport`] on network failure.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<T> {
        let response = self.send(Method::GET, path, None, tokens).await?;
        decode(ensure_success(response).await?).await
    }

    /// `POST path` with a JSON body and validate the JSON response as `T`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::get`], plus [`ApiError::Serialization`] if `body` cannot be serialized.
    pub async fn post<B, T>(&self, path: &str, body: &B, tokens: &dyn TokenProvider) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        let response = self.send(Method::POST, path, Some(body), tokens).await?;
        decode(ensure_success(response).await?).await
    }

    /// `POST path` without a response schema. The raw JSON is returned unvalidated; an empty
    /// body is returned as `Value::Null`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::post`], except that no [`ApiError::Schema`] is ever raised.
    pub async fn post_unvalidated<B>(
        &self,
        path: &str,
        body: &B,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        let response = self.send(Method::POST, path, Some(body), tokens).await?;
        decode_unvalidated(ensure_success(response).await?).await
    }

    /// `DELETE path` and validate the JSON response as `T`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::get`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<T> {
        let response = self.send(Method::DELETE, path, None, tokens).await?;
        decode(ensure_success(response).await?).await
    }

    /// `DELETE path` without a response schema.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::post_unvalidated`].
    pub async fn delete_unvalidated(
        &self,
        path: &str,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<serde_json::Value> {
        let response = self.send(Method::DELETE, path, None, tokens).await?;
        decode_unvalidated(ensure_success(response).await?).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<Response> {
        let url = self.context.target(path)?;
        let mut headers = self.auth_headers(tokens).await;

        tracing::debug!(%method, %url, privileged = self.context.is_privileged(), "api request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request = request.body(body);
        }

        Ok(request.headers(headers).send().await?)
    }

    async fn auth_headers(&self, tokens: &dyn TokenProvider) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.context.is_privileged() {
            return headers;
        }

        // A failed lookup degrades to an anonymous request.
        match tokens.token().await {
            Ok(Some(token)) => match authorization_header(&token) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => tracing::warn!(error = %e, "unusable bearer token, sending anonymously"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "token lookup failed, sending anonymously"),
        }

        headers
    }
}

/// Pass through 2xx responses and turn anything else into [`ApiError::Http`].
pub(crate) async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Http { status, body })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    parse_validated(&bytes)
}

async fn decode_unvalidated(response: Response) -> ApiResult<serde_json::Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}

/// Parse `bytes` as JSON and validate it against `T`.
///
/// Uses `serde_path_to_error` so a shape mismatch reports the failing field (e.g.
/// `content[3].rating`). Malformed JSON is reported as [`ApiError::Decode`] instead, and no
/// partial value is ever returned.
///
/// # Errors
///
/// Returns [`ApiError::Schema`] or [`ApiError::Decode`].
pub fn parse_validated<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);

    let value = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => value,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            if source.classify() != Category::Data {
                return Err(ApiError::Decode(source));
            }
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            return Err(ApiError::Schema {
                path,
                message: source.to_string(),
            });
        }
    };

    deserializer.end().map_err(ApiError::Decode)?;
    Ok(value)
}
