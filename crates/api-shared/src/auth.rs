//! Seams to the external authentication provider.
//!
//! Two shapes of token lookup exist:
//! - [`TokenProvider`]: a privileged caller asks for "the current token" (server-side code that
//!   already knows who it is acting for).
//! - [`SessionAuthenticator`]: the forwarding endpoint derives the token from an incoming
//!   request's session.
//!
//! A missing token is not an error. It means the request is anonymous.

use async_trait::async_trait;
use http::{header, HeaderMap, HeaderValue};
use reader_types::BearerToken;

/// Errors raised while resolving a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Supplies the bearer token for an outbound privileged call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, `Ok(None)` for an anonymous caller.
    async fn token(&self) -> Result<Option<BearerToken>, AuthError>;
}

/// Resolves the bearer token belonging to the session of an incoming request.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// Returns the caller's token, `Ok(None)` when the request carries no session.
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<BearerToken>, AuthError>;
}

/// A token provider that always yields the same (possibly absent) token.
///
/// Used by the CLI, and by the server once it has resolved the caller's session token.
#[derive(Clone, Debug, Default)]
pub struct StaticToken(Option<BearerToken>);

impl StaticToken {
    pub fn new(token: BearerToken) -> Self {
        Self(Some(token))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    /// Build from an optional raw value, typically an environment variable.
    ///
    /// Blank values are treated as anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSession`] if the value cannot be used as a bearer token.
    pub fn from_env_value(value: Option<String>) -> Result<Self, AuthError> {
        BearerToken::from_optional(value)
            .map(Self)
            .map_err(|e| AuthError::InvalidSession(e.to_string()))
    }
}

impl From<Option<BearerToken>> for StaticToken {
    fn from(token: Option<BearerToken>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<BearerToken>, AuthError> {
        Ok(self.0.clone())
    }
}

/// Reads the session token from a named cookie on the incoming request.
///
/// The auth provider stores its short-lived session JWT in a cookie (`__session` by default);
/// that JWT is the bearer token the backend expects.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    name: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SessionAuthenticator for SessionCookie {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<BearerToken>, AuthError> {
        // Other cookies may carry arbitrary bytes; only the named value is decoded.
        for value in headers.get_all(header::COOKIE) {
            for pair in value.as_bytes().split(|b| *b == b';') {
                let pair = pair.trim_ascii();
                let Some(eq) = pair.iter().position(|b| *b == b'=') else {
                    continue;
                };
                if &pair[..eq] != self.name.as_bytes() {
                    continue;
                }

                let raw = std::str::from_utf8(&pair[eq + 1..]).map_err(|_| {
                    AuthError::InvalidSession("session cookie is not valid UTF-8".into())
                })?;
                return BearerToken::from_optional(Some(raw.to_owned()))
                    .map_err(|e| AuthError::InvalidSession(e.to_string()));
            }
        }

        Ok(None)
    }
}

/// Build the `Authorization` header value for `token`, marked sensitive so it stays out of logs.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSession`] if the token cannot be encoded as a header value.
pub fn authorization_header(token: &BearerToken) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::from_str(&token.authorization_value())
        .map_err(|e| AuthError::InvalidSession(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
