//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the fetch client and
//! the forwarding endpoint. Nothing in this crate reads environment variables during request
//! handling; the binaries read the environment and feed the raw values through the
//! `*_from_env_value` helpers below.

use crate::constants::{
    DEFAULT_MAX_BODY_BYTES, DEFAULT_REST_ADDR, DEFAULT_SERVER_URL, DEFAULT_SESSION_COOKIE,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    server_url: Url,
    rest_addr: String,
    session_cookie: String,
    max_body_bytes: usize,
}

impl ReaderConfig {
    /// Create a new `ReaderConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] if the bind address is blank or the body limit is
    /// zero.
    pub fn new(
        server_url: Url,
        rest_addr: String,
        session_cookie: String,
        max_body_bytes: usize,
    ) -> ConfigResult<Self> {
        if rest_addr.trim().is_empty() {
            return Err(ConfigError::InvalidInput(
                "rest_addr cannot be empty".into(),
            ));
        }
        if max_body_bytes == 0 {
            return Err(ConfigError::InvalidInput(
                "max_body_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            server_url,
            rest_addr,
            session_cookie,
            max_body_bytes,
        })
    }

    /// Configuration with every value at its default.
    pub fn defaults() -> ConfigResult<Self> {
        Self::new(
            server_url_from_env_value(None)?,
            DEFAULT_REST_ADDR.into(),
            DEFAULT_SESSION_COOKIE.into(),
            DEFAULT_MAX_BODY_BYTES,
        )
    }

    /// Backend API origin.
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the backend origin from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SERVER_URL`].
///
/// # Errors
///
/// Returns a [`ConfigError`] if the value is not an absolute `http`/`https` URL, or if it
/// carries a query string or fragment (paths are appended to it verbatim).
pub fn server_url_from_env_value(value: Option<String>) -> ConfigResult<Url> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let url = Url::parse(&raw)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidInput(format!(
            "server URL must use http or https, got {}",
            url.scheme()
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidInput(
            "server URL must not contain a query string or fragment".into(),
        ));
    }

    Ok(url)
}

/// Parse the session cookie name, defaulting to [`DEFAULT_SESSION_COOKIE`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInput`] if the name contains characters that cannot appear in a
/// cookie name.
pub fn session_cookie_from_env_value(value: Option<String>) -> ConfigResult<String> {
    let name = non_blank(value).unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

    let ok = name
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b'=' | b',' | b'"'));
    if !ok {
        return Err(ConfigError::InvalidInput(format!(
            "invalid session cookie name: {name:?}"
        )));
    }

    Ok(name)
}

/// Parse the forwarded-body limit in bytes, defaulting to [`DEFAULT_MAX_BODY_BYTES`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInput`] if the value is not a positive integer.
pub fn max_body_bytes_from_env_value(value: Option<String>) -> ConfigResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_BODY_BYTES),
        Some(v) => match v.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidInput(format!(
                "max body bytes must be a positive integer, got {v:?}"
            ))),
        },
    }
}

/// Parse the REST bind address, defaulting to [`DEFAULT_REST_ADDR`].
pub fn rest_addr_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_REST_ADDR.to_string())
}
