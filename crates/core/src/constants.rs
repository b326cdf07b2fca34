//! Constants used throughout the reader core crate.

/// Backend API origin used when `SERVER_URL` is not set.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Bind address of the REST server when `READER_REST_ADDR` is not set.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Cookie holding the auth provider's session token.
pub const DEFAULT_SESSION_COOKIE: &str = "__session";

/// Largest request body the forwarding endpoint will buffer (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Path prefix under which the forwarding endpoint is mounted.
pub const PROXY_MOUNT: &str = "/api/proxy";

/// Backend status meaning "this user has not completed onboarding yet".
pub const ONBOARDING_REQUIRED_STATUS: u16 = 409;
