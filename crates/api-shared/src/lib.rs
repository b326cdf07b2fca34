//! # API Shared
//!
//! Shared utilities and definitions for the reader API crates.
//!
//! Contains:
//! - Authentication seams (`TokenProvider`, `SessionAuthenticator`) and their stock
//!   implementations
//! - Shared services like `HealthService`
//!
//! Used by `reader-core`, `api-rest` and `reader-cli`.

pub mod auth;
pub mod health;

pub use auth::{AuthError, SessionAuthenticator, SessionCookie, StaticToken, TokenProvider};
pub use health::{HealthRes, HealthService};
