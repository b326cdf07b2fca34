//! # Reader Core
//!
//! Client-side plumbing between the reading application and the backend recommendation API.
//!
//! This crate contains:
//! - Startup configuration (`ReaderConfig`) resolved once and passed down
//! - The schema-validated fetch client (`ApiClient`) and its execution context
//! - The declared response shapes of the backend API (`models`)
//! - Typed reading-application operations (`ReaderApi`)
//!
//! **No server concerns**: the forwarding endpoint and HTTP routing belong in `api-rest`.
//! Token issuance belongs to the external auth provider, reached through the seams in
//! `api-shared`.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod reader;

pub use client::{parse_validated, ApiClient, RequestContext};
pub use config::ReaderConfig;
pub use constants::{DEFAULT_SERVER_URL, PROXY_MOUNT};
pub use error::{ApiError, ApiResult, ConfigError, ConfigResult};
pub use reader::{FeedQuery, ReaderApi};
