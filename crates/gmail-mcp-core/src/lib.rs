//! Core building blocks for gmail-mcp.
//!
//! - [`config`]: layered configuration (defaults, file, environment)
//! - [`credential`]: the per-session bearer token cell
//! - [`proxy`]: the authenticated, single-attempt backend client

pub mod config;
pub mod credential;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use credential::CredentialCell;
pub use error::{ConfigError, ConfigResult, ProxyError, ProxyResult, AUTH_REQUIRED_GUIDANCE};
pub use proxy::{ProxyClient, RequestOptions};
