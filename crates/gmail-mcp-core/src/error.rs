//! Error types for the core crate.

use std::time::Duration;
use thiserror::Error;

/// Result type for backend proxy calls.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Guidance returned when a backend call is attempted before authenticating.
pub const AUTH_REQUIRED_GUIDANCE: &str = "Authentication required. Please use the authenticate tool first with no parameters to get the authorization URL. After visiting that URL and completing authentication, call authenticate again with the token you receive.";

/// Errors raised while calling the backend service.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No bearer token has been stored for the session.
    #[error("{}", AUTH_REQUIRED_GUIDANCE)]
    AuthRequired,

    /// The backend answered with a non-success status.
    #[error("API request failed ({status}): {status_text}. {body}")]
    Upstream {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The backend could not be reached at all.
    #[error("Backend unreachable: {0}")]
    TransportUnreachable(String),

    /// The backend did not answer within the configured timeout.
    #[error("Backend request timed out after {0:?}")]
    Timeout(Duration),

    /// A success response whose body is not JSON.
    #[error("Invalid JSON response from backend: {0}")]
    Decode(String),

    /// The HTTP client could not be built or the request could not be formed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ProxyError {
    /// Create an upstream error from its parts.
    pub fn upstream(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Create a transport-unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::TransportUnreachable(message.into())
    }

    /// Create a client error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client(message.into())
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// A field holds a value that cannot be used.
    #[error("invalid config value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// IO error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
