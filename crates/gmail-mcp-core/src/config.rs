//! Configuration management for gmail-mcp.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Built-in defaults
//! 2. Config file: an explicit path, or `gmail-mcp.json` in the working directory
//! 3. Environment overrides: `GMAIL_MCP_*` variables
//!
//! Command-line flags are applied on top by the binary.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default backend that implements the Google service operations.
pub const DEFAULT_BACKEND_URL: &str = "https://googleauth.ishikabhoyar2005.workers.dev";

/// Default path on the backend the OAuth flow redirects to.
pub const DEFAULT_REDIRECT_PATH: &str = "/token-helper";

/// Project config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "gmail-mcp.json";

/// Environment variable overriding `backendUrl`.
pub const ENV_BACKEND_URL: &str = "GMAIL_MCP_BACKEND_URL";

/// Environment variable overriding `server.address`.
pub const ENV_ADDRESS: &str = "GMAIL_MCP_ADDRESS";

/// Environment variable overriding `requestTimeoutSecs`.
pub const ENV_TIMEOUT_SECS: &str = "GMAIL_MCP_TIMEOUT_SECS";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the backend service.
    pub backend_url: String,

    /// Path on the backend that receives the OAuth redirect.
    pub redirect_path: String,

    /// Timeout for each outbound backend call.
    pub request_timeout_secs: u64,

    /// Reject tool arguments that the tool's schema does not declare.
    pub strict_arguments: bool,

    /// HTTP server settings.
    pub server: ServerSettings,

    /// Session lifecycle settings.
    pub session: SessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            request_timeout_secs: crate::proxy::DEFAULT_TIMEOUT_SECS,
            strict_arguments: false,
            server: ServerSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    /// Address to bind to.
    pub address: SocketAddr,
    /// Name reported in the `initialize` result.
    pub name: String,
    /// Version reported in the `initialize` result.
    pub version: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 8787)),
            name: "Gmail MCP".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    /// Seconds of inactivity after which a session without an open stream is reclaimed.
    pub idle_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// `explicit` must exist when given. Otherwise `gmail-mcp.json` in
    /// `project_dir` is used if present. Returns the config and the files read.
    pub async fn load(
        explicit: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> ConfigResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(path) = explicit {
            config = Self::load_file(path).await?;
            sources.push(path.to_path_buf());
        } else if let Some(dir) = project_dir {
            let path = dir.join(CONFIG_FILE_NAME);
            if path.exists() {
                config = Self::load_file(&path).await?;
                sources.push(path);
            }
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        config.normalize();
        config.validate()?;

        Ok((config, sources))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse configuration from JSON text.
    pub fn parse(content: &str, source: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `GMAIL_MCP_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }

        if let Some(address) = lookup(ENV_ADDRESS) {
            self.server.address = address
                .parse()
                .map_err(|e| ConfigError::invalid_value(ENV_ADDRESS, format!("{e}")))?;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs
                .parse()
                .map_err(|e| ConfigError::invalid_value(ENV_TIMEOUT_SECS, format!("{e}")))?;
        }

        Ok(())
    }

    /// Trim trailing slashes from the backend URL and make sure the redirect
    /// path is rooted.
    pub fn normalize(&mut self) {
        let trimmed = self.backend_url.trim_end_matches('/').len();
        self.backend_url.truncate(trimmed);

        if !self.redirect_path.starts_with('/') {
            self.redirect_path.insert(0, '/');
        }
    }

    /// Check that the configuration can be used.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.backend_url)
            .map_err(|e| ConfigError::invalid_value("backendUrl", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_value(
                "backendUrl",
                format!("unsupported scheme: {}", url.scheme()),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "requestTimeoutSecs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Outbound request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Idle time after which a session is reclaimed.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    /// Redirect target handed to the OAuth initiation endpoint.
    pub fn redirect_url(&self) -> String {
        format!("{}{}", self.backend_url, self.redirect_path)
    }
}
