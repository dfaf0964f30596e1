//! Authenticated calls to the backend service.
//!
//! Every call is a single attempt: no retry, no backoff. The session's bearer
//! token is attached as `Authorization: Bearer <token>` and always replaces any
//! caller-supplied authorization header.

use crate::credential::CredentialCell;
use crate::error::{ProxyError, ProxyResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options for a single backend call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Extra headers, applied before the bearer header.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    /// A plain GET.
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST carrying `body` as JSON.
    pub fn post_json<T: Serialize + ?Sized>(body: &T) -> ProxyResult<Self> {
        let body = serde_json::to_vec(body)
            .map_err(|e| ProxyError::client(format!("Failed to encode request body: {e}")))?;
        Ok(Self {
            method: Method::POST,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Issues authenticated requests against a fixed base URL.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ProxyClient {
    /// Create a proxy client for `base_url` with the given timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProxyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gmail-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::client(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// The base URL every endpoint is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `endpoint` with the session's token and decode the JSON reply.
    ///
    /// Fails with [`ProxyError::AuthRequired`] before any network activity
    /// when `credentials` holds no token.
    pub async fn call(
        &self,
        credentials: &CredentialCell,
        endpoint: &str,
        options: RequestOptions,
    ) -> ProxyResult<Value> {
        let token = credentials.get().await.ok_or(ProxyError::AuthRequired)?;

        let url = format!("{}{}", self.base_url, endpoint);
        let headers = merge_headers(&options.headers, &token)?;

        debug!(method = %options.method, url = %url, "Calling backend");

        let mut request = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProxyError::Timeout(self.timeout)
            } else if e.is_connect() {
                ProxyError::unreachable(format!("Connection failed: {e}"))
            } else if e.is_builder() {
                ProxyError::client(format!("Invalid request: {e}"))
            } else {
                ProxyError::unreachable(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), url = %url, "Backend returned an error status");
            return Err(ProxyError::upstream(status.as_u16(), status_text, body));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProxyError::Timeout(self.timeout)
            } else {
                ProxyError::unreachable(format!("Failed to read response: {e}"))
            }
        })?;

        serde_json::from_str(&text).map_err(|e| ProxyError::Decode(e.to_string()))
    }
}

/// Build the outbound header map. The bearer header is inserted last so it
/// replaces any caller-supplied `Authorization`.
fn merge_headers(extra: &[(String, String)], token: &str) -> ProxyResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxyError::client(format!("Invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProxyError::client(format!("Invalid header value for {name}: {e}")))?;
        headers.insert(name, value);
    }

    let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ProxyError::client("Stored token is not a valid header value"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Ok(headers)
}
