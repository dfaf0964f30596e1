//! Authenticate tool - hand out the authorization URL or store a token.

use async_trait::async_trait;
use gmail_mcp_server::{
    McpServerTool, McpServerToolBuilder, McpToolContext, McpToolExecutor, ToolCallResult,
    ToolError, ToolResult,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Tool name.
pub const NAME: &str = "authenticate";

/// Path of the OAuth initiation endpoint on the backend.
const AUTH_INIT_PATH: &str = "/google/auth/gmail";

/// Confirmation returned once a token is stored.
pub const AUTH_SUCCESS: &str = "Authentication successful! You can now use Gmail tools.";

/// Stores the session token, or explains how to obtain one.
pub struct AuthenticateTool {
    auth_url: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticateArgs {
    #[serde(default)]
    token: Option<String>,
}

impl AuthenticateTool {
    /// `backend_url` hosts the OAuth flow; `redirect_url` receives the token.
    pub fn new(backend_url: &str, redirect_url: &str) -> Self {
        let auth_url = format!(
            "{}{}?redirect_url={}",
            backend_url.trim_end_matches('/'),
            AUTH_INIT_PATH,
            urlencoding::encode(redirect_url)
        );
        Self { auth_url }
    }

    /// The URL a user visits to authorize the application.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// The registry entry for this tool.
    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new(NAME)
            .description(
                "Authenticate with Google to access Gmail, Calendar, and Classroom services",
            )
            .parameters(json!({
                "type": "object",
                "properties": {
                    "token": {
                        "type": "string",
                        "description": "The authentication token received from the auth process"
                    }
                }
            }))
            .build(self)
    }

    fn instructions(&self) -> String {
        format!(
            "Please visit this URL to authorize the application:\n{}\n\n\
             After authorization, you'll receive a token. Please provide that token to complete authentication.",
            self.auth_url
        )
    }
}

#[async_trait]
impl McpToolExecutor for AuthenticateTool {
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let args: AuthenticateArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        match args.token.filter(|t| !t.is_empty()) {
            None => Ok(ToolCallResult::text(self.instructions())),
            Some(token) => {
                ctx.credentials.set(token).await;
                info!(session_id = %ctx.session_id, "Session authenticated");
                Ok(ToolCallResult::text(AUTH_SUCCESS))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmail_mcp_core::CredentialCell;
    use std::sync::Arc;

    const BASE: &str = "https://auth.example.com";

    fn ctx() -> McpToolContext {
        McpToolContext::new("s1", Arc::new(CredentialCell::new()))
    }

    #[test]
    fn test_auth_url_shape() {
        let tool = AuthenticateTool::new(BASE, "https://auth.example.com/token-helper");
        let url = tool.auth_url();
        assert!(url.contains("/google/auth/gmail?redirect_url="));
        assert_eq!(url.matches(BASE).count(), 1);
        assert!(url.ends_with("https%3A%2F%2Fauth.example.com%2Ftoken-helper"));
    }

    #[test]
    fn test_auth_url_trims_trailing_slash() {
        let tool = AuthenticateTool::new("https://auth.example.com/", "https://r");
        assert!(tool
            .auth_url()
            .starts_with("https://auth.example.com/google/auth/gmail?"));
    }

    #[tokio::test]
    async fn test_without_token_returns_url_and_leaves_cell_empty() {
        let tool = AuthenticateTool::new(BASE, "https://auth.example.com/token-helper");
        let ctx = ctx();

        let result = tool.execute(json!({}), &ctx).await.unwrap();
        let text = result.joined_text();
        assert!(text.starts_with("Please visit this URL to authorize the application:\n"));
        assert!(text.contains(tool.auth_url()));
        assert!(text.ends_with("Please provide that token to complete authentication."));
        assert!(!ctx.credentials.is_set().await);
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_absent() {
        let tool = AuthenticateTool::new(BASE, "https://r");
        let ctx = ctx();
        let result = tool.execute(json!({"token": ""}), &ctx).await.unwrap();
        assert!(result.joined_text().starts_with("Please visit"));
        assert!(!ctx.credentials.is_set().await);
    }

    #[tokio::test]
    async fn test_token_is_stored() {
        let tool = AuthenticateTool::new(BASE, "https://r");
        let ctx = ctx();

        let result = tool.execute(json!({"token": "T"}), &ctx).await.unwrap();
        assert_eq!(result.joined_text(), AUTH_SUCCESS);
        assert_eq!(ctx.credentials.get().await.as_deref(), Some("T"));

        // Re-authentication overwrites.
        tool.execute(json!({"token": "U"}), &ctx).await.unwrap();
        assert_eq!(ctx.credentials.get().await.as_deref(), Some("U"));
    }
}
