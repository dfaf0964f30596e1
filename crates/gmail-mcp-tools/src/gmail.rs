//! Gmail tools: search, message detail, labels and profile.

use crate::{fetch, format};
use async_trait::async_trait;
use gmail_mcp_core::ProxyClient;
use gmail_mcp_server::{
    McpServerTool, McpServerToolBuilder, McpToolContext, McpToolExecutor, ToolCallResult,
    ToolError, ToolResult,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Search messages with Gmail search syntax.
pub struct SearchEmailsTool {
    proxy: Arc<ProxyClient>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

impl SearchEmailsTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("search_emails")
            .description("Search for emails in Gmail using Gmail search syntax")
            .parameters(json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Gmail search query (e.g., \"from:example@gmail.com\", \"subject:important\", \"is:unread\")"
                    }
                }
            }))
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for SearchEmailsTool {
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let args: SearchArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        debug!(query = %args.query, "Searching messages");
        let endpoint = format!("/gmail/search?q={}", urlencoding::encode(&args.query));
        let reply = fetch(&self.proxy, ctx, &endpoint).await?;
        Ok(ToolCallResult::text(format::search_results(&reply)))
    }
}

/// Fetch one message by id.
pub struct GetEmailTool {
    proxy: Arc<ProxyClient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEmailArgs {
    message_id: String,
}

impl GetEmailTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("get_email")
            .description("Retrieve a specific email by its message ID")
            .parameters(json!({
                "type": "object",
                "required": ["messageId"],
                "properties": {
                    "messageId": {
                        "type": "string",
                        "description": "The Gmail message ID"
                    }
                }
            }))
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for GetEmailTool {
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let args: GetEmailArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let endpoint = format!(
            "/gmail/message?messageId={}&decode=true",
            urlencoding::encode(&args.message_id)
        );
        let reply = fetch(&self.proxy, ctx, &endpoint).await?;
        Ok(ToolCallResult::text(format::message_detail(&reply)))
    }
}

/// List the account's labels.
pub struct ListLabelsTool {
    proxy: Arc<ProxyClient>,
}

impl ListLabelsTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("list_labels")
            .description("List all Gmail labels in the user's account")
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for ListLabelsTool {
    async fn execute(&self, _args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let reply = fetch(&self.proxy, ctx, "/gmail/labels").await?;
        Ok(ToolCallResult::text(format::labels(&reply)))
    }
}

/// Echo the account profile.
pub struct GetProfileTool {
    proxy: Arc<ProxyClient>,
}

impl GetProfileTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("get_profile")
            .description("Get information about the user's Gmail profile")
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for GetProfileTool {
    async fn execute(&self, _args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let reply = fetch(&self.proxy, ctx, "/gmail/list").await?;
        Ok(ToolCallResult::text(format::profile(&reply)?))
    }
}
