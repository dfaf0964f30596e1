//! Classroom tools.

use crate::{fetch, format};
use async_trait::async_trait;
use gmail_mcp_core::ProxyClient;
use gmail_mcp_server::{
    McpServerTool, McpServerToolBuilder, McpToolContext, McpToolExecutor, ToolCallResult,
    ToolResult,
};
use serde_json::Value;
use std::sync::Arc;

/// List the courses visible to the user.
pub struct ListCoursesTool {
    proxy: Arc<ProxyClient>,
}

impl ListCoursesTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("list_courses")
            .description("List all Google Classroom courses available to the user")
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for ListCoursesTool {
    async fn execute(&self, _args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let reply = fetch(&self.proxy, ctx, "/classroom/courses").await?;
        Ok(ToolCallResult::text(format::courses(&reply)))
    }
}
