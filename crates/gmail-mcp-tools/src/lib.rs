//! Gmail, Calendar and Classroom tools for gmail-mcp.
//!
//! Every tool except `authenticate` forwards one call to the backend through
//! the shared [`ProxyClient`], using the calling session's token, and renders
//! the reply with the matching formatter in [`format`].

pub mod auth;
pub mod calendar;
pub mod classroom;
pub mod format;
pub mod gmail;

use gmail_mcp_core::{Config, ProxyClient, RequestOptions};
use gmail_mcp_server::{McpResult, McpToolContext, ToolRegistry, ToolResult};
use serde_json::Value;
use std::sync::Arc;

pub use auth::AuthenticateTool;
pub use calendar::{CreateEventTool, ListEventsTool};
pub use classroom::ListCoursesTool;
pub use gmail::{GetEmailTool, GetProfileTool, ListLabelsTool, SearchEmailsTool};

/// Build the fixed tool table.
pub fn build_registry(config: &Config, proxy: ProxyClient) -> McpResult<ToolRegistry> {
    let proxy = Arc::new(proxy);
    let mut registry = ToolRegistry::new().with_strict_arguments(config.strict_arguments);

    registry.register(AuthenticateTool::new(&config.backend_url, &config.redirect_url()).tool())?;
    registry.register(SearchEmailsTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(GetEmailTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(ListLabelsTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(GetProfileTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(ListEventsTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(CreateEventTool::new(Arc::clone(&proxy)).tool())?;
    registry.register(ListCoursesTool::new(proxy).tool())?;

    Ok(registry)
}

/// GET `endpoint` on behalf of the calling session.
async fn fetch(proxy: &ProxyClient, ctx: &McpToolContext, endpoint: &str) -> ToolResult<Value> {
    Ok(proxy
        .call(&ctx.credentials, endpoint, RequestOptions::get())
        .await?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use gmail_mcp_core::{CredentialCell, ProxyClient};
    use gmail_mcp_server::McpToolContext;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::MockServer;

    pub fn proxy(server: &MockServer) -> Arc<ProxyClient> {
        Arc::new(ProxyClient::new(server.uri(), Duration::from_secs(5)).unwrap())
    }

    pub async fn authed(token: &str) -> McpToolContext {
        let cell = CredentialCell::new();
        cell.set(token).await;
        McpToolContext::new("test-session", Arc::new(cell))
    }

    pub fn anonymous() -> McpToolContext {
        McpToolContext::new("test-session", Arc::new(CredentialCell::new()))
    }
}
