//! Model Context Protocol (MCP) server plumbing for gmail-mcp.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐     ┌─────────┐
//! │  MCP Client │────▶│  Transports  │────▶│ ToolRegistry │────▶│ Handler │
//! │             │◀────│ (/sse, /mcp) │◀────│  (validate)  │◀────│         │
//! └─────────────┘     └──────────────┘     └──────────────┘     └─────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────┐
//!                     │ SessionStore │  one CredentialCell per identity
//!                     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gmail_mcp_server::{
//!     create_mcp_router, ClosureExecutor, McpHttpState, McpServerToolBuilder, ToolCallResult,
//!     ToolRegistry,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut tools = ToolRegistry::new();
//! tools.register(
//!     McpServerToolBuilder::new("hello")
//!         .description("Say hello")
//!         .build(ClosureExecutor::new(|_args, _ctx| Ok(ToolCallResult::text("hello")))),
//! )?;
//!
//! let router = create_mcp_router(McpHttpState::new("demo", "0.1.0", tools));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http_serve;
pub mod protocol;
pub mod serve;
pub mod session;

pub use error::{McpError, McpResult, ToolError, ToolResult};
pub use http_serve::{create_mcp_router, McpHttpState, SESSION_HEADER, SSE_MESSAGE_PATH};
pub use protocol::{McpTool, ToolCallResult, ToolContent};
pub use serve::{
    ClosureExecutor, McpServerTool, McpServerToolBuilder, McpToolContext, McpToolExecutor,
    ToolRegistry,
};
pub use session::{Session, SessionStore};
