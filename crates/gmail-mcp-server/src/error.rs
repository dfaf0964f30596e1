//! MCP error types.

use gmail_mcp_core::ProxyError;
use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Result type for tool handlers.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised by dispatch and the transports.
#[derive(Debug, Error)]
pub enum McpError {
    /// The invocation names a tool that is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments do not match the tool's input schema.
    #[error("Invalid arguments for {tool}: {cause}")]
    InvalidArguments { tool: String, cause: String },

    /// A tool with the same name was already registered.
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// A tool declared a schema that cannot be compiled.
    #[error("Invalid schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },

    /// No session (or no open stream) exists for the identity.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Create an invalid arguments error.
    pub fn invalid_arguments(tool: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            cause: cause.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Errors a tool handler can return.
///
/// The dispatcher renders every variant as an `Error: <message>` text
/// envelope; none of them reach the transport as a fault.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Failure calling the backend.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Arguments passed schema validation but could not be decoded.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The backend reply could not be rendered.
    #[error("Failed to format response: {0}")]
    Format(String),
}

impl ToolError {
    /// Create an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                McpError::UnknownTool("send_email".to_string()),
                "Unknown tool: send_email",
            ),
            (
                McpError::invalid_arguments("search_emails", "\"query\" is a required property"),
                "Invalid arguments for search_emails: \"query\" is a required property",
            ),
            (
                McpError::DuplicateTool("list_labels".to_string()),
                "Duplicate tool: list_labels",
            ),
            (
                McpError::SessionNotFound("abc".to_string()),
                "Session not found: abc",
            ),
            (
                McpError::protocol_error("bad frame"),
                "Protocol error: bad frame",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_tool_error_proxy_is_transparent() {
        let err: ToolError = ProxyError::upstream(404, "Not Found", "missing").into();
        assert_eq!(err.to_string(), "API request failed (404): Not Found. missing");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert!(mcp_err.to_string().contains("JSON error"));
    }
}
