//! Tool registry and dispatcher for the MCP server.
//!
//! The transport layer in `http_serve.rs` decodes JSON-RPC messages and hands
//! `tools/call` invocations to [`ToolRegistry::dispatch`], which
//!
//! 1. looks the tool up by name (`UnknownTool` if absent),
//! 2. validates the arguments against the declared JSON Schema
//!    (`InvalidArguments` with the field-level cause),
//! 3. runs the handler, rendering any handler error as an `Error: <message>`
//!    text envelope.
//!
//! ```text
//! ┌─────────────────┐  tools/call   ┌──────────────┐   execute   ┌────────────────┐
//! │ transport layer │ ────────────► │ ToolRegistry │ ──────────► │ McpToolExecutor│
//! │  (SSE / HTTP)   │ ◄──────────── │  (validate)  │ ◄────────── │   (handler)    │
//! └─────────────────┘   envelope    └──────────────┘   Result    └────────────────┘
//! ```

use crate::error::{McpError, McpResult, ToolResult};
use crate::protocol::{McpTool, ToolCallResult};
use crate::session::Session;
use gmail_mcp_core::CredentialCell;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool definition for the MCP server.
#[derive(Clone)]
pub struct McpServerTool {
    /// Tool name, unique within the registry.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for parameters.
    pub parameters: Value,
    /// Tool executor.
    pub executor: Arc<dyn McpToolExecutor>,
}

impl std::fmt::Debug for McpServerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Trait for tool execution.
#[async_trait::async_trait]
pub trait McpToolExecutor: Send + Sync {
    /// Execute the tool with validated arguments.
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct McpToolContext {
    /// Identity of the calling session.
    pub session_id: String,
    /// The session's bearer token cell.
    pub credentials: Arc<CredentialCell>,
}

impl McpToolContext {
    /// Create a context from its parts.
    pub fn new(session_id: impl Into<String>, credentials: Arc<CredentialCell>) -> Self {
        Self {
            session_id: session_id.into(),
            credentials,
        }
    }

    /// The context for invocations on `session`.
    pub fn for_session(session: &Session) -> Self {
        Self::new(session.id(), Arc::clone(session.credentials()))
    }
}

/// Builder for McpServerTool.
pub struct McpServerToolBuilder {
    name: String,
    description: String,
    parameters: Value,
}

impl McpServerToolBuilder {
    /// Create a new tool builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Set the tool description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the parameters schema.
    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build the tool with an executor.
    pub fn build(self, executor: impl McpToolExecutor + 'static) -> McpServerTool {
        McpServerTool {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            executor: Arc::new(executor),
        }
    }
}

/// Executor that wraps a synchronous closure.
pub struct ClosureExecutor<F>
where
    F: Fn(Value, &McpToolContext) -> ToolResult<ToolCallResult> + Send + Sync,
{
    f: F,
}

impl<F> ClosureExecutor<F>
where
    F: Fn(Value, &McpToolContext) -> ToolResult<ToolCallResult> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait::async_trait]
impl<F> McpToolExecutor for ClosureExecutor<F>
where
    F: Fn(Value, &McpToolContext) -> ToolResult<ToolCallResult> + Send + Sync,
{
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        (self.f)(args, ctx)
    }
}

struct RegisteredTool {
    tool: McpServerTool,
    validator: JSONSchema,
}

/// The fixed table of tools exposed by the server.
///
/// Built once at start-up; iteration order is by tool name so `tools/list`
/// is stable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
    strict: bool,
}

impl ToolRegistry {
    /// Create an empty registry that tolerates unknown arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject (true) or tolerate (false) arguments the schema does not declare.
    pub fn with_strict_arguments(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether unknown arguments are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a tool. Names must be unique and schemas must compile.
    pub fn register(&mut self, tool: McpServerTool) -> McpResult<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(McpError::DuplicateTool(tool.name));
        }

        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&tool.parameters)
            .map_err(|e| McpError::InvalidSchema {
                tool: tool.name.clone(),
                message: e.to_string(),
            })?;

        debug!(tool = %tool.name, "Registered tool");
        self.tools
            .insert(tool.name.clone(), RegisteredTool { tool, validator });
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&McpServerTool> {
        self.tools.get(name).map(|entry| &entry.tool)
    }

    /// Tool names in registry order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions advertised by `tools/list`.
    pub fn definitions(&self) -> Vec<McpTool> {
        self.tools
            .values()
            .map(|entry| McpTool {
                name: entry.tool.name.clone(),
                description: entry.tool.description.clone(),
                input_schema: entry.tool.parameters.clone(),
            })
            .collect()
    }

    /// Check `args` against the schema of `name`.
    pub fn validate(&self, name: &str, args: &Value) -> McpResult<()> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        if !args.is_object() {
            return Err(McpError::invalid_arguments(
                name,
                "arguments must be an object",
            ));
        }

        if let Err(errors) = entry.validator.validate(args) {
            let causes: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();
            return Err(McpError::invalid_arguments(name, causes.join("; ")));
        }

        if self.strict {
            let unknown = undeclared_arguments(&entry.tool.parameters, args);
            if !unknown.is_empty() {
                return Err(McpError::invalid_arguments(
                    name,
                    format!("unknown argument(s): {}", unknown.join(", ")),
                ));
            }
        }

        Ok(())
    }

    /// Run one invocation.
    ///
    /// Lookup and validation failures are returned as errors; nothing reaches
    /// the handler in that case. Handler errors become `Error: <message>`
    /// envelopes.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: &McpToolContext,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        self.validate(name, &args)?;

        let tool = self
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        debug!(tool = %name, session_id = %ctx.session_id, "Executing tool");
        match tool.executor.execute(args, ctx).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(tool = %name, session_id = %ctx.session_id, error = %e, "Tool failed");
                Ok(ToolCallResult::error_text(e))
            }
        }
    }
}

/// Top-level argument names not declared under the schema's `properties`.
fn undeclared_arguments(schema: &Value, args: &Value) -> Vec<String> {
    let declared = schema.get("properties").and_then(Value::as_object);
    args.as_object()
        .map(|map| {
            map.keys()
                .filter(|key| !declared.is_some_and(|props| props.contains_key(key.as_str())))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
