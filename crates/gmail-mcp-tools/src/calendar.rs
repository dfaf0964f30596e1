//! Calendar tools: list events in a range and create an event.

use crate::{fetch, format};
use async_trait::async_trait;
use gmail_mcp_core::{ProxyClient, RequestOptions};
use gmail_mcp_server::{
    McpServerTool, McpServerToolBuilder, McpToolContext, McpToolExecutor, ToolCallResult,
    ToolError, ToolResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::sync::Arc;
use tracing::debug;

const EVENTS_ENDPOINT: &str = "/calendar/events";

/// List calendar events, optionally bounded in time and count.
pub struct ListEventsTool {
    proxy: Arc<ProxyClient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEventsArgs {
    #[serde(default)]
    time_min: Option<String>,
    #[serde(default)]
    time_max: Option<String>,
    #[serde(default)]
    max_results: Option<Number>,
}

impl ListEventsArgs {
    /// Query string holding only the parameters that carry a value.
    fn query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(time_min) = self.time_min.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("timeMin", time_min);
        }
        if let Some(time_max) = self.time_max.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("timeMax", time_max);
        }
        if let Some(max_results) = self.max_results.as_ref().and_then(count_param) {
            query.append_pair("maxResults", &max_results);
        }
        query.finish()
    }
}

/// Render a numeric parameter, dropping zero. Whole floats print without a fraction.
fn count_param(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return (i != 0).then(|| i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return (u != 0).then(|| u.to_string());
    }
    let f = n.as_f64()?;
    if f == 0.0 {
        None
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

impl ListEventsTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("list_events")
            .description("List calendar events within a specified time range")
            .parameters(json!({
                "type": "object",
                "properties": {
                    "timeMin": {
                        "type": "string",
                        "description": "Start time for listing events (RFC3339 timestamp)"
                    },
                    "timeMax": {
                        "type": "string",
                        "description": "End time for listing events (RFC3339 timestamp)"
                    },
                    "maxResults": {
                        "type": "number",
                        "description": "Maximum number of events to return"
                    }
                }
            }))
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for ListEventsTool {
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let args: ListEventsArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let query = args.query();
        let endpoint = if query.is_empty() {
            EVENTS_ENDPOINT.to_string()
        } else {
            format!("{EVENTS_ENDPOINT}?{query}")
        };
        debug!(endpoint = %endpoint, "Listing events");

        let reply = fetch(&self.proxy, ctx, &endpoint).await?;
        Ok(ToolCallResult::text(format::events(&reply)))
    }
}

/// Create a calendar event from the declared argument fields.
pub struct CreateEventTool {
    proxy: Arc<ProxyClient>,
}

/// The event body posted to the backend. Undeclared keys are dropped.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventArgs {
    summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: EventTime,
    end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<Attendee>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Attendee {
    email: String,
}

impl CreateEventTool {
    pub fn new(proxy: Arc<ProxyClient>) -> Self {
        Self { proxy }
    }

    pub fn tool(self) -> McpServerTool {
        McpServerToolBuilder::new("create_event")
            .description("Create a new event in Google Calendar")
            .parameters(json!({
                "type": "object",
                "required": ["summary", "start", "end"],
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Title of the event"
                    },
                    "description": {
                        "type": "string",
                        "description": "Description of the event"
                    },
                    "start": {
                        "type": "object",
                        "required": ["dateTime"],
                        "properties": {
                            "dateTime": {
                                "type": "string",
                                "description": "Start time (RFC3339 timestamp)"
                            },
                            "timeZone": {
                                "type": "string",
                                "description": "Timezone for the start time"
                            }
                        }
                    },
                    "end": {
                        "type": "object",
                        "required": ["dateTime"],
                        "properties": {
                            "dateTime": {
                                "type": "string",
                                "description": "End time (RFC3339 timestamp)"
                            },
                            "timeZone": {
                                "type": "string",
                                "description": "Timezone for the end time"
                            }
                        }
                    },
                    "attendees": {
                        "type": "array",
                        "description": "List of attendees",
                        "items": {
                            "type": "object",
                            "required": ["email"],
                            "properties": {
                                "email": {
                                    "type": "string",
                                    "description": "Email address of the attendee"
                                }
                            }
                        }
                    }
                }
            }))
            .build(self)
    }
}

#[async_trait]
impl McpToolExecutor for CreateEventTool {
    async fn execute(&self, args: Value, ctx: &McpToolContext) -> ToolResult<ToolCallResult> {
        let args: CreateEventArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        debug!(summary = %args.summary, "Creating event");
        let options = RequestOptions::post_json(&args)?;
        let reply = self
            .proxy
            .call(&ctx.credentials, EVENTS_ENDPOINT, options)
            .await?;
        Ok(ToolCallResult::text(format::created_event(&reply)))
    }
}
