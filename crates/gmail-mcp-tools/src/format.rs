//! Response formatters.
//!
//! Each backend operation has one formatter turning the loosely-typed JSON
//! reply into the text block returned to the client. Formatters never assume
//! a field exists: absent or null values render as an empty string and
//! optional lines are only emitted when the field carries a value.

use gmail_mcp_server::{ToolError, ToolResult};
use serde_json::Value;

/// Text shown when a search matches nothing.
pub const NO_MESSAGES: &str = "No messages found matching the search query.";
/// Text shown when the account has no labels.
pub const NO_LABELS: &str = "No labels found.";
/// Text shown when the calendar range holds no events.
pub const NO_EVENTS: &str = "No events found.";
/// Text shown when the user has no courses.
pub const NO_COURSES: &str = "No courses found.";

/// Render a scalar the way it would be interpolated into a sentence.
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The value when it is present and not empty, zero, false or null.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// The array under `key`, or an empty slice when missing or not an array.
fn items<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// A calendar time: the timed value, falling back to the all-day date.
fn event_time(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    present(value.get("dateTime"))
        .or_else(|| value.get("date"))
        .map(|v| text(Some(v)))
        .unwrap_or_default()
}

/// `search_emails`: one block per message, separated by `---`.
pub fn search_results(reply: &Value) -> String {
    let messages = items(reply, "messages");
    if messages.is_empty() {
        return NO_MESSAGES.to_string();
    }

    let list = messages
        .iter()
        .map(|msg| {
            let mut entry = format!(
                "ID: {}\nThread ID: {}\n",
                text(msg.get("id")),
                text(msg.get("threadId"))
            );
            if let Some(snippet) = present(msg.get("snippet")) {
                entry.push_str(&format!("Snippet: {}\n", text(Some(snippet))));
            }
            entry.push_str("---");
            entry
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} messages:\n\n{}", messages.len(), list)
}

/// `get_email`: identifiers, snippet and the flattened header list.
pub fn message_detail(reply: &Value) -> String {
    let mut content = format!("Message ID: {}\n", text(reply.get("id")));
    if let Some(thread_id) = present(reply.get("threadId")) {
        content.push_str(&format!("Thread ID: {}\n", text(Some(thread_id))));
    }
    if let Some(snippet) = present(reply.get("snippet")) {
        content.push_str(&format!("Snippet: {}\n\n", text(Some(snippet))));
    }

    if let Some(headers) = reply
        .get("payload")
        .and_then(|p| p.get("headers"))
        .and_then(Value::as_array)
    {
        content.push_str("Headers:\n");
        for header in headers {
            content.push_str(&format!(
                "{}: {}\n",
                text(header.get("name")),
                text(header.get("value"))
            ));
        }
    }

    content
}

/// `list_labels`: `name (id) - type` per label.
pub fn labels(reply: &Value) -> String {
    let labels = items(reply, "labels");
    if labels.is_empty() {
        return NO_LABELS.to_string();
    }

    let list = labels
        .iter()
        .map(|label| {
            format!(
                "{} ({}) - {}",
                text(label.get("name")),
                text(label.get("id")),
                text(label.get("type"))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Gmail Labels:\n\n{list}")
}

/// `get_profile`: the backend reply, pretty-printed as-is.
pub fn profile(reply: &Value) -> ToolResult<String> {
    let pretty = serde_json::to_string_pretty(reply).map_err(|e| ToolError::format(e.to_string()))?;
    Ok(format!("Gmail Profile:\n{pretty}"))
}

/// `list_events`: title, optional description, times and attendees.
pub fn events(reply: &Value) -> String {
    let events = items(reply, "items");
    if events.is_empty() {
        return NO_EVENTS.to_string();
    }

    let list = events
        .iter()
        .map(|event| {
            let mut details = format!("Title: {}\n", text(event.get("summary")));
            if let Some(description) = present(event.get("description")) {
                details.push_str(&format!("Description: {}\n", text(Some(description))));
            }
            details.push_str(&format!("Start: {}\n", event_time(event.get("start"))));
            details.push_str(&format!("End: {}\n", event_time(event.get("end"))));

            let attendees = items(event, "attendees");
            if !attendees.is_empty() {
                details.push_str("Attendees:\n");
                for attendee in attendees {
                    details.push_str(&format!("  - {}\n", text(attendee.get("email"))));
                }
            }
            details.push_str("---\n");
            details
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} events:\n\n{}", events.len(), list)
}

/// `create_event`: confirmation with the created event's identifiers.
pub fn created_event(reply: &Value) -> String {
    format!(
        "Event created successfully!\nID: {}\nTitle: {}\nStart: {}\nEnd: {}",
        text(reply.get("id")),
        text(reply.get("summary")),
        event_time(reply.get("start")),
        event_time(reply.get("end"))
    )
}

/// `list_courses`: name, id and the optional section and description.
pub fn courses(reply: &Value) -> String {
    let courses = items(reply, "courses");
    if courses.is_empty() {
        return NO_COURSES.to_string();
    }

    let list = courses
        .iter()
        .map(|course| {
            let mut details = format!(
                "Name: {}\nID: {}\n",
                text(course.get("name")),
                text(course.get("id"))
            );
            if let Some(section) = present(course.get("section")) {
                details.push_str(&format!("Section: {}\n", text(Some(section))));
            }
            if let Some(description) = present(course.get("description")) {
                details.push_str(&format!("Description: {}\n", text(Some(description))));
            }
            details.push_str("---\n");
            details
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} courses:\n\n{}", courses.len(), list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_results_empty() {
        assert_eq!(search_results(&json!({"messages": []})), NO_MESSAGES);
        assert_eq!(search_results(&json!({})), NO_MESSAGES);
        assert_eq!(search_results(&json!({"messages": null})), NO_MESSAGES);
    }

    #[test]
    fn test_search_results_lists_each_message() {
        let reply = json!({
            "messages": [
                {"id": "m1", "threadId": "t1", "snippet": "Hello there"},
                {"id": "m2", "threadId": "t2"}
            ]
        });
        assert_eq!(
            search_results(&reply),
            "Found 2 messages:\n\n\
             ID: m1\nThread ID: t1\nSnippet: Hello there\n---\n\
             ID: m2\nThread ID: t2\n---"
        );
    }

    #[test]
    fn test_search_results_skips_empty_snippet() {
        let reply = json!({"messages": [{"id": "m1", "threadId": "t1", "snippet": ""}]});
        assert!(!search_results(&reply).contains("Snippet"));
    }

    #[test]
    fn test_message_detail_full() {
        let reply = json!({
            "id": "m1",
            "threadId": "t1",
            "snippet": "Hi",
            "payload": {
                "headers": [
                    {"name": "From", "value": "a@example.com"},
                    {"name": "Subject", "value": "Lunch"}
                ]
            }
        });
        assert_eq!(
            message_detail(&reply),
            "Message ID: m1\nThread ID: t1\nSnippet: Hi\n\n\
             Headers:\nFrom: a@example.com\nSubject: Lunch\n"
        );
    }

    #[test]
    fn test_message_detail_minimal() {
        assert_eq!(message_detail(&json!({"id": "m1"})), "Message ID: m1\n");
        assert_eq!(
            message_detail(&json!({"id": "m1", "payload": {"headers": "oops"}})),
            "Message ID: m1\n"
        );
        assert_eq!(message_detail(&json!({})), "Message ID: \n");
    }

    #[test]
    fn test_labels() {
        assert_eq!(labels(&json!({"labels": []})), NO_LABELS);

        let reply = json!({
            "labels": [
                {"name": "INBOX", "id": "INBOX", "type": "system"},
                {"name": "Work", "id": "Label_1", "type": "user"}
            ]
        });
        assert_eq!(
            labels(&reply),
            "Gmail Labels:\n\nINBOX (INBOX) - system\nWork (Label_1) - user"
        );
    }

    #[test]
    fn test_profile_pretty_prints() {
        let reply = json!({"emailAddress": "me@example.com"});
        assert_eq!(
            profile(&reply).unwrap(),
            "Gmail Profile:\n{\n  \"emailAddress\": \"me@example.com\"\n}"
        );
    }

    #[test]
    fn test_events_empty() {
        assert_eq!(events(&json!({"items": []})), NO_EVENTS);
        assert_eq!(events(&json!(null)), NO_EVENTS);
    }

    #[test]
    fn test_events_full_and_all_day() {
        let reply = json!({
            "items": [
                {
                    "summary": "Standup",
                    "description": "Daily sync",
                    "start": {"dateTime": "2024-05-01T09:00:00Z"},
                    "end": {"dateTime": "2024-05-01T09:15:00Z"},
                    "attendees": [{"email": "a@example.com"}, {"email": "b@example.com"}]
                },
                {
                    "summary": "Holiday",
                    "start": {"date": "2024-05-02"},
                    "end": {"date": "2024-05-03"},
                    "attendees": []
                }
            ]
        });
        assert_eq!(
            events(&reply),
            "Found 2 events:\n\n\
             Title: Standup\nDescription: Daily sync\n\
             Start: 2024-05-01T09:00:00Z\nEnd: 2024-05-01T09:15:00Z\n\
             Attendees:\n  - a@example.com\n  - b@example.com\n---\n\
             \n\
             Title: Holiday\nStart: 2024-05-02\nEnd: 2024-05-03\n---\n"
        );
    }

    #[test]
    fn test_events_tolerate_missing_times() {
        let reply = json!({"items": [{"summary": "Loose"}]});
        assert_eq!(
            events(&reply),
            "Found 1 events:\n\nTitle: Loose\nStart: \nEnd: \n---\n"
        );
    }

    #[test]
    fn test_created_event() {
        let reply = json!({
            "id": "e1",
            "summary": "Review",
            "start": {"dateTime": "2024-05-01T10:00:00Z"},
            "end": {"dateTime": "2024-05-01T11:00:00Z"}
        });
        assert_eq!(
            created_event(&reply),
            "Event created successfully!\nID: e1\nTitle: Review\n\
             Start: 2024-05-01T10:00:00Z\nEnd: 2024-05-01T11:00:00Z"
        );
    }

    #[test]
    fn test_courses() {
        assert_eq!(courses(&json!({"courses": []})), NO_COURSES);

        let reply = json!({
            "courses": [
                {"name": "Algebra", "id": "c1", "section": "Period 2", "description": "Intro"},
                {"name": "History", "id": 42}
            ]
        });
        assert_eq!(
            courses(&reply),
            "Found 2 courses:\n\n\
             Name: Algebra\nID: c1\nSection: Period 2\nDescription: Intro\n---\n\
             \n\
             Name: History\nID: 42\n---\n"
        );
    }

    #[test]
    fn test_counts_follow_backend_length() {
        let messages: Vec<Value> = (0..7)
            .map(|i| json!({"id": format!("m{i}"), "threadId": "t"}))
            .collect();
        let text = search_results(&json!({ "messages": messages }));
        assert!(text.starts_with("Found 7 messages:"));
        assert_eq!(text.matches("---").count(), 7);
    }
}
