//! Status-change extraction from task-tracker webhook envelopes.
//!
//! Envelopes arrive either as the raw tracker body or wrapped as
//! `{"body": {...}}` by an upstream relay. Both shapes are accepted.

use relaygate_types::admission::{StatusChange, normalize_status};
use serde_json::Value;

/// Extract the task id and the first status transition from an envelope.
///
/// Task id priority: `task_id`, then `history_items[0].task.id`, then
/// `payload.id`. The status change is the first `history_items` entry whose
/// `field` is `status`.
pub fn extract_status_change(envelope: &Value) -> StatusChange {
    let body = match envelope.get("body") {
        Some(inner @ Value::Object(_)) => inner,
        _ => envelope,
    };

    let task_id = id_string(body.get("task_id"))
        .or_else(|| id_string(body.pointer("/history_items/0/task/id")))
        .or_else(|| id_string(body.pointer("/payload/id")));

    let status_item = body
        .get("history_items")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .find(|item| item.get("field").and_then(Value::as_str) == Some("status"))
        });

    let (old_status, new_status) = match status_item {
        Some(item) => (
            status_at(item, "/before/status").unwrap_or_default(),
            Some(status_at(item, "/after/status").unwrap_or_default()),
        ),
        None => (String::new(), None),
    };

    StatusChange {
        task_id,
        old_status,
        new_status,
    }
}

/// Ids may arrive as strings or numbers; empty strings count as absent.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `before`/`after` hold either `{ "status": "..." }` or the bare string.
fn status_at(item: &Value, pointer: &str) -> Option<String> {
    let raw = item.pointer(pointer).or_else(|| {
        let parent = pointer.rsplit_once('/').map(|(p, _)| p).unwrap_or(pointer);
        item.pointer(parent).filter(|v| v.is_string())
    })?;
    raw.as_str().map(normalize_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tracker_history_item() {
        let envelope = json!({
            "event": "taskStatusUpdated",
            "task_id": "abc123",
            "history_items": [
                {"field": "assignee", "before": null, "after": {"id": 1}},
                {"field": "status", "before": {"status": "onboarding"}, "after": {"status": "Reply"}}
            ]
        });

        let change = extract_status_change(&envelope);
        assert_eq!(change.task_id.as_deref(), Some("abc123"));
        assert_eq!(change.old_status, "onboarding");
        assert_eq!(change.new_status.as_deref(), Some("reply"));
    }

    #[test]
    fn test_wrapped_body_and_nested_task_id() {
        let envelope = json!({
            "body": {
                "history_items": [
                    {"field": "status", "task": {"id": "t-9"}, "after": {"status": "campaign-live"}}
                ]
            }
        });

        let change = extract_status_change(&envelope);
        assert_eq!(change.task_id, None);
        assert_eq!(change.new_status.as_deref(), Some("campaign live"));
        assert_eq!(change.old_status, "");
    }

    #[test]
    fn test_task_id_fallback_order() {
        let nested = json!({"history_items": [{"task": {"id": "from-history"}}], "payload": {"id": "from-payload"}});
        assert_eq!(extract_status_change(&nested).task_id.as_deref(), Some("from-history"));

        let payload_only = json!({"payload": {"id": 4242}});
        assert_eq!(extract_status_change(&payload_only).task_id.as_deref(), Some("4242"));

        let both = json!({"task_id": "top", "payload": {"id": "p"}});
        assert_eq!(extract_status_change(&both).task_id.as_deref(), Some("top"));
    }

    #[test]
    fn test_bare_string_status_values() {
        let envelope = json!({
            "task_id": "x",
            "history_items": [{"field": "status", "before": "Onboarding", "after": "REPLY"}]
        });
        let change = extract_status_change(&envelope);
        assert_eq!(change.old_status, "onboarding");
        assert_eq!(change.new_status.as_deref(), Some("reply"));
    }

    #[test]
    fn test_no_status_history() {
        let envelope = json!({"task_id": "x", "history_items": [{"field": "name"}]});
        let change = extract_status_change(&envelope);
        assert_eq!(change.task_id.as_deref(), Some("x"));
        assert!(change.new_status.is_none());

        assert_eq!(
            extract_status_change(&json!("not an object")),
            StatusChange { task_id: None, old_status: String::new(), new_status: None }
        );
    }
}
