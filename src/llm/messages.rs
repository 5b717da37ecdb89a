//! Conversation history normalization.
//!
//! Widget clients send history in whatever shape their UI framework keeps
//! it: plain strings, lists of content fragments, or single fragment
//! objects. [`normalize`] collapses all of those into flat-text
//! [`ChatMessage`]s exactly once at the system boundary; downstream code
//! never re-inspects content shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ChatMessage, MessageRole};

/// Number of most recent history entries considered per request. Older
/// turns are silently dropped, bounding prompt size and cost.
pub const HISTORY_WINDOW: usize = 6;

/// A caller-supplied history entry before normalization.
///
/// `content` is left as raw JSON because its shape is unknown until
/// [`normalize`] resolves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHistoryEntry {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl From<&ChatMessage> for RawHistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            content: Value::String(message.content.clone()),
        }
    }
}

/// Normalize raw history into the canonical message list.
///
/// Truncates to the [`HISTORY_WINDOW`] most recent entries, flattens every
/// content shape to a single string, drops messages that resolve to empty,
/// and coerces unknown roles to `user`. Normalizing an already-normalized
/// list is a no-op.
pub fn normalize(raw: &[RawHistoryEntry]) -> Vec<ChatMessage> {
    let start = raw.len().saturating_sub(HISTORY_WINDOW);
    raw[start..]
        .iter()
        .filter_map(|entry| {
            let content = flatten_content(&entry.content);
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            Some(ChatMessage {
                role: coerce_role(entry.role.as_deref()),
                content: content.to_string(),
            })
        })
        .collect()
}

/// Re-check an already-normalized list immediately before provider
/// dispatch: trims residual whitespace and drops blank turns. Content is a
/// flat string by type from normalization on, so blank turns are the only
/// residual hazard a provider could still see.
pub fn sanitize(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|message| {
            let content = message.content.trim();
            if content.is_empty() {
                return None;
            }
            Some(ChatMessage {
                role: message.role,
                content: content.to_string(),
            })
        })
        .collect()
}

fn coerce_role(role: Option<&str>) -> MessageRole {
    match role.map(|r| r.to_ascii_lowercase()).as_deref() {
        Some("system") => MessageRole::System,
        Some("assistant") => MessageRole::Assistant,
        _ => MessageRole::User,
    }
}

/// Resolve any content shape to a flat string.
fn flatten_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(fragments) => {
            let parts: Vec<String> = fragments
                .iter()
                .map(resolve_fragment)
                .filter(|part| !part.is_empty())
                .collect();
            parts.join(" ")
        }
        Value::Object(_) => resolve_fragment(value),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Resolve one content fragment, preferring `text`, then `content`, then
/// `message`, else its string representation.
fn resolve_fragment(fragment: &Value) -> String {
    match fragment {
        Value::String(text) => text.trim().to_string(),
        Value::Object(fields) => {
            for key in ["text", "content", "message"] {
                match fields.get(key) {
                    Some(Value::String(text)) => return text.trim().to_string(),
                    Some(Value::Null) | None => continue,
                    Some(other) => return other.to_string(),
                }
            }
            fragment.to_string()
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(role: &str, content: Value) -> RawHistoryEntry {
        RawHistoryEntry {
            role: Some(role.to_string()),
            content,
        }
    }

    #[test]
    fn plain_string_passes_through() {
        let out = normalize(&[raw("user", json!("Where is Arnob located?"))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, MessageRole::User);
        assert_eq!(out[0].content, "Where is Arnob located?");
    }

    #[test]
    fn fragment_list_joins_with_single_spaces() {
        let out = normalize(&[raw(
            "user",
            json!([
                {"type": "input_text", "text": "hi"},
                {"type": "input_text", "text": "there"}
            ]),
        )]);
        assert_eq!(out[0].content, "hi there");
    }

    #[test]
    fn empty_fragments_are_dropped_from_join() {
        let out = normalize(&[raw(
            "user",
            json!([{"text": "hello"}, {"text": "  "}, {"text": "world"}]),
        )]);
        assert_eq!(out[0].content, "hello world");
    }

    #[test]
    fn single_fragment_object_resolves() {
        let out = normalize(&[raw("assistant", json!({"content": "an answer"}))]);
        assert_eq!(out[0].content, "an answer");
        assert_eq!(out[0].role, MessageRole::Assistant);
    }

    #[test]
    fn fragment_prefers_text_over_content_and_message() {
        let out = normalize(&[raw(
            "user",
            json!([{"message": "c", "content": "b", "text": "a"}]),
        )]);
        assert_eq!(out[0].content, "a");
    }

    #[test]
    fn non_string_content_is_stringified() {
        let out = normalize(&[raw("user", json!(42))]);
        assert_eq!(out[0].content, "42");
    }

    #[test]
    fn blank_messages_are_eliminated() {
        let out = normalize(&[
            raw("user", json!("   ")),
            raw("user", json!("")),
            raw("user", json!(null)),
            raw("user", json!("real question")),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "real question");
    }

    #[test]
    fn history_is_bounded_to_most_recent_window() {
        let entries: Vec<RawHistoryEntry> = (0..10)
            .map(|i| raw("user", json!(format!("message {i}"))))
            .collect();
        let out = normalize(&entries);
        assert_eq!(out.len(), HISTORY_WINDOW);
        assert_eq!(out[0].content, "message 4");
        assert_eq!(out.last().unwrap().content, "message 9");
    }

    #[test]
    fn unknown_and_missing_roles_default_to_user() {
        let out = normalize(&[
            raw("tool", json!("a")),
            RawHistoryEntry {
                role: None,
                content: json!("b"),
            },
            raw("SYSTEM", json!("c")),
        ]);
        assert_eq!(out[0].role, MessageRole::User);
        assert_eq!(out[1].role, MessageRole::User);
        assert_eq!(out[2].role, MessageRole::System);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw_input = vec![
            raw("user", json!([{"text": "hi"}, {"text": "there"}])),
            raw("assistant", json!({"content": "hello!"})),
            raw("user", json!("  padded  ")),
        ];

        let once = normalize(&raw_input);
        let as_raw: Vec<RawHistoryEntry> = once.iter().map(RawHistoryEntry::from).collect();
        let twice = normalize(&as_raw);

        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_drops_blank_turns() {
        let messages = vec![
            ChatMessage::user("  question  "),
            ChatMessage::assistant("   "),
        ];
        let out = sanitize(&messages);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "question");
    }
}
