//! Message normalization.
//!
//! Inbound messages arrive in several historical encodings: plain string
//! content, arrays of mixed parts, or already-typed `parts`. Everything
//! is classified once into a [`RawShape`] and handled by one exhaustive
//! match, instead of shape-sniffing at every call site.
//!
//! A malformed message degrades to a role-appropriate placeholder part;
//! only a sequence that is empty after dropping null entries fails the
//! request.

use pc_domain::error::{Error, Result};
use pc_domain::message::{MessagePart, NormalizedMessage, Role};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shape classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The recognized encodings of a raw message body.
enum RawShape<'a> {
    /// `content` is a plain string.
    StringContent(&'a str),
    /// `content` is an array of mixed parts.
    ArrayContent(&'a [Value]),
    /// The message carries a typed `parts` array already.
    PartsContent(&'a [Value]),
    /// Anything else.
    Unrecognized,
}

fn classify(msg: &Value) -> RawShape<'_> {
    if let Some(parts) = msg.get("parts").and_then(|p| p.as_array()) {
        return RawShape::PartsContent(parts);
    }
    match msg.get("content") {
        Some(Value::String(s)) => RawShape::StringContent(s),
        Some(Value::Array(items)) => RawShape::ArrayContent(items),
        _ => RawShape::Unrecognized,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Normalize a raw message sequence.
///
/// # Errors
///
/// [`Error::Validation`] only when the sequence is empty after dropping
/// null entries. A single malformed message never aborts the batch.
pub fn normalize(raw: &[Value]) -> Result<Vec<NormalizedMessage>> {
    let messages: Vec<NormalizedMessage> = raw
        .iter()
        .filter(|m| !m.is_null())
        .map(normalize_one)
        .collect();

    if messages.is_empty() {
        return Err(Error::Validation("messages must be non-empty".into()));
    }
    Ok(messages)
}

fn normalize_one(msg: &Value) -> NormalizedMessage {
    let role = Role::normalize(msg.get("role").and_then(|r| r.as_str()).unwrap_or(""));
    let id = msg
        .get("id")
        .and_then(|i| i.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let parts = match classify(msg) {
        RawShape::StringContent(text) => vec![MessagePart::Text { text: text.into() }],
        RawShape::ArrayContent(items) => array_to_parts(items, role),
        RawShape::PartsContent(items) => parts_passthrough(items, role),
        RawShape::Unrecognized => vec![MessagePart::Text {
            text: role.placeholder_text().into(),
        }],
    };

    // Parts must be non-empty after normalization.
    let parts = if parts.is_empty() {
        vec![MessagePart::Text {
            text: role.placeholder_text().into(),
        }]
    } else {
        parts
    };

    NormalizedMessage { id, role, parts }
}

/// Map an array-of-mixed-parts content body.
fn array_to_parts(items: &[Value], role: Role) -> Vec<MessagePart> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::String(s) => MessagePart::Text { text: s.clone() },
            Value::Object(_) => object_to_part(item, role),
            other => MessagePart::Text {
                text: other.to_string(),
            },
        })
        .collect()
}

/// An already-typed `parts` array passes through unchanged when each
/// entry deserializes cleanly; anything else degrades per entry.
fn parts_passthrough(items: &[Value], role: Role) -> Vec<MessagePart> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match serde_json::from_value::<MessagePart>(item.clone()) {
            Ok(part) => part,
            Err(_) => object_to_part(item, role),
        })
        .collect()
}

/// Best-effort conversion of an untyped object: a recognizable typed
/// part is kept, a `text`/`content` field is lifted, anything else is
/// stringified.
fn object_to_part(item: &Value, _role: Role) -> MessagePart {
    if let Ok(part) = serde_json::from_value::<MessagePart>(item.clone()) {
        return part;
    }
    if let Some(text) = item
        .get("text")
        .or_else(|| item.get("content"))
        .and_then(|t| t.as_str())
    {
        return MessagePart::Text { text: text.into() };
    }
    MessagePart::Text {
        text: item.to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_content_becomes_text_part() {
        let msgs = normalize(&[json!({"role": "user", "content": "hello"})]).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(
            msgs[0].parts,
            vec![MessagePart::Text {
                text: "hello".into()
            }]
        );
    }

    #[test]
    fn array_content_maps_each_element() {
        let msgs = normalize(&[json!({
            "role": "user",
            "content": [
                "first",
                {"type": "text", "text": "second"},
                {"text": "third"},
                42,
            ]
        })])
        .unwrap();
        let texts: Vec<String> = msgs[0]
            .parts
            .iter()
            .map(|p| match p {
                MessagePart::Text { text } => text.clone(),
                other => panic!("unexpected part {other:?}"),
            })
            .collect();
        assert_eq!(texts, vec!["first", "second", "third", "42"]);
    }

    #[test]
    fn typed_parts_pass_through() {
        let msgs = normalize(&[json!({
            "role": "user",
            "parts": [
                {"type": "text", "text": "hi"},
                {"type": "file", "url": "https://x.test/a.pdf", "name": "a.pdf"},
            ]
        })])
        .unwrap();
        assert_eq!(msgs[0].parts.len(), 2);
        assert!(matches!(msgs[0].parts[1], MessagePart::File { .. }));
    }

    #[test]
    fn malformed_message_degrades_to_placeholder() {
        let msgs = normalize(&[
            json!({"role": "user", "content": "fine"}),
            json!({"role": "assistant", "content": 7}),
        ])
        .unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[1].parts,
            vec![MessagePart::Text {
                text: "[Assistant response]".into()
            }]
        );
    }

    #[test]
    fn unrecognized_role_cannot_become_system() {
        let msgs = normalize(&[json!({"role": "superuser", "content": "x"})]).unwrap();
        assert_eq!(msgs[0].role, Role::User);
    }

    #[test]
    fn null_entries_dropped_but_batch_survives() {
        let msgs = normalize(&[
            Value::Null,
            json!({"role": "user", "content": "kept"}),
        ])
        .unwrap();
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn empty_after_filtering_is_a_validation_error() {
        assert!(matches!(normalize(&[]), Err(Error::Validation(_))));
        assert!(matches!(
            normalize(&[Value::Null, Value::Null]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn empty_parts_array_gets_placeholder() {
        let msgs = normalize(&[json!({"role": "user", "parts": []})]).unwrap();
        assert_eq!(
            msgs[0].parts,
            vec![MessagePart::Text {
                text: "[User message]".into()
            }]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize(&[json!({
            "role": "user",
            "content": ["a", {"type": "text", "text": "b"}]
        })])
        .unwrap();

        // Re-encode and run through again: no structural change.
        let reencoded: Vec<Value> = first
            .iter()
            .map(|m| serde_json::to_value(m).unwrap())
            .collect();
        let second = normalize(&reencoded).unwrap();

        assert_eq!(first[0].role, second[0].role);
        assert_eq!(first[0].parts, second[0].parts);
        assert_eq!(first[0].id, second[0].id);
    }
}
