use serde::{Deserialize, Serialize};

/// A message in canonical form (provider-agnostic).
///
/// Inbound messages arrive in several historical encodings; the gateway's
/// normalizer collapses all of them into this shape before anything else
/// touches them. Invariant: `parts` is non-empty after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Normalize an arbitrary role string to a canonical role.
    ///
    /// Anything unrecognized becomes `User` so a malformed message can
    /// never be smuggled in as a `system` message.
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            "user" => Role::User,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Placeholder text used when a message body cannot be interpreted.
    pub fn placeholder_text(&self) -> &'static str {
        match self {
            Role::Assistant => "[Assistant response]",
            _ => "[User message]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "file")]
    File {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
}

impl NormalizedMessage {
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            parts,
        }
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![MessagePart::Text { text: text.into() }])
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Concatenated text of all text parts.
    pub fn joined_text(&self) -> String {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        texts.join("\n")
    }
}

/// Requested reasoning effort, forwarded to reasoning-capable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Requested response verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    #[default]
    Medium,
    High,
}

/// A structured excerpt of a model's intermediate reasoning, extracted
/// from its output after the stream completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    /// Which marker produced this trace (e.g. "think", "reasoning").
    pub kind: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_role_defaults_to_user() {
        assert_eq!(Role::normalize("tool"), Role::User);
        assert_eq!(Role::normalize("SYSTEM"), Role::User);
        assert_eq!(Role::normalize(""), Role::User);
    }

    #[test]
    fn canonical_roles_round_trip() {
        for role in ["system", "user", "assistant"] {
            assert_eq!(Role::normalize(role).as_str(), role);
        }
    }

    #[test]
    fn joined_text_skips_file_parts() {
        let msg = NormalizedMessage::new(
            Role::User,
            vec![
                MessagePart::Text { text: "a".into() },
                MessagePart::File {
                    url: "https://example.com/f.pdf".into(),
                    name: None,
                    media_type: None,
                },
                MessagePart::Text { text: "b".into() },
            ],
        );
        assert_eq!(msg.joined_text(), "a\nb");
    }
}
