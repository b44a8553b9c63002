//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, the upstream relay gateway, and any other endpoint
//! that follows the OpenAI chat completions contract. Anthropic and
//! Google models are reached through their OpenAI-compatibility surfaces,
//! so one adapter covers the whole registry.

use crate::traits::{ChatStreamRequest, LlmProvider, ProviderTool};
use crate::util::from_reqwest;
use pc_domain::error::{Error, Result};
use pc_domain::message::{NormalizedMessage, ReasoningEffort, Role, Verbosity};
use pc_domain::stream::{BoxStream, StreamEvent, Usage};
use serde_json::Value;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM adapter for any OpenAI-compatible API endpoint.
///
/// Built fresh for every turn from the resolved credential, so two
/// concurrent requests with different keys never share auth state.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create an adapter bound to one endpoint and one key.
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    // ── Internal: build authenticated request builder ──────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    // ── Internal: build the JSON body ─────────────────────────────

    fn build_chat_body(&self, req: &ChatStreamRequest) -> Value {
        let mut messages: Vec<Value> = Vec::with_capacity(req.messages.len() + 1);
        if !req.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": req.system_prompt,
            }));
        }
        messages.extend(req.messages.iter().map(msg_to_openai));

        let mut body = serde_json::json!({
            "model": req.model,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_output_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        if let Some(effort) = req.reasoning_effort {
            body["reasoning_effort"] = Value::String(effort_to_str(effort).into());
        }
        if let Some(verbosity) = req.verbosity {
            body["verbosity"] = Value::String(verbosity_to_str(verbosity).into());
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

// Avoid leaking the key through debug logging of the adapter.
impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("api_key", &crate::util::mask_key(&self.api_key))
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn effort_to_str(effort: ReasoningEffort) -> &'static str {
    match effort {
        ReasoningEffort::Low => "low",
        ReasoningEffort::Medium => "medium",
        ReasoningEffort::High => "high",
    }
}

fn verbosity_to_str(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Low => "low",
        Verbosity::Medium => "medium",
        Verbosity::High => "high",
    }
}

fn msg_to_openai(msg: &NormalizedMessage) -> Value {
    serde_json::json!({
        "role": role_to_str(msg.role),
        "content": msg.joined_text(),
    })
}

fn tool_to_openai(tool: &ProviderTool) -> Value {
    match tool {
        ProviderTool::FileSearch { top_k } => serde_json::json!({
            "type": "file_search",
            "file_search": {"max_num_results": top_k},
        }),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE streaming helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

fn parse_sse_data(data: &str) -> Option<Result<StreamEvent>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(Error::Json(e))),
    };

    let choice = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first());

    // Usage-only chunk (stream_options.include_usage).
    let Some(choice) = choice else {
        if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
            return Some(Ok(StreamEvent::Done {
                usage: Some(usage),
                finish_reason: None,
                final_message: None,
            }));
        }
        return None;
    };

    let delta = choice.get("delta").unwrap_or(&Value::Null);

    // Finish reason. Some compat servers attach a full `message` object
    // to the final chunk; carry it through so finalization can apply its
    // shape-priority text extraction to exactly what the provider sent.
    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        let usage = v.get("usage").and_then(parse_openai_usage);
        let final_message = choice.get("message").cloned().filter(|m| !m.is_null());
        return Some(Ok(StreamEvent::Done {
            usage,
            finish_reason: Some(fr.to_string()),
            final_message,
        }));
    }

    // Reasoning content (DeepSeek-style field, also emitted by the relay
    // gateway for reasoning-capable models).
    if let Some(text) = delta.get("reasoning_content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            return Some(Ok(StreamEvent::Reasoning {
                text: text.to_string(),
            }));
        }
    }

    // Text content delta.
    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            return Some(Ok(StreamEvent::Token {
                text: text.to_string(),
            }));
        }
    }

    None
}

/// Parse a single SSE data line, handling the `[DONE]` sentinel.
/// Returns a `Vec` for compatibility with the shared SSE infrastructure.
fn parse_sse_data_vec(data: &str) -> Vec<Result<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return vec![Ok(StreamEvent::Done {
            usage: None,
            finish_reason: Some("stop".into()),
            final_message: None,
        })];
    }

    match parse_sse_data(data) {
        Some(event) => vec![event],
        None => Vec::new(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat_stream(
        &self,
        req: &ChatStreamRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req);
        let provider_id = self.id.clone();

        tracing::debug!(provider = %self.id, url = %url, model = %req.model, "chat stream request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: provider_id,
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        Ok(crate::sse::sse_response_stream(resp, parse_sse_data_vec))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use pc_domain::message::MessagePart;

    fn adapter() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            "openai",
            "https://api.openai.com/v1/",
            "sk-test",
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        assert_eq!(adapter().base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn debug_masks_api_key() {
        let rendered = format!("{:?}", adapter());
        assert!(!rendered.contains("sk-test"));
    }

    #[test]
    fn body_includes_system_prompt_first() {
        let req = ChatStreamRequest {
            system_prompt: "You are helpful.".into(),
            messages: vec![NormalizedMessage::user("hi")],
            model: "gpt-4o".into(),
            ..Default::default()
        };
        let body = adapter().build_chat_body(&req);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are helpful.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn body_omits_unset_optionals() {
        let req = ChatStreamRequest {
            messages: vec![NormalizedMessage::user("hi")],
            model: "gpt-4o".into(),
            ..Default::default()
        };
        let body = adapter().build_chat_body(&req);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("reasoning_effort").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn body_carries_effort_and_file_search() {
        let req = ChatStreamRequest {
            messages: vec![NormalizedMessage::user("hi")],
            model: "o3".into(),
            temperature: Some(1.0),
            reasoning_effort: Some(ReasoningEffort::High),
            tools: vec![ProviderTool::FileSearch { top_k: 8 }],
            ..Default::default()
        };
        let body = adapter().build_chat_body(&req);
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["tools"][0]["type"], "file_search");
        assert_eq!(body["tools"][0]["file_search"]["max_num_results"], 8);
    }

    #[test]
    fn multi_part_message_flattened_to_text() {
        let msg = NormalizedMessage::new(
            Role::User,
            vec![
                MessagePart::Text { text: "see".into() },
                MessagePart::File {
                    url: "https://x.test/doc.pdf".into(),
                    name: Some("doc.pdf".into()),
                    media_type: Some("application/pdf".into()),
                },
                MessagePart::Text {
                    text: "attached".into(),
                },
            ],
        );
        let v = msg_to_openai(&msg);
        let content = v["content"].as_str().unwrap();
        assert!(content.contains("see"));
        assert!(content.contains("attached"));
    }

    #[test]
    fn parse_token_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        let events = parse_sse_data_vec(data);
        assert!(matches!(
            &events[..],
            [Ok(StreamEvent::Token { text })] if text == "Hello"
        ));
    }

    #[test]
    fn parse_reasoning_delta() {
        let data = r#"{"choices":[{"delta":{"reasoning_content":"thinking..."}}]}"#;
        let events = parse_sse_data_vec(data);
        assert!(matches!(
            &events[..],
            [Ok(StreamEvent::Reasoning { text })] if text == "thinking..."
        ));
    }

    #[test]
    fn parse_finish_with_final_message() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop","message":{"content":"full text"}}]}"#;
        let events = parse_sse_data_vec(data);
        match &events[..] {
            [Ok(StreamEvent::Done {
                finish_reason,
                final_message,
                ..
            })] => {
                assert_eq!(finish_reason.as_deref(), Some("stop"));
                assert_eq!(
                    final_message.as_ref().unwrap()["content"],
                    "full text"
                );
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn parse_usage_only_chunk() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let events = parse_sse_data_vec(data);
        match &events[..] {
            [Ok(StreamEvent::Done { usage, .. })] => {
                let usage = usage.as_ref().unwrap();
                assert_eq!(usage.total_tokens, 15);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn parse_done_sentinel() {
        let events = parse_sse_data_vec("[DONE]");
        assert!(matches!(&events[..], [Ok(StreamEvent::Done { .. })]));
    }

    #[test]
    fn parse_empty_delta_yields_nothing() {
        let data = r#"{"choices":[{"delta":{}}]}"#;
        assert!(parse_sse_data_vec(data).is_empty());
    }

    #[test]
    fn parse_malformed_json_yields_error() {
        let events = parse_sse_data_vec("{not json");
        assert!(matches!(&events[..], [Err(Error::Json(_))]));
    }
}
