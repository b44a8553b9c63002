//! Turn execution — the stream orchestrator.
//!
//! Entry point: [`run_turn`] spawns the async pipeline and returns a
//! channel of [`TurnEvent`]s for the SSE bridge. One turn moves through
//! invoking (credential + capability + retrieval + prompt), streaming,
//! and finalizing; everything in finalizing is independently wrapped so
//! a failing side effect can never undo a response that already
//! streamed.

use std::time::Instant;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::Instrument;

use pc_domain::message::{NormalizedMessage, ReasoningEffort, ReasoningTrace, Role, Verbosity};
use pc_domain::stream::{StreamEvent, Usage};
use pc_domain::trace::TraceEvent;
use pc_providers::{ChatStreamRequest, GuestCredential, ProviderTool, UserContext};
use pc_retrieval::{fetch_context, RetrievalDecision, RetrievedChunk};

use crate::persist::AssistantTurn;
use crate::runtime::reasoning::extract_reasoning;
use crate::runtime::tracer::{RunMeta, RunOutputs};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnEvent — the SSE event type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events emitted during a single chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnEvent {
    /// Incremental assistant text.
    #[serde(rename = "delta")]
    Delta { text: String },

    /// Incremental reasoning content from the model's reasoning channel.
    #[serde(rename = "reasoning")]
    Reasoning { text: String },

    /// The final assistant message, cleaned of inline reasoning markers.
    #[serde(rename = "final")]
    Final { content: String },

    /// Token usage for the turn.
    #[serde(rename = "usage")]
    UsageEvent {
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
    },

    /// An error occurred before any content streamed.
    #[serde(rename = "error")]
    Error { message: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything one turn needs, validated and normalized by the HTTP
/// handler before the pipeline starts.
pub struct TurnInput {
    pub chat_id: String,
    pub user_id: String,
    pub is_authenticated: bool,
    pub messages: Vec<NormalizedMessage>,
    pub model: String,
    pub system_prompt_override: Option<String>,
    pub enable_search: bool,
    pub temperature: Option<f32>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub verbosity: Option<Verbosity>,
    pub context_tag: Option<String>,
    pub personality_tag: Option<String>,
    pub guest: Option<GuestCredential>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn — the orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run one chat turn. Returns a channel receiver of [`TurnEvent`]s; the
/// caller reads events as they arrive for SSE streaming.
pub fn run_turn(state: AppState, input: TurnInput) -> mpsc::Receiver<TurnEvent> {
    let (tx, rx) = mpsc::channel::<TurnEvent>(64);

    let turn_span = tracing::info_span!(
        "turn",
        chat_id = %input.chat_id,
        model = %input.model,
        "otel.kind" = "SERVER",
    );
    tokio::spawn(
        async move {
            tracing::debug!("turn started");
            if let Err(e) = run_turn_inner(state, input, tx.clone()).await {
                tracing::warn!(error = %e, "turn failed before streaming");
                let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
            }
        }
        .instrument(turn_span),
    );

    rx
}

async fn run_turn_inner(
    state: AppState,
    input: TurnInput,
    tx: mpsc::Sender<TurnEvent>,
) -> pc_domain::error::Result<()> {
    // ── Invoking: capability + credential resolution ───────────────
    let profile = state.models.resolve(&input.model)?.clone();

    let user = UserContext {
        user_id: input.user_id.clone(),
        is_authenticated: input.is_authenticated,
    };
    let resolution = state
        .credentials
        .resolve(&user, &profile, input.guest.as_ref())
        .await;

    // ── Retrieval gate ─────────────────────────────────────────────
    let decision = RetrievalDecision::decide(
        input.enable_search,
        profile.supports_file_search,
        state.config.retrieval.two_pass_enabled,
    );
    TraceEvent::RetrievalDecided {
        mode: decision.mode_str().into(),
        strategy: match decision {
            RetrievalDecision::Fallback { strategy } => Some(strategy.as_str().into()),
            _ => None,
        },
    }
    .emit();

    let run_id = state
        .tracer
        .start(&RunMeta {
            chat_id: input.chat_id.clone(),
            user_id: input.user_id.clone(),
            model: profile.canonical_id.clone(),
            retrieval_mode: decision.mode_str().into(),
        })
        .await;

    let chunks: Vec<RetrievedChunk> = match decision {
        RetrievalDecision::Fallback { strategy } => {
            let query = latest_user_text(&input.messages);
            let history = history_texts(&input.messages);
            fetch_context(
                state.retrieval.as_ref(),
                strategy,
                &query,
                &history,
                &state.config.retrieval,
            )
            .await
        }
        _ => Vec::new(),
    };

    // ── Prompt composition (persona override wins outright) ────────
    let persona = state
        .personas
        .override_prompt(input.context_tag.as_deref(), input.personality_tag.as_deref());
    let system_prompt = match persona {
        Some(persona) => persona.to_owned(),
        None => pc_prompt::compose(
            input.system_prompt_override.as_deref(),
            decision,
            &chunks,
            state.config.retrieval.budget_tokens,
        ),
    };

    // User turn goes down best-effort before the provider call.
    if let Err(e) = state
        .chats
        .save_user_turn(&input.chat_id, &input.user_id, &input.messages)
        .await
    {
        tracing::warn!(error = %e, "user turn persistence failed");
    }

    // ── Provider call ──────────────────────────────────────────────
    let provider = state.connector.connect(&profile, &resolution).await?;

    let reasoning_effort = profile.reasoning_capable.then(|| {
        input
            .reasoning_effort
            .unwrap_or(state.config.llm.default_reasoning_effort)
    });
    let tools = match decision {
        RetrievalDecision::NativeTool => vec![ProviderTool::FileSearch {
            top_k: state.config.retrieval.top_k,
        }],
        _ => Vec::new(),
    };

    let req = ChatStreamRequest {
        system_prompt,
        messages: conversation_messages(&input.messages),
        model: profile.canonical_id.clone(),
        temperature: profile.effective_temperature(input.temperature),
        max_output_tokens: None,
        reasoning_effort,
        verbosity: input.verbosity,
        tools,
    };

    let started = Instant::now();
    let mut stream = provider.chat_stream(&req).await?;

    // ── Streaming ──────────────────────────────────────────────────
    let llm_span = tracing::info_span!(
        "llm.call",
        provider = profile.provider.as_str(),
        model = %profile.canonical_id,
        "otel.kind" = "CLIENT",
        prompt_tokens = tracing::field::Empty,
        completion_tokens = tracing::field::Empty,
    );

    let (accumulated, streamed_reasoning, usage, final_message) = async {
        let mut accumulated = String::new();
        let mut streamed_reasoning: Vec<ReasoningTrace> = Vec::new();
        let mut usage: Option<Usage> = None;
        let mut final_message: Option<Value> = None;

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Token { text }) => {
                    accumulated.push_str(&text);
                    let _ = tx.send(TurnEvent::Delta { text }).await;
                }
                Ok(StreamEvent::Reasoning { text }) => {
                    match streamed_reasoning.last_mut() {
                        Some(trace) => trace.content.push_str(&text),
                        None => streamed_reasoning.push(ReasoningTrace {
                            kind: "stream".into(),
                            content: text.clone(),
                        }),
                    }
                    let _ = tx.send(TurnEvent::Reasoning { text }).await;
                }
                Ok(StreamEvent::Done {
                    usage: done_usage,
                    finish_reason,
                    final_message: done_message,
                }) => {
                    if done_usage.is_some() {
                        usage = done_usage;
                    }
                    if done_message.is_some() {
                        final_message = done_message;
                    }
                    tracing::debug!(finish_reason = ?finish_reason, "stream finished");
                }
                Ok(StreamEvent::Error { message }) => {
                    // Logged; the stream is allowed to end on its own terms.
                    tracing::warn!(message, "provider error event during stream");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stream error, partial response stands");
                }
            }
        }

        if let Some(u) = &usage {
            tracing::Span::current().record("prompt_tokens", u.prompt_tokens);
            tracing::Span::current().record("completion_tokens", u.completion_tokens);
        }

        (accumulated, streamed_reasoning, usage, final_message)
    }
    .instrument(llm_span)
    .await;

    TraceEvent::LlmRequest {
        provider: profile.provider.as_str().into(),
        model: profile.canonical_id.clone(),
        streaming: true,
        duration_ms: started.elapsed().as_millis() as u64,
        prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
    }
    .emit();

    // ── Finalizing ─────────────────────────────────────────────────
    let assistant_text = extract_final_text(final_message.as_ref()).unwrap_or(accumulated);

    let (cleaned, mut traces) = if profile.reasoning_capable {
        let (cleaned, extracted) = extract_reasoning(&assistant_text);
        if !extracted.is_empty() {
            TraceEvent::ReasoningExtracted {
                model: profile.canonical_id.clone(),
                trace_count: extracted.len(),
                total_chars: extracted.iter().map(|t| t.content.len()).sum(),
            }
            .emit();
        }
        (cleaned, extracted)
    } else {
        (assistant_text, Vec::new())
    };
    traces.splice(0..0, streamed_reasoning);

    // Each side effect stands alone: persistence, metering, and the
    // trace close all run regardless of the others failing.
    let persisted = {
        let turn = AssistantTurn {
            chat_id: input.chat_id.clone(),
            user_id: input.user_id.clone(),
            model: profile.canonical_id.clone(),
            content: cleaned.clone(),
            reasoning_traces: traces.clone(),
            run_id: run_id.clone(),
            reasoning_effort: reasoning_effort.unwrap_or_default(),
        };
        match state.chats.save_assistant_turn(&turn).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "assistant turn persistence failed");
                false
            }
        }
    };

    state.metrics.record_credential_usage(
        resolution.source,
        profile.provider,
        &profile.canonical_id,
    );

    let traced = match &run_id {
        Some(id) => {
            state
                .tracer
                .finish(
                    id,
                    &RunOutputs {
                        assistant_text: cleaned.clone(),
                        reasoning_trace_count: traces.len(),
                        usage: usage.clone(),
                    },
                )
                .await;
            true
        }
        None => false,
    };

    TraceEvent::TurnFinalized {
        chat_id: input.chat_id.clone(),
        model: profile.canonical_id.clone(),
        persisted,
        traced,
        run_id: run_id.clone(),
    }
    .emit();

    let _ = tx.send(TurnEvent::Final { content: cleaned }).await;
    if let Some(usage) = usage {
        let _ = tx
            .send(TurnEvent::UsageEvent {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .await;
    }

    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The latest user message text, used as the retrieval query.
fn latest_user_text(messages: &[NormalizedMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.joined_text())
        .unwrap_or_default()
}

/// Prior turn texts (everything but the latest user message), for the
/// two-pass query rewriter.
fn history_texts(messages: &[NormalizedMessage]) -> Vec<String> {
    let last_user = messages.iter().rposition(|m| m.role == Role::User);
    messages
        .iter()
        .enumerate()
        .filter(|(i, m)| Some(*i) != last_user && m.role != Role::System)
        .map(|(_, m)| m.joined_text())
        .collect()
}

/// Conversation messages sent to the provider: system messages are
/// carried in the composed prompt, not the message list.
fn conversation_messages(messages: &[NormalizedMessage]) -> Vec<NormalizedMessage> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect()
}

/// Extract the assistant's full text from whatever shape the final
/// message takes. Checked in priority order: string `content`,
/// array-of-parts `content`, then a `parts` field.
fn extract_final_text(message: Option<&Value>) -> Option<String> {
    let message = message?;

    if let Some(text) = message.get("content").and_then(|c| c.as_str()) {
        return Some(text.to_owned());
    }

    if let Some(items) = message.get("content").and_then(|c| c.as_array()) {
        return Some(join_text_items(items));
    }

    if let Some(items) = message.get("parts").and_then(|p| p.as_array()) {
        return Some(join_text_items(items));
    }

    None
}

fn join_text_items(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => item.get("text").and_then(|t| t.as_str()),
            _ => None,
        })
        .collect::<Vec<&str>>()
        .join("")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn final_text_prefers_string_content() {
        let msg = json!({"content": "plain", "parts": [{"text": "ignored"}]});
        assert_eq!(extract_final_text(Some(&msg)).as_deref(), Some("plain"));
    }

    #[test]
    fn final_text_joins_array_content() {
        let msg = json!({"content": ["a", {"type": "text", "text": "b"}, 7]});
        assert_eq!(extract_final_text(Some(&msg)).as_deref(), Some("ab"));
    }

    #[test]
    fn final_text_falls_back_to_parts() {
        let msg = json!({"parts": [{"type": "text", "text": "from parts"}]});
        assert_eq!(
            extract_final_text(Some(&msg)).as_deref(),
            Some("from parts")
        );
    }

    #[test]
    fn final_text_none_for_unusable_shapes() {
        assert_eq!(extract_final_text(None), None);
        assert_eq!(extract_final_text(Some(&json!({"content": 42}))), None);
    }

    #[test]
    fn latest_user_text_skips_assistant() {
        let messages = vec![
            NormalizedMessage::user("first question"),
            NormalizedMessage::assistant("an answer"),
            NormalizedMessage::user("second question"),
        ];
        assert_eq!(latest_user_text(&messages), "second question");
    }

    #[test]
    fn history_excludes_latest_user_and_system() {
        let messages = vec![
            NormalizedMessage::system("rules"),
            NormalizedMessage::user("q1"),
            NormalizedMessage::assistant("a1"),
            NormalizedMessage::user("q2"),
        ];
        assert_eq!(history_texts(&messages), vec!["q1", "a1"]);
    }
}
