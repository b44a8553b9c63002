use serde::Serialize;

/// Structured trace events emitted across all polychat crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CredentialResolved {
        source: String,
        provider: String,
        model: String,
    },
    CredentialError {
        kind: String,
        provider: String,
    },
    RetrievalDecided {
        mode: String,
        strategy: Option<String>,
    },
    RetrievalFallback {
        from_strategy: String,
        reason: String,
    },
    RetrievalEmpty {
        reason: String,
    },
    PromptComposed {
        chunks_injected: usize,
        chunks_dropped: usize,
        budget_tokens: usize,
        prompt_chars: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ReasoningExtracted {
        model: String,
        trace_count: usize,
        total_chars: usize,
    },
    TurnFinalized {
        chat_id: String,
        model: String,
        persisted: bool,
        traced: bool,
        run_id: Option<String>,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pc_event");
    }
}
