use pc_domain::error::Result;
use pc_domain::message::{NormalizedMessage, ReasoningEffort, Verbosity};
use pc_domain::stream::{BoxStream, StreamEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic streaming chat request.
#[derive(Debug, Clone, Default)]
pub struct ChatStreamRequest {
    /// Composed system prompt for this turn.
    pub system_prompt: String,
    /// Normalized conversation messages (no system message; that is
    /// carried separately in `system_prompt`).
    pub messages: Vec<NormalizedMessage>,
    /// Canonical model id.
    pub model: String,
    /// Sampling temperature after the pinning policy has been applied.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_output_tokens: Option<u32>,
    /// Forwarded to reasoning-capable models; ignored by the rest.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Response verbosity hint, forwarded when the caller set one.
    pub verbosity: Option<Verbosity>,
    /// Provider-native tools attached to the call.
    pub tools: Vec<ProviderTool>,
}

/// Tools executed on the provider's side; this core only attaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderTool {
    /// The provider's native document-retrieval tool. The model decides
    /// when to invoke it.
    FileSearch { top_k: usize },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every LLM adapter must implement.
///
/// Adapters translate between our internal types and the wire format of
/// each provider's HTTP API. They are built per request by the gateway's
/// connector, never cached process-wide.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a streaming chat completion request.
    async fn chat_stream(
        &self,
        req: &ChatStreamRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
