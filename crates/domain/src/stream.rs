use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming (provider-agnostic).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A text token chunk.
    #[serde(rename = "token")]
    Token { text: String },

    /// Incremental reasoning content, for models that stream it separately.
    #[serde(rename = "reasoning")]
    Reasoning { text: String },

    /// Stream is finished.
    ///
    /// `final_message` carries the provider's assembled final message when
    /// the wire format delivers one; the finalizer prefers extracting the
    /// assistant text from it (string content, then array content, then a
    /// `parts` field) over the accumulated token buffer.
    #[serde(rename = "done")]
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        final_message: Option<serde_json::Value>,
    },

    /// An error occurred during streaming. The stream is allowed to end
    /// naturally after this; partial output already delivered stands.
    #[serde(rename = "error")]
    Error { message: String },
}

/// Token usage for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
