//! Chat persistence contract.
//!
//! Saving turns is fire-and-forget from the pipeline's point of view: the
//! orchestrator logs and discards any error, it never blocks or fails a
//! response over persistence.

use pc_domain::error::Result;
use pc_domain::message::{NormalizedMessage, ReasoningEffort, ReasoningTrace};

/// An assistant turn ready to be persisted after the stream completes.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub chat_id: String,
    pub user_id: String,
    pub model: String,
    pub content: String,
    pub reasoning_traces: Vec<ReasoningTrace>,
    /// Run id from the external trace backend, when one was opened.
    pub run_id: Option<String>,
    pub reasoning_effort: ReasoningEffort,
}

#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    async fn save_user_turn(
        &self,
        chat_id: &str,
        user_id: &str,
        messages: &[NormalizedMessage],
    ) -> Result<()>;

    async fn save_assistant_turn(&self, turn: &AssistantTurn) -> Result<()>;
}

/// Default store: records turns on the log stream only. Deployments with
/// a database swap in their own [`ChatStore`].
pub struct LogChatStore;

#[async_trait::async_trait]
impl ChatStore for LogChatStore {
    async fn save_user_turn(
        &self,
        chat_id: &str,
        user_id: &str,
        messages: &[NormalizedMessage],
    ) -> Result<()> {
        tracing::debug!(chat_id, user_id, count = messages.len(), "user turn");
        Ok(())
    }

    async fn save_assistant_turn(&self, turn: &AssistantTurn) -> Result<()> {
        tracing::debug!(
            chat_id = %turn.chat_id,
            model = %turn.model,
            chars = turn.content.len(),
            traces = turn.reasoning_traces.len(),
            run_id = ?turn.run_id,
            "assistant turn"
        );
        Ok(())
    }
}
