//! Fallback-route context fetch with bounded degradation.
//!
//! Retrieval is best-effort: a failing backend degrades to a simpler
//! query and finally to an empty chunk list, never to a failed turn.

use pc_domain::config::RetrievalConfig;
use pc_domain::trace::TraceEvent;

use crate::chunk::RetrievedChunk;
use crate::client::{RetrievalBackend, TwoPassQuery, VectorQuery};
use crate::gate::FallbackStrategy;

/// Fetch context chunks for a fallback-route turn.
///
/// Runs the chosen strategy once. On any failure, retries exactly once
/// with a plain vector query regardless of the original strategy. If
/// that also fails, returns an empty list so the model answers without
/// augmented context. This never returns an error.
pub async fn fetch_context(
    backend: &dyn RetrievalBackend,
    strategy: FallbackStrategy,
    query_text: &str,
    history: &[String],
    cfg: &RetrievalConfig,
) -> Vec<RetrievedChunk> {
    let primary = match strategy {
        FallbackStrategy::Vector => {
            backend
                .vector_query(&VectorQuery {
                    query: query_text.to_owned(),
                    top_k: cfg.top_k,
                })
                .await
        }
        FallbackStrategy::TwoPass => {
            let tail = history
                .iter()
                .rev()
                .take(cfg.history_turns)
                .rev()
                .cloned()
                .collect();
            backend
                .two_pass_query(&TwoPassQuery {
                    query: query_text.to_owned(),
                    history: tail,
                    top_k: cfg.top_k,
                })
                .await
        }
    };

    let primary_err = match primary {
        Ok(chunks) => return chunks,
        Err(e) => e,
    };

    tracing::warn!(
        strategy = strategy.as_str(),
        error = %primary_err,
        "retrieval failed, retrying with vector query"
    );
    TraceEvent::RetrievalFallback {
        from_strategy: strategy.as_str().into(),
        reason: primary_err.to_string(),
    }
    .emit();

    // One retry on the simplest path, then give up.
    match backend
        .vector_query(&VectorQuery {
            query: query_text.to_owned(),
            top_k: cfg.top_k,
        })
        .await
    {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(error = %e, "vector retry failed, proceeding without context");
            TraceEvent::RetrievalEmpty {
                reason: e.to_string(),
            }
            .emit();
            Vec::new()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pc_domain::error::{Error, Result};

    /// Scripted backend that counts calls and fails on demand.
    struct FakeBackend {
        vector_calls: Mutex<usize>,
        two_pass_calls: Mutex<usize>,
        vector_fails: bool,
        two_pass_fails: bool,
        chunks: Vec<RetrievedChunk>,
    }

    impl FakeBackend {
        fn new(vector_fails: bool, two_pass_fails: bool) -> Self {
            Self {
                vector_calls: Mutex::new(0),
                two_pass_calls: Mutex::new(0),
                vector_fails,
                two_pass_fails,
                chunks: vec![RetrievedChunk::new("doc-1", "Handbook", 0.9, "chunk text")],
            }
        }
    }

    #[async_trait]
    impl RetrievalBackend for FakeBackend {
        async fn vector_query(&self, _q: &VectorQuery) -> Result<Vec<RetrievedChunk>> {
            *self.vector_calls.lock() += 1;
            if self.vector_fails {
                Err(Error::Retrieval("index timeout".into()))
            } else {
                Ok(self.chunks.clone())
            }
        }

        async fn two_pass_query(&self, q: &TwoPassQuery) -> Result<Vec<RetrievedChunk>> {
            *self.two_pass_calls.lock() += 1;
            assert!(q.history.len() <= 6);
            if self.two_pass_fails {
                Err(Error::Retrieval("rewriter unavailable".into()))
            } else {
                Ok(self.chunks.clone())
            }
        }
    }

    fn cfg() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    #[tokio::test]
    async fn vector_success_returns_chunks() {
        let backend = FakeBackend::new(false, false);
        let chunks =
            fetch_context(&backend, FallbackStrategy::Vector, "query", &[], &cfg()).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(*backend.vector_calls.lock(), 1);
        assert_eq!(*backend.two_pass_calls.lock(), 0);
    }

    #[tokio::test]
    async fn two_pass_failure_triggers_exactly_one_vector_retry() {
        let backend = FakeBackend::new(false, true);
        let chunks =
            fetch_context(&backend, FallbackStrategy::TwoPass, "query", &[], &cfg()).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(*backend.two_pass_calls.lock(), 1);
        assert_eq!(*backend.vector_calls.lock(), 1);
    }

    #[tokio::test]
    async fn double_failure_yields_empty_not_error() {
        let backend = FakeBackend::new(true, true);
        let chunks =
            fetch_context(&backend, FallbackStrategy::TwoPass, "query", &[], &cfg()).await;
        assert!(chunks.is_empty());
        assert_eq!(*backend.two_pass_calls.lock(), 1);
        assert_eq!(*backend.vector_calls.lock(), 1);
    }

    #[tokio::test]
    async fn vector_failure_retries_vector_once_then_empty() {
        let backend = FakeBackend::new(true, false);
        let chunks =
            fetch_context(&backend, FallbackStrategy::Vector, "query", &[], &cfg()).await;
        assert!(chunks.is_empty());
        // primary attempt + one retry, nothing more
        assert_eq!(*backend.vector_calls.lock(), 2);
    }

    #[tokio::test]
    async fn two_pass_history_is_capped_to_recent_turns() {
        let backend = FakeBackend::new(false, false);
        let history: Vec<String> = (0..20).map(|i| format!("turn {i}")).collect();
        let chunks =
            fetch_context(&backend, FallbackStrategy::TwoPass, "query", &history, &cfg()).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(*backend.two_pass_calls.lock(), 1);
    }
}
