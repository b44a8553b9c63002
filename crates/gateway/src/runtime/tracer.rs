//! External run tracing, entirely optional and best-effort.
//!
//! When a trace backend is configured, each turn opens a run before the
//! provider call and closes it with final outputs and token usage. Any
//! backend failure degrades to "tracing skipped"; it never fails a turn.

use std::sync::Arc;
use std::time::Duration;

use pc_domain::config::ObservabilityConfig;
use pc_domain::error::{Error, Result};
use pc_domain::stream::Usage;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend contract
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Metadata recorded when a run opens.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub chat_id: String,
    pub user_id: String,
    pub model: String,
    pub retrieval_mode: String,
}

/// Outputs recorded when a run closes.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    pub assistant_text: String,
    pub reasoning_trace_count: usize,
    pub usage: Option<Usage>,
}

#[async_trait::async_trait]
pub trait TraceBackend: Send + Sync {
    async fn create_run(&self, meta: &RunMeta) -> Result<Option<String>>;
    async fn update_run(&self, run_id: &str, outputs: &RunOutputs) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpTraceBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTraceBackend {
    pub fn new(base_url: &str, key_env: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Trace(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: std::env::var(key_env).ok(),
        })
    }

    fn authed(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => rb.header("Authorization", format!("Bearer {key}")),
            None => rb,
        }
    }
}

#[async_trait::async_trait]
impl TraceBackend for HttpTraceBackend {
    async fn create_run(&self, meta: &RunMeta) -> Result<Option<String>> {
        let url = format!("{}/api/runs", self.base_url);
        let resp = self
            .authed(self.http.post(&url).json(meta))
            .send()
            .await
            .map_err(|e| Error::Trace(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Trace(format!("HTTP {}", resp.status().as_u16())));
        }

        let body: serde_json::Value =
            resp.json().await.map_err(|e| Error::Trace(e.to_string()))?;
        Ok(body
            .get("run_id")
            .and_then(|v| v.as_str())
            .map(str::to_owned))
    }

    async fn update_run(&self, run_id: &str, outputs: &RunOutputs) -> Result<()> {
        let url = format!("{}/api/runs/{run_id}", self.base_url);
        let resp = self
            .authed(self.http.patch(&url).json(outputs))
            .send()
            .await
            .map_err(|e| Error::Trace(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Trace(format!("HTTP {}", resp.status().as_u16())));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RunTracer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wraps an optional [`TraceBackend`] with swallow-and-log semantics.
pub struct RunTracer {
    backend: Option<Arc<dyn TraceBackend>>,
}

impl RunTracer {
    pub fn from_config(obs: &ObservabilityConfig) -> Self {
        let backend = obs.trace_backend.as_ref().and_then(|tb| {
            match HttpTraceBackend::new(&tb.base_url, &tb.key_env) {
                Ok(b) => Some(Arc::new(b) as Arc<dyn TraceBackend>),
                Err(e) => {
                    tracing::warn!(error = %e, "trace backend unavailable, run tracing disabled");
                    None
                }
            }
        });
        Self { backend }
    }

    pub fn with_backend(backend: Arc<dyn TraceBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Open a run. Returns `None` when disabled or on backend failure.
    pub async fn start(&self, meta: &RunMeta) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.create_run(meta).await {
            Ok(run_id) => run_id,
            Err(e) => {
                tracing::warn!(error = %e, "run trace create failed, tracing skipped");
                None
            }
        }
    }

    /// Close a run. No-op when disabled; failures are logged only.
    pub async fn finish(&self, run_id: &str, outputs: &RunOutputs) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(e) = backend.update_run(run_id, outputs).await {
            tracing::warn!(run_id, error = %e, "run trace update failed");
        }
    }
}
