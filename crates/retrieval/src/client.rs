//! Retrieval backend trait and the REST implementation.
//!
//! `RestRetrievalClient` wraps a `reqwest::Client` and translates the
//! trait methods into HTTP calls against the vector search service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pc_domain::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pc_domain::config::RetrievalConfig;

use crate::chunk::RetrievedChunk;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request DTOs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
pub struct VectorQuery {
    pub query: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwoPassQuery {
    pub query: String,
    /// Trailing conversation turns, oldest first, for the query rewriter.
    pub history: Vec<String>,
    pub top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    chunks: Vec<RetrievedChunk>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Abstraction over the vector search service, so the pipeline and its
/// tests can substitute fakes.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    /// Single similarity search over the latest user message.
    async fn vector_query(&self, query: &VectorQuery) -> Result<Vec<RetrievedChunk>>;

    /// Rewrite the query against recent history, then search.
    async fn two_pass_query(&self, query: &TwoPassQuery) -> Result<Vec<RetrievedChunk>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// REST client for the vector search service. Created once at startup
/// and reused; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct RestRetrievalClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestRetrievalClient {
    pub fn new(cfg: &RetrievalConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: std::env::var(&cfg.key_env).ok(),
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let mut rb = rb
            .header("X-Client-Type", "polychat")
            .header("X-Trace-Id", &trace_id);
        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_search<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Vec<RetrievedChunk>> {
        let start = Instant::now();
        let rb = self.decorate(self.http.post(self.url(endpoint)).json(body));
        let resp = rb
            .send()
            .await
            .map_err(|e| retrieval_err(endpoint, &e.to_string()))?;

        let status = resp.status();
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(endpoint, status = status.as_u16(), duration_ms, "retrieval call");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(retrieval_err(
                endpoint,
                &format!("HTTP {} - {}", status.as_u16(), body),
            ));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| retrieval_err(endpoint, &e.to_string()))?;
        Ok(parsed.chunks)
    }
}

fn retrieval_err(endpoint: &str, detail: &str) -> Error {
    Error::Retrieval(format!("{endpoint}: {detail}"))
}

#[async_trait]
impl RetrievalBackend for RestRetrievalClient {
    async fn vector_query(&self, query: &VectorQuery) -> Result<Vec<RetrievedChunk>> {
        self.post_search("/api/search/vector", query).await
    }

    async fn two_pass_query(&self, query: &TwoPassQuery) -> Result<Vec<RetrievedChunk>> {
        self.post_search("/api/search/two-pass", query).await
    }
}
