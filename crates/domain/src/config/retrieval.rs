use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the vector search service.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the service API key, if it needs one.
    #[serde(default = "d_key_env")]
    pub key_env: String,
    #[serde(default = "d_timeout")]
    pub timeout_ms: u64,
    /// When true, fallback retrieval first rewrites the query with a
    /// cheaper model before the vector search (two-pass strategy).
    #[serde(default)]
    pub two_pass_enabled: bool,
    #[serde(default = "d_8")]
    pub top_k: usize,
    /// Token budget for context injected into the system prompt.
    #[serde(default = "d_2048")]
    pub budget_tokens: usize,
    /// How many trailing conversation turns the two-pass rewriter sees.
    #[serde(default = "d_6")]
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            key_env: d_key_env(),
            timeout_ms: d_timeout(),
            two_pass_enabled: false,
            top_k: d_8(),
            budget_tokens: d_2048(),
            history_turns: d_6(),
        }
    }
}

fn d_base_url() -> String {
    "http://127.0.0.1:7700".into()
}
fn d_key_env() -> String {
    "POLYCHAT_RETRIEVAL_KEY".into()
}
fn d_timeout() -> u64 {
    10_000
}
fn d_8() -> usize {
    8
}
fn d_2048() -> usize {
    2048
}
fn d_6() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RetrievalConfig::default();
        assert_eq!(cfg.base_url, "http://127.0.0.1:7700");
        assert_eq!(cfg.key_env, "POLYCHAT_RETRIEVAL_KEY");
        assert_eq!(cfg.timeout_ms, 10_000);
        assert!(!cfg.two_pass_enabled);
        assert_eq!(cfg.top_k, 8);
        assert_eq!(cfg.budget_tokens, 2048);
        assert_eq!(cfg.history_turns, 6);
    }

    #[test]
    fn deserialize_partial_uses_defaults() {
        let cfg: RetrievalConfig = toml::from_str("two_pass_enabled = true").unwrap();
        assert!(cfg.two_pass_enabled);
        assert_eq!(cfg.top_k, 8);
        assert_eq!(cfg.base_url, "http://127.0.0.1:7700");
    }
}
