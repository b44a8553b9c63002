use crate::message::ReasoningEffort;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Unified upstream gateway fronting every provider under one
    /// credential. When enabled it wins the credential precedence chain
    /// unconditionally.
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default = "d_default_model")]
    pub default_model: String,
    #[serde(default)]
    pub default_reasoning_effort: ReasoningEffort,
    #[serde(default = "d_120000u")]
    pub request_timeout_ms: u64,
    /// Per-provider base URL overrides (key = provider id, e.g. "openai").
    /// Used by the environment-tier connector; absent providers use their
    /// well-known endpoint.
    #[serde(default)]
    pub base_urls: std::collections::HashMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            default_model: d_default_model(),
            default_reasoning_effort: ReasoningEffort::default(),
            request_timeout_ms: d_120000u(),
            base_urls: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "d_gateway_url")]
    pub base_url: String,
    /// Env var holding the gateway credential, read at connect time.
    #[serde(default = "d_gateway_key_env")]
    pub key_env: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: d_gateway_url(),
            key_env: d_gateway_key_env(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_default_model() -> String {
    "gpt-4o".into()
}
fn d_120000u() -> u64 {
    120_000
}
fn d_gateway_url() -> String {
    "https://gateway.polychat.dev/v1".into()
}
fn d_gateway_key_env() -> String {
    "POLYCHAT_GATEWAY_KEY".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_disabled_by_default() {
        let cfg = LlmConfig::default();
        assert!(!cfg.gateway.enabled);
        assert_eq!(cfg.default_model, "gpt-4o");
    }

    #[test]
    fn default_reasoning_effort_is_medium() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.default_reasoning_effort, ReasoningEffort::Medium);
    }

    #[test]
    fn deserialize_gateway_section() {
        let toml_str = r#"
            [gateway]
            enabled = true
            base_url = "https://gw.internal/v1"
        "#;
        let cfg: LlmConfig = toml::from_str(toml_str).unwrap();
        assert!(cfg.gateway.enabled);
        assert_eq!(cfg.gateway.base_url, "https://gw.internal/v1");
        assert_eq!(cfg.gateway.key_env, "POLYCHAT_GATEWAY_KEY");
    }
}
