use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Observability configuration.
///
/// `otlp_endpoint` controls span export: when `None` (the default) the
/// service does structured JSON logging only; setting it enables
/// OTLP/gRPC export of every `tracing` span.
///
/// `trace_backend` is separate from span export: it configures the
/// external run-trace service that records one run per chat turn with
/// final outputs and token usage. Both are optional and best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// OTLP gRPC endpoint (e.g. `http://localhost:4317`).
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// The `service.name` resource attribute reported to the collector.
    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Trace sampling ratio for OTLP export, 0.0..=1.0.
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,

    /// External run-trace backend. `None` disables run tracing entirely.
    #[serde(default)]
    pub trace_backend: Option<TraceBackendConfig>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
            trace_backend: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBackendConfig {
    /// Base URL of the trace service (e.g. `https://traces.internal`).
    pub base_url: String,
    /// Env var holding the trace service API key, read at startup.
    #[serde(default = "d_trace_key_env")]
    pub key_env: String,
}

fn d_service_name() -> String {
    "polychat".into()
}
fn d_sample_rate() -> f64 {
    1.0
}
fn d_trace_key_env() -> String {
    "POLYCHAT_TRACE_KEY".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_endpoint() {
        let cfg = ObservabilityConfig::default();
        assert!(cfg.otlp_endpoint.is_none());
        assert!(cfg.trace_backend.is_none());
        assert_eq!(cfg.service_name, "polychat");
        assert_eq!(cfg.sample_rate, 1.0);
    }

    #[test]
    fn deserialize_trace_backend() {
        let toml_str = r#"
            [trace_backend]
            base_url = "https://traces.internal"
        "#;
        let cfg: ObservabilityConfig = toml::from_str(toml_str).unwrap();
        let tb = cfg.trace_backend.unwrap();
        assert_eq!(tb.base_url, "https://traces.internal");
        assert_eq!(tb.key_env, "POLYCHAT_TRACE_KEY");
    }
}
