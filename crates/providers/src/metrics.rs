//! Usage metering contract.
//!
//! Every credential resolution and every completed turn is metered
//! through a [`MetricsSink`]. Calls are fire-and-forget: implementations
//! must not block the pipeline, and a failing sink is the sink's problem,
//! never the caller's.

use crate::credentials::CredentialSource;
use crate::models::ProviderId;
use pc_domain::trace::TraceEvent;

pub trait MetricsSink: Send + Sync {
    fn record_credential_usage(&self, source: CredentialSource, provider: ProviderId, model: &str);

    fn record_credential_error(&self, kind: &str, provider: ProviderId);
}

/// Default sink: emits structured trace events on the log stream, where
/// the metering pipeline picks them up.
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn record_credential_usage(&self, source: CredentialSource, provider: ProviderId, model: &str) {
        tracing::debug!(
            source = source.as_str(),
            provider = provider.as_str(),
            model,
            "credential usage"
        );
    }

    fn record_credential_error(&self, kind: &str, provider: ProviderId) {
        TraceEvent::CredentialError {
            kind: kind.into(),
            provider: provider.as_str().into(),
        }
        .emit();
    }
}
