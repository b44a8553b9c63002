//! Credential resolution for provider calls.
//!
//! Exactly one credential source wins per request, checked in a fixed
//! precedence order:
//!
//! 1. **Gateway** — when the unified gateway is enabled it is used
//!    unconditionally; the rest of the chain is never consulted.
//! 2. **User BYOK** — an authenticated user's stored per-provider key.
//!    A store failure is metered and fallen through, never propagated.
//! 3. **Guest header** — a per-request key from the request headers,
//!    honored only when its provider tag matches the resolved model's
//!    provider. A mismatch is ignored silently.
//! 4. **Environment** — terminal tier; the actual env lookup happens at
//!    connect time, outside this resolver.
//!
//! [`CredentialResolver::resolve`] never fails. Raw key values never
//! reach a log line; only the masked form or the source tag does.

use crate::metrics::MetricsSink;
use crate::models::{ModelProfile, ProviderId};
use crate::util::mask_key;
use pc_domain::error::Result;
use pc_domain::trace::TraceEvent;
use serde::Serialize;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    Gateway,
    UserByok,
    GuestHeader,
    Environment,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Gateway => "gateway",
            CredentialSource::UserByok => "user-byok",
            CredentialSource::GuestHeader => "guest-header",
            CredentialSource::Environment => "environment",
        }
    }
}

/// The winning credential path for one request.
///
/// `api_key` is populated only for the BYOK and guest tiers; the gateway
/// and environment tiers defer their key material to connect time.
#[derive(Clone)]
pub struct CredentialResolution {
    pub source: CredentialSource,
    pub api_key: Option<String>,
}

impl CredentialResolution {
    /// Masked form safe for logs.
    pub fn masked(&self) -> String {
        match &self.api_key {
            Some(key) => mask_key(key),
            None => self.source.as_str().to_string(),
        }
    }
}

// Manual Debug impl to avoid leaking key values.
impl std::fmt::Debug for CredentialResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolution")
            .field("source", &self.source)
            .field("api_key", &self.masked())
            .finish()
    }
}

/// A per-request credential passed via request headers by an
/// unauthenticated caller.
#[derive(Clone)]
pub struct GuestCredential {
    /// Declared provider tag (e.g. "openai"). Must match the resolved
    /// model's provider to be honored.
    pub provider: String,
    pub key: String,
}

impl std::fmt::Debug for GuestCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestCredential")
            .field("provider", &self.provider)
            .field("key", &mask_key(&self.key))
            .finish()
    }
}

/// Caller identity as seen by the resolver.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub is_authenticated: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential store contract
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read-only store of per-user, per-provider keys. This core never
/// writes credentials; the store owns its own concurrency control.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn effective_key(&self, user_id: &str, provider: ProviderId) -> Result<Option<String>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CredentialResolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct CredentialResolver {
    gateway_enabled: bool,
    store: Arc<dyn CredentialStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl CredentialResolver {
    pub fn new(
        gateway_enabled: bool,
        store: Arc<dyn CredentialStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            gateway_enabled,
            store,
            metrics,
        }
    }

    /// Walk the precedence chain and return the winning source.
    ///
    /// Infallible by design: every branch resolves, with `environment`
    /// as the universal last resort. Each resolution emits a
    /// usage-metering event tagged with its source.
    pub async fn resolve(
        &self,
        user: &UserContext,
        profile: &ModelProfile,
        guest: Option<&GuestCredential>,
    ) -> CredentialResolution {
        let resolution = self.resolve_inner(user, profile, guest).await;

        TraceEvent::CredentialResolved {
            source: resolution.source.as_str().into(),
            provider: profile.provider.as_str().into(),
            model: profile.canonical_id.clone(),
        }
        .emit();
        self.metrics
            .record_credential_usage(resolution.source, profile.provider, &profile.canonical_id);

        resolution
    }

    async fn resolve_inner(
        &self,
        user: &UserContext,
        profile: &ModelProfile,
        guest: Option<&GuestCredential>,
    ) -> CredentialResolution {
        // Tier 1: gateway short-circuits everything.
        if self.gateway_enabled {
            return CredentialResolution {
                source: CredentialSource::Gateway,
                api_key: None,
            };
        }

        // Tier 2: stored BYOK key for authenticated users.
        if user.is_authenticated && !user.user_id.is_empty() {
            match self.store.effective_key(&user.user_id, profile.provider).await {
                Ok(Some(key)) => {
                    tracing::debug!(
                        provider = profile.provider.as_str(),
                        key = %mask_key(&key),
                        "resolved stored user key"
                    );
                    return CredentialResolution {
                        source: CredentialSource::UserByok,
                        api_key: Some(key),
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    // Recorded, not propagated: fall through to the next tier.
                    tracing::warn!(
                        provider = profile.provider.as_str(),
                        error = %e,
                        "credential store lookup failed, falling through"
                    );
                    TraceEvent::CredentialError {
                        kind: "credential_lookup_failed".into(),
                        provider: profile.provider.as_str().into(),
                    }
                    .emit();
                    self.metrics
                        .record_credential_error("credential_lookup_failed", profile.provider);
                }
            }
        }

        // Tier 3: guest header, only when the provider tag matches.
        if let Some(guest) = guest {
            match ProviderId::parse(&guest.provider) {
                Some(declared) if declared == profile.provider && !guest.key.is_empty() => {
                    return CredentialResolution {
                        source: CredentialSource::GuestHeader,
                        api_key: Some(guest.key.clone()),
                    };
                }
                _ => {
                    // Mismatched or unparseable tag: ignored, not an error.
                    tracing::debug!(
                        declared = %guest.provider,
                        resolved = profile.provider.as_str(),
                        "guest credential provider mismatch, ignoring"
                    );
                }
            }
        }

        // Tier 4: environment. The env lookup itself happens at connect
        // time; resolution always succeeds here.
        CredentialResolution {
            source: CredentialSource::Environment,
            api_key: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
