//! Provider connection: turn a credential resolution into a live adapter.
//!
//! Adapters are built per request rather than cached process-wide, so
//! two concurrent turns with different credentials never share auth
//! state, and tests can substitute a scripted connector.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pc_domain::error::{Error, Result};
use pc_providers::{
    CredentialResolution, CredentialSource, LlmProvider, ModelProfile, OpenAiCompatProvider,
};

/// Builds the provider adapter for one turn.
#[async_trait::async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(
        &self,
        profile: &ModelProfile,
        resolution: &CredentialResolution,
    ) -> Result<Arc<dyn LlmProvider>>;
}

/// Production connector: one OpenAI-compatible HTTP adapter per turn.
pub struct HttpConnector {
    gateway_base_url: String,
    gateway_key_env: String,
    /// Per-provider base URL overrides from config.
    base_urls: HashMap<String, String>,
    timeout: Duration,
}

impl HttpConnector {
    pub fn from_config(llm: &pc_domain::config::LlmConfig) -> Self {
        Self {
            gateway_base_url: llm.gateway.base_url.clone(),
            gateway_key_env: llm.gateway.key_env.clone(),
            base_urls: llm.base_urls.clone(),
            timeout: Duration::from_millis(llm.request_timeout_ms),
        }
    }

    fn provider_base_url<'a>(&'a self, profile: &'a ModelProfile) -> &'a str {
        self.base_urls
            .get(profile.provider.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| profile.provider.default_base_url())
    }
}

#[async_trait::async_trait]
impl ProviderConnector for HttpConnector {
    async fn connect(
        &self,
        profile: &ModelProfile,
        resolution: &CredentialResolution,
    ) -> Result<Arc<dyn LlmProvider>> {
        let provider_tag = profile.provider.as_str();

        let (base_url, api_key) = match resolution.source {
            CredentialSource::Gateway => {
                let key = std::env::var(&self.gateway_key_env).map_err(|_| Error::Config(
                    format!("gateway enabled but {} is not set", self.gateway_key_env),
                ))?;
                (self.gateway_base_url.as_str(), key)
            }
            CredentialSource::UserByok | CredentialSource::GuestHeader => {
                let key = resolution.api_key.clone().ok_or_else(|| {
                    Error::Config("credential resolution carried no key".into())
                })?;
                (self.provider_base_url(profile), key)
            }
            CredentialSource::Environment => {
                let env = profile.provider.key_env();
                let key = std::env::var(env).map_err(|_| Error::Provider {
                    provider: provider_tag.into(),
                    message: format!("no API key available ({env} is not set)"),
                })?;
                (self.provider_base_url(profile), key)
            }
        };

        let adapter =
            OpenAiCompatProvider::new(provider_tag, base_url, api_key, self.timeout)?;
        Ok(Arc::new(adapter))
    }
}
