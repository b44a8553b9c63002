use std::sync::Arc;

use pc_domain::config::Config;
use pc_domain::error::Result;
use pc_prompt::PersonaRegistry;
use pc_providers::{
    CredentialResolver, CredentialStore, LogMetrics, MetricsSink, ModelRegistry, ProviderId,
};
use pc_retrieval::{RestRetrievalClient, RetrievalBackend};

use crate::connect::{HttpConnector, ProviderConnector};
use crate::persist::{ChatStore, LogChatStore};
use crate::runtime::tracer::RunTracer;

/// Shared application state passed to all API handlers.
///
/// Everything here is either immutable after startup (config, model
/// registry, personas) or an external collaborator behind a trait object
/// so tests can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelRegistry>,
    pub personas: Arc<PersonaRegistry>,
    pub credentials: Arc<CredentialResolver>,
    pub metrics: Arc<dyn MetricsSink>,
    pub retrieval: Arc<dyn RetrievalBackend>,
    pub connector: Arc<dyn ProviderConnector>,
    pub chats: Arc<dyn ChatStore>,
    pub tracer: Arc<RunTracer>,
}

impl AppState {
    /// Build production state from config.
    pub fn build(config: Arc<Config>) -> Result<Self> {
        let metrics: Arc<dyn MetricsSink> = Arc::new(LogMetrics);
        let store: Arc<dyn CredentialStore> = Arc::new(NoStoredCredentials);
        let credentials = Arc::new(CredentialResolver::new(
            config.llm.gateway.enabled,
            store,
            metrics.clone(),
        ));
        let retrieval = Arc::new(RestRetrievalClient::new(&config.retrieval)?);
        let connector = Arc::new(HttpConnector::from_config(&config.llm));
        let personas = Arc::new(PersonaRegistry::from_config(&config.personas));
        let tracer = Arc::new(RunTracer::from_config(&config.observability));

        Ok(Self {
            config,
            models: Arc::new(ModelRegistry::builtin()),
            personas,
            credentials,
            metrics,
            retrieval,
            connector,
            chats: Arc::new(LogChatStore),
            tracer,
        })
    }
}

/// Default credential store: no stored per-user keys. Deployments with a
/// BYOK database swap in their own [`CredentialStore`] here.
struct NoStoredCredentials;

#[async_trait::async_trait]
impl CredentialStore for NoStoredCredentials {
    async fn effective_key(
        &self,
        _user_id: &str,
        _provider: ProviderId,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}
