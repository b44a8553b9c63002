pub mod credentials;
pub mod metrics;
pub mod models;
pub mod openai_compat;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

// Re-exports for convenience.
pub use credentials::{
    CredentialResolution, CredentialResolver, CredentialSource, CredentialStore, GuestCredential,
    UserContext,
};
pub use metrics::{LogMetrics, MetricsSink};
pub use models::{ModelProfile, ModelRegistry, ProviderId};
pub use openai_compat::OpenAiCompatProvider;
pub use traits::{ChatStreamRequest, LlmProvider, ProviderTool};
pub use util::mask_key;
