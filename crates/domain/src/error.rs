/// Shared error type used across all polychat crates.
///
/// The pipeline splits errors into two families: everything upstream of a
/// successful provider invocation (`Validation`, `UnknownModel`) fails the
/// turn fast with a 4xx-equivalent, while everything downstream
/// (`Retrieval`, `Persistence`, `Trace`, `Metrics`, `Streaming`) is
/// recovered locally and must never surface to the caller. See
/// [`Error::is_recoverable`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("credential lookup failed: {0}")]
    CredentialLookup(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("streaming error: {0}")]
    Streaming(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("trace backend: {0}")]
    Trace(String),

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is recovered inside the pipeline rather than
    /// surfaced to the caller. Recoverable errors are logged and discarded
    /// by the orchestrator; they never turn a successful model response
    /// into a user-visible failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CredentialLookup(_)
                | Error::Retrieval(_)
                | Error::Persistence(_)
                | Error::Trace(_)
                | Error::Metrics(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_are_not_recoverable() {
        assert!(!Error::Validation("empty messages".into()).is_recoverable());
        assert!(!Error::UnknownModel("gpt-99".into()).is_recoverable());
    }

    #[test]
    fn side_effect_errors_are_recoverable() {
        assert!(Error::Persistence("db down".into()).is_recoverable());
        assert!(Error::Trace("webhook 500".into()).is_recoverable());
        assert!(Error::Metrics("sink full".into()).is_recoverable());
        assert!(Error::Retrieval("index timeout".into()).is_recoverable());
    }
}
