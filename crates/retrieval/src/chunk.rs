//! Retrieved-chunk DTO shared by the backend clients and the prompt
//! composer.

use serde::{Deserialize, Serialize};

/// One chunk of retrieved context from the vector search service.
///
/// Consumed only to build the augmented prompt; never persisted by this
/// service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Stable identifier of the source document.
    pub source_id: String,
    /// Human-readable source name, shown to the model as an annotation.
    pub source_name: String,
    /// Backend relevance score; higher is more relevant.
    pub relevance_score: f32,
    /// The chunk text.
    pub content: String,
    /// Link back to the source, when the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RetrievedChunk {
    pub fn new(
        source_id: impl Into<String>,
        source_name: impl Into<String>,
        relevance_score: f32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_name: source_name.into(),
            relevance_score,
            content: content.into(),
            url: None,
        }
    }
}
