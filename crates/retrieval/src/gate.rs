//! Retrieval gate: picks the retrieval route for one turn.

use serde::Serialize;

/// How retrieved context is sourced on the fallback route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    /// Single vector similarity query over the user's latest message.
    Vector,
    /// Query-rewrite pass over recent history, then a vector query.
    TwoPass,
}

impl FallbackStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackStrategy::Vector => "vector",
            FallbackStrategy::TwoPass => "two-pass",
        }
    }
}

/// The retrieval route for one turn. Computed once, then drives both the
/// prompt composer and the orchestrator's tool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RetrievalDecision {
    /// Search disabled for this turn.
    None,
    /// The model carries the provider's native file-search tool and
    /// decides itself when to invoke it.
    NativeTool,
    /// Model cannot run the native tool; we retrieve up front and inject
    /// into the system prompt.
    Fallback { strategy: FallbackStrategy },
}

impl RetrievalDecision {
    /// Decision table:
    ///
    /// | search_enabled | model_supports_tool | route       |
    /// |----------------|---------------------|-------------|
    /// | false          | any                 | none        |
    /// | true           | true                | native-tool |
    /// | true           | false               | fallback    |
    ///
    /// On the fallback route the strategy is two-pass when the feature
    /// flag is on, vector otherwise.
    pub fn decide(
        search_enabled: bool,
        model_supports_tool: bool,
        two_pass_enabled: bool,
    ) -> Self {
        if !search_enabled {
            return RetrievalDecision::None;
        }
        if model_supports_tool {
            return RetrievalDecision::NativeTool;
        }
        RetrievalDecision::Fallback {
            strategy: if two_pass_enabled {
                FallbackStrategy::TwoPass
            } else {
                FallbackStrategy::Vector
            },
        }
    }

    pub fn mode_str(&self) -> &'static str {
        match self {
            RetrievalDecision::None => "none",
            RetrievalDecision::NativeTool => "native-tool",
            RetrievalDecision::Fallback { .. } => "fallback",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
