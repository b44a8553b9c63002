//! Model registry and capability resolution.
//!
//! Maps a requested model identifier to a canonical id plus a capability
//! profile. Resolution does two things: alias rewriting (retired ids map
//! to their replacement) and a lookup against the static registry. An
//! unresolvable id is the one condition, besides request validation, that
//! aborts a turn before any provider call.

use pc_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderId
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Openai,
    Anthropic,
    Google,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Openai => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Google => "google",
        }
    }

    /// Parse a provider tag (as carried in a guest credential header).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderId::Openai),
            "anthropic" => Some(ProviderId::Anthropic),
            "google" | "gemini" => Some(ProviderId::Google),
            _ => None,
        }
    }

    /// Well-known OpenAI-compatible endpoint for the environment tier.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::Openai => "https://api.openai.com/v1",
            ProviderId::Anthropic => "https://api.anthropic.com/v1",
            ProviderId::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Env var conventionally holding this provider's API key.
    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderId::Openai => "OPENAI_API_KEY",
            ProviderId::Anthropic => "ANTHROPIC_API_KEY",
            ProviderId::Google => "GEMINI_API_KEY",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ModelProfile
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Capability profile for one canonical model id. Derived once per
/// request from the static registry; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub canonical_id: String,
    pub provider: ProviderId,
    pub reasoning_capable: bool,
    /// Whether the provider can run a retrieval tool natively for this
    /// model. When false, retrieval falls back to prompt injection.
    pub supports_file_search: bool,
    /// Some model families accept exactly one sampling temperature.
    /// When set, caller overrides are ignored.
    pub pinned_temperature: Option<f32>,
}

impl ModelProfile {
    /// Apply the temperature policy: a pinned family always wins over the
    /// caller's requested value.
    pub fn effective_temperature(&self, requested: Option<f32>) -> Option<f32> {
        match self.pinned_temperature {
            Some(pinned) => Some(pinned),
            None => requested,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ModelRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Static model registry: canonical ids, capability flags, and a small
/// alias map for retired ids. Read-only after construction; shared across
/// concurrent turns behind an `Arc`.
pub struct ModelRegistry {
    profiles: HashMap<String, ModelProfile>,
    aliases: HashMap<String, String>,
}

impl ModelRegistry {
    /// Build the registry with the built-in model table.
    pub fn builtin() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
            aliases: HashMap::new(),
        };

        // OpenAI
        registry.add("gpt-4o", ProviderId::Openai, false, true, None);
        registry.add("gpt-4o-mini", ProviderId::Openai, false, true, None);
        registry.add("gpt-4.1", ProviderId::Openai, false, true, None);
        registry.add("o3", ProviderId::Openai, true, true, Some(1.0));
        registry.add("o4-mini", ProviderId::Openai, true, true, Some(1.0));
        registry.add("gpt-5", ProviderId::Openai, true, true, Some(1.0));

        // Anthropic
        registry.add("claude-sonnet-4", ProviderId::Anthropic, true, false, None);
        registry.add("claude-opus-4", ProviderId::Anthropic, true, false, None);
        registry.add("claude-haiku-3-5", ProviderId::Anthropic, false, false, None);

        // Google
        registry.add("gemini-2.5-pro", ProviderId::Google, true, false, None);
        registry.add("gemini-2.5-flash", ProviderId::Google, false, false, None);

        // Retired ids and their replacements.
        registry.alias("gpt-4-turbo", "gpt-4.1");
        registry.alias("o1", "o3");
        registry.alias("o1-mini", "o4-mini");
        registry.alias("claude-3-5-sonnet", "claude-sonnet-4");
        registry.alias("gemini-1.5-pro", "gemini-2.5-pro");
        registry.alias("gemini-1.5-flash", "gemini-2.5-flash");

        registry
    }

    fn add(
        &mut self,
        id: &str,
        provider: ProviderId,
        reasoning: bool,
        file_search: bool,
        pinned_temperature: Option<f32>,
    ) {
        self.profiles.insert(
            id.to_string(),
            ModelProfile {
                canonical_id: id.to_string(),
                provider,
                reasoning_capable: reasoning,
                supports_file_search: file_search,
                pinned_temperature,
            },
        );
    }

    fn alias(&mut self, from: &str, to: &str) {
        self.aliases.insert(from.to_string(), to.to_string());
    }

    /// Resolve a requested model id to its capability profile.
    ///
    /// Rewrites retired aliases first, then looks up the registry.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownModel`] when the canonical id has no entry. This is
    /// surfaced to the caller as a 4xx: no provider call is possible
    /// without a profile.
    pub fn resolve(&self, requested: &str) -> Result<&ModelProfile> {
        let canonical = self
            .aliases
            .get(requested)
            .map(String::as_str)
            .unwrap_or(requested);
        self.profiles
            .get(canonical)
            .ok_or_else(|| Error::UnknownModel(requested.to_string()))
    }

    /// All canonical model ids (sorted), for the models listing endpoint.
    pub fn list(&self) -> Vec<&ModelProfile> {
        let mut entries: Vec<&ModelProfile> = self.profiles.values().collect();
        entries.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
        entries
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_id() {
        let registry = ModelRegistry::builtin();
        let profile = registry.resolve("gpt-4o").unwrap();
        assert_eq!(profile.canonical_id, "gpt-4o");
        assert_eq!(profile.provider, ProviderId::Openai);
        assert!(profile.supports_file_search);
        assert!(!profile.reasoning_capable);
    }

    #[test]
    fn retired_alias_maps_to_replacement() {
        let registry = ModelRegistry::builtin();
        let profile = registry.resolve("o1").unwrap();
        assert_eq!(profile.canonical_id, "o3");
        assert!(profile.reasoning_capable);
    }

    #[test]
    fn unknown_model_errors() {
        let registry = ModelRegistry::builtin();
        let err = registry.resolve("gpt-99-ultra").unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));
    }

    #[test]
    fn pinned_temperature_ignores_override() {
        let registry = ModelRegistry::builtin();
        let pinned = registry.resolve("o3").unwrap();
        assert_eq!(pinned.effective_temperature(Some(0.2)), Some(1.0));
        assert_eq!(pinned.effective_temperature(None), Some(1.0));

        let free = registry.resolve("gpt-4o").unwrap();
        assert_eq!(free.effective_temperature(Some(0.2)), Some(0.2));
        assert_eq!(free.effective_temperature(None), None);
    }

    #[test]
    fn provider_tag_parsing() {
        assert_eq!(ProviderId::parse("openai"), Some(ProviderId::Openai));
        assert_eq!(ProviderId::parse("Gemini"), Some(ProviderId::Google));
        assert_eq!(ProviderId::parse("mystery"), None);
    }

    #[test]
    fn list_is_sorted() {
        let registry = ModelRegistry::builtin();
        let ids: Vec<&str> = registry
            .list()
            .iter()
            .map(|p| p.canonical_id.as_str())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
