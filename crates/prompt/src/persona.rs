//! Persona overrides.
//!
//! A request carrying the configured context tag plus a recognized
//! personality tag gets that personality's fixed instruction prompt as a
//! full override. Checked before any retrieval-based composition.

use std::collections::HashMap;

use pc_domain::config::PersonasConfig;

#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    context_tag: String,
    personalities: HashMap<String, String>,
}

impl PersonaRegistry {
    pub fn from_config(cfg: &PersonasConfig) -> Self {
        Self {
            context_tag: cfg.context_tag.clone(),
            personalities: cfg.personalities.clone(),
        }
    }

    /// Return the override prompt when the request's context tag matches
    /// and the personality is known.
    pub fn override_prompt(
        &self,
        context_tag: Option<&str>,
        personality_tag: Option<&str>,
    ) -> Option<&str> {
        if context_tag != Some(self.context_tag.as_str()) {
            return None;
        }
        let tag = personality_tag?;
        self.personalities.get(tag).map(String::as_str)
    }
}
