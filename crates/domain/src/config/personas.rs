use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Personas
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Persona overrides for voice-style requests.
///
/// When a request carries the configured context tag together with a
/// recognized personality tag, that persona's instruction prompt fully
/// replaces system-prompt composition for the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonasConfig {
    /// Context tag that activates persona lookup (e.g. "voice").
    #[serde(default = "d_voice")]
    pub context_tag: String,
    /// Personality tag -> fixed instruction prompt.
    #[serde(default)]
    pub personalities: HashMap<String, String>,
}

impl Default for PersonasConfig {
    fn default() -> Self {
        Self {
            context_tag: d_voice(),
            personalities: HashMap::new(),
        }
    }
}

fn d_voice() -> String {
    "voice".into()
}
