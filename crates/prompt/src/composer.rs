//! System prompt composition.

use pc_domain::trace::TraceEvent;
use pc_retrieval::{RetrievalDecision, RetrievedChunk};

/// Base prompt used when the caller supplies no override.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer clearly and concisely, and say so \
     when you do not know something.";

const NATIVE_TOOL_SUFFIX: &str = "\n\nYou have access to a document search tool. \
     Use it when the user's question may be answered by the available \
     documents; otherwise answer directly.";

const CONTEXT_HEADER: &str = "\n\n## Retrieved context\n\
     Use the following context when relevant. Cite the source name when \
     you draw on it.\n";

/// Rough token estimate. Retrieval chunks are budget-gated, not
/// tokenized exactly, so chars/4 is close enough for English prose.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Build the effective system prompt for one turn.
///
/// `base_prompt` is the caller's override, falling back to
/// [`DEFAULT_SYSTEM_PROMPT`]. Persona overrides are resolved upstream and
/// arrive here as `base_prompt`.
///
/// On the fallback route, chunks are injected by descending relevance
/// until the token budget is exhausted. A chunk that does not fit whole
/// is dropped whole; chunk content is never cut mid-text.
pub fn compose(
    base_prompt: Option<&str>,
    decision: RetrievalDecision,
    chunks: &[RetrievedChunk],
    budget_tokens: usize,
) -> String {
    let base = base_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);

    match decision {
        RetrievalDecision::None => base.to_owned(),
        RetrievalDecision::NativeTool => format!("{base}{NATIVE_TOOL_SUFFIX}"),
        RetrievalDecision::Fallback { .. } => {
            inject_chunks(base, chunks, budget_tokens)
        }
    }
}

fn inject_chunks(base: &str, chunks: &[RetrievedChunk], budget_tokens: usize) -> String {
    if chunks.is_empty() {
        return base.to_owned();
    }

    let mut ranked: Vec<&RetrievedChunk> = chunks.iter().collect();
    ranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut prompt = format!("{base}{CONTEXT_HEADER}");
    let mut remaining = budget_tokens;
    let mut injected = 0usize;
    let mut dropped = 0usize;

    for chunk in ranked {
        let section = render_chunk(chunk);
        let cost = estimate_tokens(&section);
        if cost > remaining {
            dropped += 1;
            continue;
        }
        prompt.push_str(&section);
        remaining -= cost;
        injected += 1;
    }

    if injected == 0 {
        // Every chunk was over budget; keep the prompt clean.
        prompt = base.to_owned();
    }

    TraceEvent::PromptComposed {
        chunks_injected: injected,
        chunks_dropped: dropped,
        budget_tokens,
        prompt_chars: prompt.len(),
    }
    .emit();

    prompt
}

fn render_chunk(chunk: &RetrievedChunk) -> String {
    let mut section = format!("\n### Source: {}\n{}\n", chunk.source_name, chunk.content);
    if let Some(ref url) = chunk.url {
        section.push_str(&format!("({url})\n"));
    }
    section
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use pc_retrieval::FallbackStrategy;

    fn chunk(name: &str, score: f32, content: &str) -> RetrievedChunk {
        RetrievedChunk::new(format!("id-{name}"), name, score, content)
    }

    fn fallback() -> RetrievalDecision {
        RetrievalDecision::Fallback {
            strategy: FallbackStrategy::Vector,
        }
    }

    #[test]
    fn none_mode_uses_base_or_default() {
        assert_eq!(
            compose(Some("custom"), RetrievalDecision::None, &[], 1000),
            "custom"
        );
        assert_eq!(
            compose(None, RetrievalDecision::None, &[], 1000),
            DEFAULT_SYSTEM_PROMPT
        );
    }

    #[test]
    fn native_tool_mode_appends_tool_instruction() {
        let prompt = compose(Some("base"), RetrievalDecision::NativeTool, &[], 1000);
        assert!(prompt.starts_with("base"));
        assert!(prompt.contains("document search tool"));
    }

    #[test]
    fn fallback_injects_by_descending_relevance() {
        let chunks = vec![
            chunk("Low", 0.2, "low relevance"),
            chunk("High", 0.9, "high relevance"),
        ];
        let prompt = compose(Some("base"), fallback(), &chunks, 10_000);
        let high_pos = prompt.find("High").unwrap();
        let low_pos = prompt.find("Low").unwrap();
        assert!(high_pos < low_pos);
        assert!(prompt.contains("Retrieved context"));
    }

    #[test]
    fn budget_is_never_exceeded() {
        let chunks = vec![
            chunk("A", 0.9, &"x".repeat(400)),
            chunk("B", 0.8, &"y".repeat(400)),
            chunk("C", 0.7, &"z".repeat(400)),
        ];
        // Each section costs a bit over 100 tokens; budget fits two.
        let budget = 250;
        let prompt = compose(Some("base"), fallback(), &chunks, budget);
        assert!(prompt.contains("Source: A"));
        assert!(prompt.contains("Source: B"));
        assert!(!prompt.contains("Source: C"));

        let injected_cost: usize = chunks[..2]
            .iter()
            .map(|c| estimate_tokens(&render_chunk(c)))
            .sum();
        assert!(injected_cost <= budget);
    }

    #[test]
    fn oversized_chunk_dropped_whole_not_truncated() {
        let big = "n".repeat(10_000);
        let chunks = vec![chunk("Big", 0.9, &big), chunk("Small", 0.5, "fits fine")];
        let prompt = compose(Some("base"), fallback(), &chunks, 100);
        assert!(!prompt.contains(&big[..200]));
        assert!(prompt.contains("Source: Small"));
    }

    #[test]
    fn all_chunks_over_budget_returns_clean_base() {
        let chunks = vec![chunk("Big", 0.9, &"n".repeat(10_000))];
        let prompt = compose(Some("base"), fallback(), &chunks, 10);
        assert_eq!(prompt, "base");
    }

    #[test]
    fn empty_chunks_on_fallback_returns_base() {
        assert_eq!(compose(Some("base"), fallback(), &[], 1000), "base");
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
