//! Reasoning-trace extraction.
//!
//! Reasoning-capable models that do not stream a separate reasoning
//! channel inline their thinking inside tag markers. After the stream
//! completes we lift those blocks out of the assistant text so the
//! client never renders raw thinking, and persistence keeps the traces
//! separately.

use std::sync::LazyLock;

use pc_domain::message::ReasoningTrace;
use regex::Regex;

/// One alternation branch per tag so an opening marker only ever pairs
/// with its own closing marker (the regex crate has no backreferences).
/// Capture group N+1 corresponds to `TRACE_KINDS[N]`.
static TRACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // (?s) so blocks may span lines; non-greedy bodies.
    Regex::new(
        r"(?s)<think>(.*?)</think>|<thinking>(.*?)</thinking>|<reasoning>(.*?)</reasoning>|<analysis>(.*?)</analysis>",
    )
    .unwrap()
});

const TRACE_KINDS: [&str; 4] = ["think", "thinking", "reasoning", "analysis"];

/// Extract inline reasoning blocks and return the cleaned text plus the
/// traces in document order.
pub fn extract_reasoning(text: &str) -> (String, Vec<ReasoningTrace>) {
    let mut traces = Vec::new();

    for caps in TRACE_RE.captures_iter(text) {
        for (i, kind) in TRACE_KINDS.iter().enumerate() {
            let Some(body) = caps.get(i + 1) else {
                continue;
            };
            let content = body.as_str().trim();
            if !content.is_empty() {
                traces.push(ReasoningTrace {
                    kind: (*kind).to_string(),
                    content: content.to_string(),
                });
            }
            break;
        }
    }

    let cleaned = TRACE_RE.replace_all(text, "").trim().to_string();
    (cleaned, traces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_untouched() {
        let (cleaned, traces) = extract_reasoning("just an answer");
        assert_eq!(cleaned, "just an answer");
        assert!(traces.is_empty());
    }

    #[test]
    fn think_block_is_lifted() {
        let (cleaned, traces) =
            extract_reasoning("<think>step by step</think>The answer is 4.");
        assert_eq!(cleaned, "The answer is 4.");
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].kind, "think");
        assert_eq!(traces[0].content, "step by step");
    }

    #[test]
    fn multiple_markers_in_order() {
        let text = "<reasoning>first</reasoning>middle<analysis>second</analysis>end";
        let (cleaned, traces) = extract_reasoning(text);
        assert_eq!(cleaned, "middleend");
        assert_eq!(traces[0].kind, "reasoning");
        assert_eq!(traces[1].kind, "analysis");
    }

    #[test]
    fn multiline_block() {
        let text = "<think>line one\nline two</think>done";
        let (cleaned, traces) = extract_reasoning(text);
        assert_eq!(cleaned, "done");
        assert_eq!(traces[0].content, "line one\nline two");
    }

    #[test]
    fn empty_block_produces_no_trace() {
        let (cleaned, traces) = extract_reasoning("<think>  </think>answer");
        assert_eq!(cleaned, "answer");
        assert!(traces.is_empty());
    }

    #[test]
    fn unclosed_tag_left_alone() {
        let text = "<think>never closed";
        let (cleaned, traces) = extract_reasoning(text);
        assert_eq!(cleaned, text);
        assert!(traces.is_empty());
    }

    #[test]
    fn mismatched_open_and_close_tags_left_alone() {
        let text = "<think>not a pair</analysis>answer";
        let (cleaned, traces) = extract_reasoning(text);
        assert_eq!(cleaned, text);
        assert!(traces.is_empty());
    }
}
