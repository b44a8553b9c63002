//! Shared SSE streaming infrastructure for provider adapters.
//!
//! The adapter receives a `reqwest::Response`, buffers chunks, splits on
//! `\n\n`, extracts `data:` payloads, and feeds each payload to a
//! provider-specific parser that returns `Vec<Result<StreamEvent>>`.

use crate::util::from_reqwest;
use pc_domain::error::Result;
use pc_domain::stream::{BoxStream, StreamEvent};

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`. Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines; only `data:` lines are
/// kept. The buffer is drained in place, leaving any trailing partial
/// event for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Drain the longest valid UTF-8 prefix of `raw` as a `String`, leaving
/// any trailing incomplete multibyte sequence in place for the next
/// network chunk.
pub(crate) fn take_valid_utf8(raw: &mut Vec<u8>) -> String {
    match String::from_utf8(std::mem::take(raw)) {
        Ok(s) => s,
        Err(e) => {
            let valid = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            *raw = bytes.split_off(valid);
            // `bytes` is now a verified-valid prefix; lossless.
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }
}

/// Build a [`BoxStream`] from an SSE `reqwest::Response` and a parser
/// closure.
///
/// The stream buffers incoming chunks, drains complete SSE events,
/// flushes the remaining buffer when the body closes, and emits a
/// fallback `Done` event if the parser never produced one.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut raw: Vec<u8> = Vec::new();
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    // A multibyte char may straddle two network chunks;
                    // decode only up to the last complete boundary.
                    raw.extend_from_slice(&bytes);
                    buffer.push_str(&take_valid_utf8(&mut raw));

                    let data_lines = drain_data_lines(&mut buffer);
                    for data in data_lines {
                        for event in parse_data(&data) {
                            if matches!(&event, Ok(StreamEvent::Done { .. })) {
                                done_emitted = true;
                            }
                            yield event;
                        }
                    }
                }
                Ok(None) => {
                    // Stream ended -- flush any remaining partial event. A
                    // truncated trailing char at body end decodes lossily.
                    if !raw.is_empty() {
                        buffer.push_str(&String::from_utf8_lossy(&raw));
                        raw.clear();
                    }
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        let data_lines = drain_data_lines(&mut buffer);
                        for data in data_lines {
                            for event in parse_data(&data) {
                                if matches!(&event, Ok(StreamEvent::Done { .. })) {
                                    done_emitted = true;
                                }
                                yield event;
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
                final_message: None,
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_single_complete_event() {
        let mut buf = String::from("event: message\ndata: {\"hello\":\"world\"}\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["{\"hello\":\"world\"}"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_multiple_events() {
        let mut buf = String::from("data: first\n\ndata: second\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["first", "second"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_partial_event_stays_in_buffer() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["complete"]);
        assert_eq!(buf, "data: partial");
    }

    #[test]
    fn drain_ignores_non_data_lines() {
        let mut buf = String::from("event: ping\nid: 42\nretry: 5000\ndata: payload\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["payload"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_done_sentinel_preserved() {
        let mut buf = String::from("data: [DONE]\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["[DONE]"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn utf8_char_split_across_chunks_decodes_cleanly() {
        // "é" is 0xC3 0xA9; deliver one byte per chunk.
        let mut raw = vec![0xC3];
        let first = take_valid_utf8(&mut raw);
        assert_eq!(first, "");
        assert_eq!(raw, vec![0xC3]);

        raw.push(0xA9);
        let second = take_valid_utf8(&mut raw);
        assert_eq!(second, "é");
        assert!(raw.is_empty());
    }

    #[test]
    fn utf8_valid_prefix_drained_partial_suffix_kept() {
        let mut raw = b"data: caf\xC3\xA9\n\n\xE2\x82".to_vec();
        let decoded = take_valid_utf8(&mut raw);
        assert_eq!(decoded, "data: café\n\n");
        assert_eq!(raw, vec![0xE2, 0x82]);
        assert!(!decoded.contains('\u{FFFD}'));
    }

    #[test]
    fn drain_incremental_buffering() {
        let mut buf = String::from("data: chunk1");
        let lines = drain_data_lines(&mut buf);
        assert!(lines.is_empty());
        assert_eq!(buf, "data: chunk1");

        buf.push_str("\n\ndata: chunk2\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["chunk1", "chunk2"]);
        assert!(buf.is_empty());
    }
}
