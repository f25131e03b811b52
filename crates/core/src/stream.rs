//! Canonical stream events and the two ways they're produced: relayed
//! straight from an adapter, or synthesized locally from a completed
//! [`Response`].

use serde::{Deserialize, Serialize};

use crate::schema::{Response, ResponseBlock, StopReason, Usage};

/// Chunk size (in bytes) used when synthesizing text deltas from a
/// complete response. Small on purpose: it's meant to imitate the cadence
/// of a real token stream, not to be efficient.
const SYNTHETIC_CHUNK_SIZE: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        model: String,
    },
    ContentBlockStart {
        index: usize,
        block: StartedBlock,
    },
    ContentBlockDelta {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta_text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta_json: Option<String>,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        stop_reason: StopReason,
        usage: Usage,
    },
    MessageStop,
    /// Raw upstream SSE frame, relayed byte-for-byte in passthrough mode.
    Passthrough {
        raw_event: String,
        raw_data: Vec<u8>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartedBlock {
    Text,
    ToolUse { id: String, name: String },
}

/// Synthesize a canonical stream event sequence from a completed response.
///
/// Used whenever an adapter only implements `Complete` but the caller
/// asked for a stream, and by the strict-passthrough soft-fallback path.
pub fn synthesize_stream(response: &Response) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::MessageStart {
        model: response.model.clone(),
    }];

    for (index, block) in response.blocks.iter().enumerate() {
        match block {
            ResponseBlock::Text { text } => {
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    block: StartedBlock::Text,
                });
                for chunk in chunk_str(text, SYNTHETIC_CHUNK_SIZE) {
                    events.push(StreamEvent::ContentBlockDelta {
                        index,
                        delta_text: Some(chunk.to_string()),
                        delta_json: None,
                    });
                }
                events.push(StreamEvent::ContentBlockStop { index });
            }
            ResponseBlock::ToolUse { id, name, input } => {
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    block: StartedBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                    },
                });
                events.push(StreamEvent::ContentBlockDelta {
                    index,
                    delta_text: None,
                    delta_json: Some(serde_json::to_string(input).unwrap_or_default()),
                });
                events.push(StreamEvent::ContentBlockStop { index });
            }
        }
    }

    events.push(StreamEvent::MessageDelta {
        stop_reason: response.stop_reason,
        usage: response.usage,
    });
    events.push(StreamEvent::MessageStop);
    events
}

/// Split `s` into chunks of at most `size` bytes, respecting UTF-8
/// character boundaries (never splits inside a multi-byte codepoint).
fn chunk_str(s: &str, size: usize) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + size).min(s.len());
        while end < s.len() && !s.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&s[start..end]);
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResponseBlock;

    fn text_response(text: &str) -> Response {
        Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 1,
                output_tokens: 2,
            },
            trace: Default::default(),
        }
    }

    #[test]
    fn synthesizes_start_deltas_stop_for_text() {
        let events = synthesize_stream(&text_response("hello world, this is a longer message than one chunk"));

        assert!(matches!(events.first(), Some(StreamEvent::MessageStart { .. })));
        assert!(matches!(events.last(), Some(StreamEvent::MessageStop)));
        assert!(matches!(events[1], StreamEvent::ContentBlockStart { index: 0, .. }));

        let delta_count = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::ContentBlockDelta { .. }))
            .count();
        assert!(delta_count > 1, "long text should be chunked into multiple deltas");
    }

    #[test]
    fn chunking_never_splits_utf8_codepoints() {
        let text = "a".repeat(23) + "é" + &"b".repeat(23);
        for chunk in chunk_str(&text, SYNTHETIC_CHUNK_SIZE) {
            assert!(std::str::from_utf8(chunk.as_bytes()).is_ok());
        }
    }

    #[test]
    fn empty_text_produces_no_deltas() {
        let events = synthesize_stream(&text_response(""));
        let delta_count = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::ContentBlockDelta { .. }))
            .count();
        assert_eq!(delta_count, 0);
    }
}
