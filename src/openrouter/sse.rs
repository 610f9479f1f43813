//! Payload mapping for streamed completions
//!
//! SSE framing (line splitting, multi-line `data:` fields, comments such as
//! `: OPENROUTER PROCESSING`) is handled by `eventsource-stream`. This module
//! only interprets the `data` of one complete event.

use super::types::{ErrorEnvelope, StreamChunk};

/// Decoded event from the upstream stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Non-empty text delta
    Delta(String),
    /// Upstream reported an error in-band
    Error(String),
    /// `[DONE]` sentinel
    Done,
}

/// Interpret the data of one event
///
/// Returns `None` for events that carry nothing for the caller: role-only
/// or empty deltas, and payloads that are not JSON.
pub fn parse_event(data: &str) -> Option<SseEvent> {
    let payload = data.trim();

    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }

    if let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) {
        let delta: String = chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.and_then(|d| d.content))
            .collect();
        if !delta.is_empty() {
            return Some(SseEvent::Delta(delta));
        }
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(payload) {
            return Some(SseEvent::Error(envelope.error.message));
        }
        return None;
    }

    tracing::debug!(payload = %payload, "Skipping unparseable stream payload");
    None
}
