// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for streaming chat completions.
//!
//! Each `data:` line carries one JSON chunk; the literal `[DONE]` marks the
//! end. Everything that goes wrong here happens after the provider accepted
//! the request, so failures are [`RolechatError::ProviderStream`]. A body
//! that closes before `[DONE]` or a `finish_reason` counts as truncated.

use eventsource_stream::Eventsource;
use futures::stream::{self, StreamExt};
use rolechat_core::{ProviderStream, ProviderStreamChunk, RolechatError, TokenUsage};

use crate::types::{ApiErrorResponse, ChatCompletionChunk};

const DONE_MARKER: &str = "[DONE]";

/// Turn a successful streaming response into provider chunks.
///
/// The stream owns the response; dropping it closes the connection.
pub fn parse_sse_stream(response: reqwest::Response) -> ProviderStream {
    let events = Box::pin(response.bytes_stream().eventsource());

    let chunks = stream::unfold(Some((events, false)), |state| async move {
        let (mut events, mut finished) = state?;
        loop {
            match events.next().await {
                Some(Ok(event)) if event.data.trim() == DONE_MARKER => return None,
                Some(Ok(event)) => {
                    let Some(item) = parse_data(&event.data) else {
                        continue;
                    };
                    if matches!(&item, Ok(chunk) if chunk.finish_reason.is_some()) {
                        finished = true;
                    }
                    return Some((item, Some((events, finished))));
                }
                Some(Err(e)) => {
                    let err = RolechatError::ProviderStream {
                        message: format!("SSE stream error: {e}"),
                        source: None,
                    };
                    return Some((Err(err), Some((events, finished))));
                }
                None if finished => return None,
                None => {
                    let err = RolechatError::ProviderStream {
                        message: "stream closed before completion".to_string(),
                        source: None,
                    };
                    return Some((Err(err), None));
                }
            }
        }
    });

    Box::pin(chunks)
}

/// Parse one `data:` payload. `None` means "nothing to forward".
pub fn parse_data(data: &str) -> Option<Result<ProviderStreamChunk, RolechatError>> {
    let data = data.trim();
    if data.is_empty() || data == DONE_MARKER {
        return None;
    }

    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Some(Err(RolechatError::ProviderStream {
            message: format!(
                "provider error event ({}): {}",
                api_err.error.type_.as_deref().unwrap_or("unknown"),
                api_err.error.message
            ),
            source: None,
        }));
    }

    let chunk = match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(RolechatError::ProviderStream {
                message: format!("failed to parse stream chunk: {e}"),
                source: Some(Box::new(e)),
            }));
        }
    };

    let choice = chunk.choices.into_iter().next();
    let usage = chunk.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });
    let (delta, finish_reason) = match choice {
        Some(c) => (c.delta.content.unwrap_or_default(), c.finish_reason),
        None => (String::new(), None),
    };

    if delta.is_empty() && usage.is_none() && finish_reason.is_none() {
        return None;
    }

    Some(Ok(ProviderStreamChunk {
        delta,
        usage,
        finish_reason,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_delta_is_forwarded() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let chunk = parse_data(data).unwrap().unwrap();
        assert_eq!(chunk.delta, "Hel");
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn role_only_delta_is_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#;
        assert!(parse_data(data).is_none());
    }

    #[test]
    fn usage_only_chunk_is_forwarded() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":34,"total_tokens":46}}"#;
        let chunk = parse_data(data).unwrap().unwrap();
        assert_eq!(chunk.delta, "");
        assert_eq!(
            chunk.usage,
            Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 34
            })
        );
    }

    #[test]
    fn finish_reason_is_kept() {
        let data = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let chunk = parse_data(data).unwrap().unwrap();
        assert_eq!(chunk.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn done_marker_ends_without_chunk() {
        assert!(parse_data("[DONE]").is_none());
    }

    #[test]
    fn error_event_becomes_stream_error() {
        let data = r#"{"error":{"message":"overloaded","type":"server_error"}}"#;
        let err = parse_data(data).unwrap().unwrap_err();
        assert!(matches!(err, RolechatError::ProviderStream { .. }));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn garbage_is_a_stream_error() {
        let err = parse_data("{not json").unwrap().unwrap_err();
        assert_eq!(err.category().to_string(), "provider_stream_error");
    }
}
