// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events framing for chat turns.
//!
//! Every [`ChatEvent`] becomes one frame with a single `data:` line holding
//! the JSON payload and no `event:` line; the payload's `type` field tells
//! frames apart:
//! ```text
//! data: {"type":"thinking","content":"","conversationId":12}
//!
//! data: {"type":"message","delta":"Hi","content":"Hi","conversationId":12}
//!
//! data: {"type":"done","content":"Hi","conversationId":12,"messageId":40}
//! ```
//! Frames are handed to the body one at a time, so each is flushed as soon
//! as it is produced. Dropping the stream (client disconnect) drops the
//! relay receiver, which cancels the turn.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::stream::{Stream, StreamExt};
use rolechat_agent::RelayReceiver;
use rolechat_core::ChatEvent;
use tracing::warn;

/// Serialize one event as a wire frame.
pub fn frame(event: &ChatEvent) -> Result<Event, axum::Error> {
    Event::default().json_data(event)
}

/// Frames for every event the relay delivers, ending after the terminal one.
pub fn event_stream(
    receiver: RelayReceiver,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    receiver.into_stream().filter_map(|event| {
        let framed = match frame(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                warn!(error = %e, kind = %event.kind, "failed to frame chat event");
                None
            }
        };
        futures::future::ready(framed)
    })
}

/// SSE response for one turn.
pub fn stream_turn(
    receiver: RelayReceiver,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    Sse::new(event_stream(receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use rolechat_agent::BackpressurePolicy;
    use rolechat_agent::relay;
    use rolechat_core::{ConversationId, ErrorCategory, MessageId};
    use tokio_util::sync::CancellationToken;

    async fn body_text(receiver: RelayReceiver) -> String {
        let response = stream_turn(receiver).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn frames_are_data_lines_only() {
        let (tx, rx) = relay::channel(8, BackpressurePolicy::Drop, CancellationToken::new());
        tx.emit(ChatEvent::delta(ConversationId(3), "Hi", "Hi")).await;
        tx.finish(ChatEvent::done(ConversationId(3), MessageId(40), "Hi"))
            .await;

        let body = body_text(rx).await;
        assert_eq!(
            body,
            concat!(
                "data: {\"type\":\"message\",\"delta\":\"Hi\",\"content\":\"Hi\",\"conversationId\":3}\n\n",
                "data: {\"type\":\"done\",\"content\":\"Hi\",\"conversationId\":3,\"messageId\":40}\n\n",
            )
        );
        assert!(!body.contains("event:"));
        drop(tx);
    }

    #[tokio::test]
    async fn error_frame_carries_category() {
        let (tx, rx) = relay::channel(8, BackpressurePolicy::Drop, CancellationToken::new());
        tx.finish(ChatEvent::error(
            ConversationId::NONE,
            ErrorCategory::ValidationError,
            "",
        ))
        .await;
        let body = body_text(rx).await;
        assert_eq!(
            body,
            "data: {\"type\":\"error\",\"content\":\"\",\"conversationId\":0,\"error\":\"validation_error\"}\n\n"
        );
    }

    #[test]
    fn every_event_kind_frames() {
        let events = [
            ChatEvent::thinking(ConversationId(1)),
            ChatEvent::delta(ConversationId(1), "a", "a"),
            ChatEvent::done(ConversationId(1), MessageId(2), "a"),
            ChatEvent::error(ConversationId(1), ErrorCategory::ProviderStreamError, "a"),
        ];
        for event in &events {
            assert!(frame(event).is_ok(), "{} should frame", event.kind);
        }
    }
}
