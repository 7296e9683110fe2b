// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient events produced during a chat turn.
//!
//! A [`ChatEvent`] is built by the orchestrator, carried through the relay
//! exactly once, and serialized as the JSON payload of one wire frame.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ErrorCategory;
use crate::types::{ConversationId, MessageId};

/// Discriminant carried in the `type` field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatEventKind {
    Thinking,
    /// Incremental reply text. Serialized as `message`.
    #[serde(rename = "message")]
    #[strum(serialize = "message")]
    MessageDelta,
    Error,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub kind: ChatEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Cumulative reply text so far.
    #[serde(default)]
    pub content: String,
    pub conversation_id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCategory>,
}

impl ChatEvent {
    pub fn thinking(conversation_id: ConversationId) -> Self {
        Self {
            kind: ChatEventKind::Thinking,
            delta: None,
            content: String::new(),
            conversation_id,
            message_id: None,
            error: None,
        }
    }

    pub fn delta(
        conversation_id: ConversationId,
        delta: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChatEventKind::MessageDelta,
            delta: Some(delta.into()),
            content: content.into(),
            conversation_id,
            message_id: None,
            error: None,
        }
    }

    pub fn done(
        conversation_id: ConversationId,
        message_id: MessageId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChatEventKind::Done,
            delta: None,
            content: content.into(),
            conversation_id,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn error(
        conversation_id: ConversationId,
        category: ErrorCategory,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChatEventKind::Error,
            delta: None,
            content: content.into(),
            conversation_id,
            message_id: None,
            error: Some(category),
        }
    }

    /// `done` and `error` end a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChatEventKind::Done | ChatEventKind::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_event_wire_shape() {
        let ev = ChatEvent::delta(ConversationId(12), "lo", "hello");
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["delta"], "lo");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["conversationId"], 12);
        assert!(json.get("messageId").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn done_event_carries_message_id_only() {
        let ev = ChatEvent::done(ConversationId(3), MessageId(41), "full reply");
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(json["messageId"], 41);
        assert!(json.get("delta").is_none());
        assert!(ev.is_terminal());
    }

    #[test]
    fn error_event_carries_category() {
        let ev = ChatEvent::error(ConversationId::NONE, ErrorCategory::RateLimited, "");
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "rate_limited");
        assert_eq!(json["conversationId"], 0);
        assert_eq!(json["content"], "");
    }

    #[test]
    fn thinking_is_not_terminal() {
        let ev = ChatEvent::thinking(ConversationId(1));
        assert!(!ev.is_terminal());
        assert_eq!(ev.kind.to_string(), "thinking");
        assert_eq!(ChatEventKind::MessageDelta.to_string(), "message");
    }

    #[test]
    fn frames_parse_back() {
        let raw = r#"{"type":"done","content":"hi","conversationId":5,"messageId":9}"#;
        let ev: ChatEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.kind, ChatEventKind::Done);
        assert_eq!(ev.message_id, Some(MessageId(9)));
        assert_eq!(ev.conversation_id, ConversationId(5));
    }
}
