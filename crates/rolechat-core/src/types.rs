// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across collaborator traits and the chat pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a conversation row. Zero means "not resolved yet".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// Sentinel used by clients to ask for a new conversation.
    pub const NONE: ConversationId = ConversationId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
}

// --- Conversation and message rows ---

/// Speaker of a message.
///
/// The store keeps roles as strings; [`Role::from_store`] is the single
/// place where stored strings become roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Maps a stored role string to a role. Legacy `"ai"` rows and any
    /// unrecognized value become [`Role::Assistant`].
    pub fn from_store(raw: &str) -> Role {
        match raw {
            "user" => Role::User,
            "system" => Role::System,
            _ => Role::Assistant,
        }
    }

    /// String written to the store.
    pub fn as_store(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Lifecycle status of a conversation. Stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Deleted,
}

impl ConversationStatus {
    pub fn as_code(&self) -> i64 {
        match self {
            ConversationStatus::Active => 1,
            ConversationStatus::Deleted => 2,
        }
    }

    pub fn from_code(code: i64) -> ConversationStatus {
        match code {
            2 => ConversationStatus::Deleted,
            _ => ConversationStatus::Active,
        }
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: i64,
    pub character_id: i64,
    pub title: String,
    pub status: ConversationStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to create a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub user_id: i64,
    pub character_id: i64,
    pub title: String,
}

/// A persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub audio_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub token_used: Option<u32>,
    pub processing_time_ms: Option<u64>,
    pub created_at: String,
}

/// Fields needed to append a message.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub audio_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub token_used: Option<u32>,
    pub processing_time_ms: Option<u64>,
}

impl NewMessage {
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::with_role(conversation_id, Role::User, content)
    }

    pub fn assistant(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::with_role(conversation_id, Role::Assistant, content)
    }

    pub fn with_role(
        conversation_id: ConversationId,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            role,
            content: content.into(),
            audio_id: None,
            metadata: None,
            token_used: None,
            processing_time_ms: None,
        }
    }
}

// --- Character persona ---

/// Text-to-speech parameters attached to a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Persona returned by the character store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub system_prompt: String,
    pub voice: VoiceParams,
}

// --- Collaborator verdicts ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Pass,
    Fail { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny { retry_after: std::time::Duration },
}

// --- Provider types ---

/// One role-tagged message sent to the inference provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

impl ProviderMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A streaming request to an inference provider.
///
/// `messages` excludes the system prompt; providers place it however
/// their API expects. `None` sampling fields fall back to provider config.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Token counts reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single chunk from a streaming provider response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderStreamChunk {
    /// Incremental text. May be empty for usage-only or stop chunks.
    pub delta: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

impl ProviderStreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            ..Default::default()
        }
    }
}
