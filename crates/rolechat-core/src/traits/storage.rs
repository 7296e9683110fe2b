// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for conversation persistence.

use async_trait::async_trait;

use crate::error::RolechatError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, ConversationId, Message, MessageId, NewConversation, NewMessage};

/// Narrow persistence surface used by the chat pipeline.
///
/// Each method is one atomic read or write. Nothing here spans a whole turn.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), RolechatError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), RolechatError>;

    /// Creates an active conversation and returns it with its assigned id.
    async fn create_conversation(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, RolechatError>;

    /// Returns the conversation if it exists and is not deleted.
    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RolechatError>;

    /// Appends a message and bumps the conversation's `updated_at`.
    async fn append_message(&self, message: &NewMessage) -> Result<MessageId, RolechatError>;

    /// Returns all messages of a conversation in creation order.
    async fn load_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RolechatError>;
}
