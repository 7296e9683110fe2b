// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History assembly: stored messages in creation order, as provider messages.

use rolechat_core::{
    ConversationId, Message, MessageId, ProviderMessage, Role, RolechatError, StorageAdapter,
};
use tracing::debug;

/// Builds the provider-facing message list for one turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryAssembler {
    /// Keep only the most recent `limit` stored messages. `None` keeps all.
    limit: Option<usize>,
}

impl HistoryAssembler {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }

    /// Loads the conversation's history and appends the new user text.
    ///
    /// `exclude` is the id of the user message persisted for this turn; it
    /// is already in the store and would otherwise appear twice.
    pub async fn assemble_messages(
        &self,
        storage: &dyn StorageAdapter,
        conversation_id: ConversationId,
        exclude: Option<MessageId>,
        user_text: &str,
    ) -> Result<Vec<ProviderMessage>, RolechatError> {
        let history = storage.load_messages(conversation_id).await?;
        let mut messages = self.to_provider_messages(&history, exclude);

        debug!(
            conversation_id = %conversation_id,
            stored = history.len(),
            used = messages.len(),
            "history assembled"
        );

        messages.push(ProviderMessage::new(Role::User, user_text));
        Ok(messages)
    }

    /// Pure mapping step, exposed for callers that already hold the rows.
    pub fn to_provider_messages(
        &self,
        history: &[Message],
        exclude: Option<MessageId>,
    ) -> Vec<ProviderMessage> {
        let kept: Vec<&Message> = history
            .iter()
            .filter(|m| Some(m.id) != exclude)
            .collect();
        let skip = match self.limit {
            Some(limit) => kept.len().saturating_sub(limit),
            None => 0,
        };
        kept.into_iter()
            .skip(skip)
            .map(|m| ProviderMessage::new(m.role, m.content.clone()))
            .collect()
    }
}
