// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that injects failures at chosen operations.

use std::sync::Arc;

use async_trait::async_trait;
use rolechat_core::{
    AdapterType, Conversation, ConversationId, HealthStatus, Message, MessageId, NewConversation,
    NewMessage, PluginAdapter, Role, RolechatError, StorageAdapter,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateConversation,
    GetConversation,
    AppendUserMessage,
    AppendAssistantMessage,
    LoadMessages,
    HealthCheck,
}

/// Delegates to `inner` except at the configured fail points, which return
/// a storage error.
pub struct FailingStorage {
    inner: Arc<dyn StorageAdapter>,
    fail_points: Vec<FailPoint>,
}

impl FailingStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>, fail_points: Vec<FailPoint>) -> Self {
        Self { inner, fail_points }
    }

    fn check(&self, point: FailPoint) -> Result<(), RolechatError> {
        if self.fail_points.contains(&point) {
            return Err(RolechatError::storage(std::io::Error::other(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FailingStorage {
    fn name(&self) -> &str {
        "failing-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RolechatError> {
        if self.fail_points.contains(&FailPoint::HealthCheck) {
            return Ok(HealthStatus::Unhealthy("injected failure".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), RolechatError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FailingStorage {
    async fn initialize(&self) -> Result<(), RolechatError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), RolechatError> {
        self.inner.close().await
    }

    async fn create_conversation(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, RolechatError> {
        self.check(FailPoint::CreateConversation)?;
        self.inner.create_conversation(conversation).await
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RolechatError> {
        self.check(FailPoint::GetConversation)?;
        self.inner.get_conversation(id).await
    }

    async fn append_message(&self, message: &NewMessage) -> Result<MessageId, RolechatError> {
        match message.role {
            Role::User => self.check(FailPoint::AppendUserMessage)?,
            Role::Assistant => self.check(FailPoint::AppendAssistantMessage)?,
            Role::System => {}
        }
        self.inner.append_message(message).await
    }

    async fn load_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RolechatError> {
        self.check(FailPoint::LoadMessages)?;
        self.inner.load_messages(conversation_id).await
    }
}
