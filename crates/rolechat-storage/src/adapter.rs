// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use rolechat_config::model::StorageConfig;
use rolechat_core::{
    AdapterType, Conversation, ConversationId, HealthStatus, Message, MessageId, NewConversation,
    NewMessage, PluginAdapter, RolechatError, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The connection is opened by [`StorageAdapter::initialize`]; every other
/// call before that fails with a storage error.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: String::new(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, RolechatError> {
        self.db.get().ok_or_else(|| RolechatError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Soft-delete a conversation so later turns treat it as missing.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<bool, RolechatError> {
        queries::conversations::soft_delete_conversation(self.db()?, id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RolechatError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), RolechatError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), RolechatError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RolechatError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RolechatError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn create_conversation(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, RolechatError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RolechatError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn append_message(&self, message: &NewMessage) -> Result<MessageId, RolechatError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn load_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RolechatError> {
        queries::messages::load_messages(self.db()?, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_core::Role;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn identity() {
        let storage = SqliteStorage::new(make_config(std::path::Path::new("unused.db")));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("x.db")));
        let err = storage.load_messages(ConversationId(1)).await.unwrap_err();
        assert_eq!(err.category().to_string(), "store_unavailable");
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("double.db")));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn turn_shaped_lifecycle() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("life.db")));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let conv = storage
            .create_conversation(&NewConversation {
                user_id: 1,
                character_id: 7,
                title: "New conversation".into(),
            })
            .await
            .unwrap();
        storage
            .append_message(&NewMessage::user(conv.id, "hello"))
            .await
            .unwrap();
        let reply = storage
            .append_message(&NewMessage::assistant(conv.id, "hi there"))
            .await
            .unwrap();

        let messages = storage.load_messages(conv.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].id, reply);

        assert!(storage.delete_conversation(conv.id).await.unwrap());
        assert!(storage.get_conversation(conv.id).await.unwrap().is_none());

        storage.close().await.unwrap();
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn wraps_in_memory_database() {
        let storage = SqliteStorage::from_database(Database::open_in_memory().await.unwrap());
        let conv = storage
            .create_conversation(&NewConversation {
                user_id: 1,
                character_id: 1,
                title: "t".into(),
            })
            .await
            .unwrap();
        assert!(storage.get_conversation(conv.id).await.unwrap().is_some());
    }
}
