// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.

use rolechat_core::{
    Conversation, ConversationId, ConversationStatus, NewConversation, RolechatError,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, now_timestamp};

/// Insert an active conversation and return the stored row.
pub async fn create_conversation(
    db: &Database,
    new: &NewConversation,
) -> Result<Conversation, RolechatError> {
    let new = new.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (user_id, character_id, title, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    new.user_id,
                    new.character_id,
                    new.title,
                    ConversationStatus::Active.as_code(),
                    now,
                ],
            )?;
            Ok(Conversation {
                id: ConversationId(conn.last_insert_rowid()),
                user_id: new.user_id,
                character_id: new.character_id,
                title: new.title,
                status: ConversationStatus::Active,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation unless it is missing or soft-deleted.
pub async fn get_conversation(
    db: &Database,
    id: ConversationId,
) -> Result<Option<Conversation>, RolechatError> {
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, user_id, character_id, title, status, created_at, updated_at
                 FROM conversations WHERE id = ?1 AND status != ?2",
                params![id.0, ConversationStatus::Deleted.as_code()],
                |row| {
                    Ok(Conversation {
                        id: ConversationId(row.get(0)?),
                        user_id: row.get(1)?,
                        character_id: row.get(2)?,
                        title: row.get(3)?,
                        status: ConversationStatus::from_code(row.get(4)?),
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a conversation. Returns false if nothing changed.
pub async fn soft_delete_conversation(
    db: &Database,
    id: ConversationId,
) -> Result<bool, RolechatError> {
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status != ?1",
                params![ConversationStatus::Deleted.as_code(), now, id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_conversation(character_id: i64) -> NewConversation {
        NewConversation {
            user_id: 1,
            character_id,
            title: "New conversation".into(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let db = Database::open_in_memory().await.unwrap();
        let a = create_conversation(&db, &new_conversation(7)).await.unwrap();
        let b = create_conversation(&db, &new_conversation(7)).await.unwrap();
        assert!(a.id.0 > 0);
        assert!(b.id > a.id);
        assert_eq!(a.status, ConversationStatus::Active);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn get_returns_stored_row() {
        let db = Database::open_in_memory().await.unwrap();
        let created = create_conversation(&db, &new_conversation(3)).await.unwrap();
        let fetched = get_conversation(&db, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn missing_conversation_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_conversation(&db, ConversationId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_conversation_is_hidden() {
        let db = Database::open_in_memory().await.unwrap();
        let created = create_conversation(&db, &new_conversation(3)).await.unwrap();
        assert!(soft_delete_conversation(&db, created.id).await.unwrap());
        assert!(!soft_delete_conversation(&db, created.id).await.unwrap());
        assert!(get_conversation(&db, created.id).await.unwrap().is_none());
    }
}
