// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.

use rolechat_core::{ConversationId, Message, MessageId, NewMessage, RolechatError, Role};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err, now_timestamp};

/// Insert a message and bump the owning conversation's `updated_at`.
///
/// Both statements run in one transaction. A message for an unknown
/// conversation fails on the foreign key.
pub async fn append_message(db: &Database, msg: &NewMessage) -> Result<MessageId, RolechatError> {
    let metadata = msg
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(RolechatError::storage)?;
    let msg = msg.clone();
    let now = now_timestamp();

    db.connection()
        .call(move |conn| -> Result<MessageId, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (conversation_id, role, content, audio_id, metadata,
                                       token_used, processing_time_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    msg.conversation_id.0,
                    msg.role.as_store(),
                    msg.content,
                    msg.audio_id,
                    metadata,
                    msg.token_used,
                    msg.processing_time_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
                    now,
                ],
            )?;
            let id = MessageId(tx.last_insert_rowid());
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![now, msg.conversation_id.0],
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a conversation in insertion order.
///
/// Ordered by row id, never by `created_at`: timestamps follow the wall
/// clock and can step backwards.
pub async fn load_messages(
    db: &Database,
    conversation_id: ConversationId,
) -> Result<Vec<Message>, RolechatError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, audio_id, metadata,
                        token_used, processing_time_ms, created_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id.0], |row| {
                let role: String = row.get(2)?;
                let metadata: Option<String> = row.get(5)?;
                let metadata = metadata
                    .map(|raw| serde_json::from_str(&raw))
                    .transpose()
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?;
                let processing: Option<i64> = row.get(7)?;
                Ok(Message {
                    id: MessageId(row.get(0)?),
                    conversation_id: ConversationId(row.get(1)?),
                    role: Role::from_store(&role),
                    content: row.get(3)?,
                    audio_id: row.get(4)?,
                    metadata,
                    token_used: row.get(6)?,
                    processing_time_ms: processing.map(|ms| ms.max(0) as u64),
                    created_at: row.get(8)?,
                })
            })?;
            let messages = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
