// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversations and their append-only message history.

use outreach_core::OutreachError;
use outreach_core::types::{
    format_timestamp, now, Channel, Conversation, ConversationMessage, MessageRole,
};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use super::{enum_at, timestamp_at};

fn load_messages(
    conn: &rusqlite::Connection,
    conversation_id: &str,
) -> rusqlite::Result<Vec<ConversationMessage>> {
    let mut stmt = conn.prepare(
        "SELECT role, content, created_at FROM conversation_messages
         WHERE conversation_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        Ok(ConversationMessage {
            role: enum_at(row, 0)?,
            content: row.get(1)?,
            timestamp: timestamp_at(row, 2)?,
        })
    })?;
    rows.collect()
}

/// The most recent conversation for a lead on a channel, with its messages.
pub async fn find_conversation(
    db: &Database,
    lead_id: &str,
    channel: Channel,
) -> Result<Option<Conversation>, OutreachError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let found = conn
                .query_row(
                    "SELECT id, lead_id, channel, agent_type, created_at FROM conversations
                     WHERE lead_id = ?1 AND channel = ?2
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    params![lead_id, channel.to_string()],
                    |row| {
                        Ok(Conversation {
                            id: row.get(0)?,
                            lead_id: row.get(1)?,
                            channel: enum_at(row, 2)?,
                            agent_type: row.get(3)?,
                            messages: Vec::new(),
                            created_at: timestamp_at(row, 4)?,
                        })
                    },
                )
                .optional()?;
            match found {
                Some(mut conversation) => {
                    conversation.messages = load_messages(conn, &conversation.id)?;
                    Ok(Some(conversation))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn create_conversation(
    db: &Database,
    lead_id: &str,
    channel: Channel,
    agent_type: &str,
) -> Result<Conversation, OutreachError> {
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        lead_id: lead_id.to_string(),
        channel,
        agent_type: agent_type.to_string(),
        messages: Vec::new(),
        created_at: now(),
    };
    let row = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, lead_id, channel, agent_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.lead_id,
                    row.channel.to_string(),
                    row.agent_type,
                    format_timestamp(&row.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(conversation)
}

/// Append a message. Fails with `NotFound` if the conversation does not exist.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    role: MessageRole,
    content: &str,
) -> Result<(), OutreachError> {
    let id = conversation_id.to_string();
    let content = content.to_string();
    let created_at = format_timestamp(&now());
    let inserted = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_messages (conversation_id, role, content, created_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE EXISTS (SELECT 1 FROM conversations WHERE id = ?1)",
                params![id, role.to_string(), content, created_at],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if inserted == 0 {
        return Err(OutreachError::NotFound {
            entity: "conversation",
            id: conversation_id.to_string(),
        });
    }
    Ok(())
}
