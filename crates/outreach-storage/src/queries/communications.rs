// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-once communication audit records.

use outreach_core::OutreachError;
use outreach_core::types::{format_timestamp, now, CommunicationRecord, NewCommunication};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use super::{enum_at, json_at, timestamp_at};

pub async fn insert_communication(
    db: &Database,
    fields: NewCommunication,
) -> Result<CommunicationRecord, OutreachError> {
    let record = CommunicationRecord {
        id: uuid::Uuid::new_v4().to_string(),
        lead_id: fields.lead_id,
        channel: fields.channel,
        direction: fields.direction,
        content: fields.content,
        status: fields.status,
        provider_id: fields.provider_id,
        metadata: fields.metadata,
        created_at: now(),
    };
    let row = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO communications
                 (id, lead_id, channel, direction, content, status, provider_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.lead_id,
                    row.channel.to_string(),
                    row.direction.to_string(),
                    row.content,
                    row.status,
                    row.provider_id,
                    row.metadata.to_string(),
                    format_timestamp(&row.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(record)
}

/// All records for a lead in insertion order.
pub async fn list_communications(
    db: &Database,
    lead_id: &str,
) -> Result<Vec<CommunicationRecord>, OutreachError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, lead_id, channel, direction, content, status, provider_id,
                        metadata, created_at
                 FROM communications WHERE lead_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![lead_id], |row| {
                Ok(CommunicationRecord {
                    id: row.get(0)?,
                    lead_id: row.get(1)?,
                    channel: enum_at(row, 2)?,
                    direction: enum_at(row, 3)?,
                    content: row.get(4)?,
                    status: row.get(5)?,
                    provider_id: row.get(6)?,
                    metadata: json_at(row, 7)?,
                    created_at: timestamp_at(row, 8)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
