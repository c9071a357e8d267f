// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead lookup and creation.

use outreach_core::OutreachError;
use outreach_core::types::{format_timestamp, now, Lead, NewLead};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use super::{json_at, timestamp_at};

const LEAD_COLUMNS: &str = "id, name, email, phone, source, metadata, created_at";

fn row_to_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        source: row.get(4)?,
        metadata: json_at(row, 5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

pub async fn find_lead(db: &Database, id: &str) -> Result<Option<Lead>, OutreachError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id],
                row_to_lead,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a lead with a fresh UUID v4 id.
pub async fn create_lead(db: &Database, fields: NewLead) -> Result<Lead, OutreachError> {
    let lead = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: fields.name,
        email: fields.email,
        phone: fields.phone,
        source: fields.source,
        metadata: fields.metadata,
        created_at: now(),
    };
    let row = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads (id, name, email, phone, source, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.id,
                    row.name,
                    row.email,
                    row.phone,
                    row.source,
                    row.metadata.to_string(),
                    format_timestamp(&row.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(lead)
}
