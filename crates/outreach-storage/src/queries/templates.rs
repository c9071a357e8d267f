// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Touch template catalog.

use outreach_core::OutreachError;
use outreach_core::types::TouchTemplate;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use super::enum_at;

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<TouchTemplate> {
    Ok(TouchTemplate {
        campaign_id: row.get(0)?,
        sequence_order: row.get(1)?,
        delay_hours: row.get(2)?,
        channel: enum_at(row, 3)?,
        subject: row.get(4)?,
        content: row.get(5)?,
    })
}

/// Insert or replace the template at `(campaign_id, sequence_order)`.
pub async fn upsert_template(db: &Database, template: &TouchTemplate) -> Result<(), OutreachError> {
    let t = template.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO touch_templates
                 (campaign_id, sequence_order, delay_hours, channel, subject, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (campaign_id, sequence_order) DO UPDATE SET
                     delay_hours = excluded.delay_hours,
                     channel = excluded.channel,
                     subject = excluded.subject,
                     content = excluded.content",
                params![
                    t.campaign_id,
                    t.sequence_order,
                    t.delay_hours,
                    t.channel.to_string(),
                    t.subject,
                    t.content
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template(
    db: &Database,
    campaign_id: &str,
    sequence_order: u32,
) -> Result<Option<TouchTemplate>, OutreachError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT campaign_id, sequence_order, delay_hours, channel, subject, content
                 FROM touch_templates WHERE campaign_id = ?1 AND sequence_order = ?2",
                params![campaign_id, sequence_order],
                row_to_template,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_templates(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<TouchTemplate>, OutreachError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT campaign_id, sequence_order, delay_hours, channel, subject, content
                 FROM touch_templates WHERE campaign_id = ?1 ORDER BY sequence_order ASC",
            )?;
            let rows = stmt.query_map(params![campaign_id], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
