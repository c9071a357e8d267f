// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user notifications. Every mutation is scoped by `user_id`.

use outreach_core::OutreachError;
use outreach_core::types::{format_timestamp, now, Notification};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use super::timestamp_at;

pub async fn insert_notification(
    db: &Database,
    user_id: &str,
    title: &str,
    body: &str,
) -> Result<Notification, OutreachError> {
    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        read: false,
        created_at: now(),
    };
    let row = notification.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, title, body, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    row.id,
                    row.user_id,
                    row.title,
                    row.body,
                    format_timestamp(&row.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(notification)
}

pub async fn list_notifications(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Notification>, OutreachError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, body, read, created_at FROM notifications
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                    read: row.get(4)?,
                    created_at: timestamp_at(row, 5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Returns whether a notification owned by `user_id` was updated.
pub async fn mark_read(
    db: &Database,
    user_id: &str,
    notification_id: &str,
) -> Result<bool, OutreachError> {
    let user_id = user_id.to_string();
    let notification_id = notification_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![notification_id, user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

/// Returns how many unread notifications were flipped.
pub async fn mark_all_read(db: &Database, user_id: &str) -> Result<u64, OutreachError> {
    let user_id = user_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed as u64)
}

pub async fn delete_notification(
    db: &Database,
    user_id: &str,
    notification_id: &str,
) -> Result<bool, OutreachError> {
    let user_id = user_id.to_string();
    let notification_id = notification_id.to_string();
    let removed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![notification_id, user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(removed > 0)
}
