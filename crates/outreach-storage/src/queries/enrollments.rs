// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrollment rows and their compare-and-set transitions.
//!
//! Every mutation is a single conditional `UPDATE` keyed on the step the
//! caller read; a zero row count means another writer got there first.

use chrono::{DateTime, Utc};
use outreach_core::OutreachError;
use outreach_core::types::{
    format_timestamp, now, Enrollment, EnrollmentKey, EnrollmentStatus, ReleaseOutcome, StepUpdate,
};
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use crate::database::{map_tr_err, Database};
use super::{enum_at, optional_timestamp_at, timestamp_at};

const ENROLLMENT_COLUMNS: &str = "lead_id, campaign_id, current_step, status, next_touch_at, \
                                  attempts, claimed_until, created_at, updated_at";

fn row_to_enrollment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        lead_id: row.get(0)?,
        campaign_id: row.get(1)?,
        current_step: row.get(2)?,
        status: enum_at(row, 3)?,
        next_touch_at: optional_timestamp_at(row, 4)?,
        attempts: row.get(5)?,
        claimed_until: optional_timestamp_at(row, 6)?,
        created_at: timestamp_at(row, 7)?,
        updated_at: timestamp_at(row, 8)?,
    })
}

fn stamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(format_timestamp)
}

/// Insert a new enrollment. Returns `Conflict` if the key already exists.
pub async fn insert_enrollment(db: &Database, enrollment: &Enrollment) -> Result<(), OutreachError> {
    let e = enrollment.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO enrollments
                 (lead_id, campaign_id, current_step, status, next_touch_at, attempts,
                  claimed_until, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (lead_id, campaign_id) DO NOTHING",
                params![
                    e.lead_id,
                    e.campaign_id,
                    e.current_step,
                    e.status.to_string(),
                    stamp(e.next_touch_at),
                    e.attempts,
                    stamp(e.claimed_until),
                    format_timestamp(&e.created_at),
                    format_timestamp(&e.updated_at),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if inserted == 0 {
        return Err(OutreachError::Conflict(format!(
            "lead {} is already enrolled in campaign {}",
            enrollment.lead_id, enrollment.campaign_id
        )));
    }
    Ok(())
}

pub async fn get_enrollment(
    db: &Database,
    key: &EnrollmentKey,
) -> Result<Option<Enrollment>, OutreachError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                     WHERE lead_id = ?1 AND campaign_id = ?2"
                ),
                params![key.lead_id, key.campaign_id],
                row_to_enrollment,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// A due row that could not be decoded, with the key it was stored under.
type UnreadableRow = (String, String, rusqlite::Error);

/// In-progress enrollments due at `now` with no live claim, oldest first.
///
/// Rows whose columns fail to decode are logged and left out so one bad row
/// cannot stall every other enrollment.
pub async fn due_enrollments(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<Enrollment>, OutreachError> {
    let now = format_timestamp(&now);
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                 WHERE status = 'in_progress'
                   AND next_touch_at IS NOT NULL AND next_touch_at <= ?1
                   AND (claimed_until IS NULL OR claimed_until <= ?1)
                 ORDER BY next_touch_at ASC, lead_id ASC, campaign_id ASC"
            ))?;
            let rows = stmt.query_map(params![now], |row| {
                Ok(row_to_enrollment(row).map_err(|e| -> UnreadableRow {
                    let lead_id = row.get(0).unwrap_or_default();
                    let campaign_id = row.get(1).unwrap_or_default();
                    (lead_id, campaign_id, e)
                }))
            })?;
            rows.collect::<rusqlite::Result<Vec<Result<Enrollment, UnreadableRow>>>>()
        })
        .await
        .map_err(map_tr_err)?;

    let mut due = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Ok(enrollment) => due.push(enrollment),
            Err((lead_id, campaign_id, e)) => {
                warn!(%lead_id, %campaign_id, error = %e, "skipping unreadable enrollment row");
            }
        }
    }
    Ok(due)
}

/// Take a lease on the row if it is still at `expected_step` and unclaimed.
pub async fn claim(
    db: &Database,
    key: &EnrollmentKey,
    expected_step: u32,
    now: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<bool, OutreachError> {
    let key = key.clone();
    let now = format_timestamp(&now);
    let until = format_timestamp(&until);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE enrollments SET claimed_until = ?1, updated_at = ?2
                 WHERE lead_id = ?3 AND campaign_id = ?4
                   AND current_step = ?5 AND status = 'in_progress'
                   AND (claimed_until IS NULL OR claimed_until <= ?2)",
                params![until, now, key.lead_id, key.campaign_id, expected_step],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Write a step advance if the row is still at `expected_step`.
pub async fn advance(
    db: &Database,
    key: &EnrollmentKey,
    expected_step: u32,
    update: &StepUpdate,
) -> Result<bool, OutreachError> {
    let key = key.clone();
    let step = update.current_step();
    let status = update.status().to_string();
    let next = stamp(update.next_touch_at());
    let updated_at = format_timestamp(&now());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE enrollments
                 SET current_step = ?1, status = ?2, next_touch_at = ?3,
                     attempts = 0, claimed_until = NULL, updated_at = ?4
                 WHERE lead_id = ?5 AND campaign_id = ?6
                   AND current_step = ?7 AND status = 'in_progress'
                   AND ?1 >= current_step",
                params![
                    step,
                    status,
                    next,
                    updated_at,
                    key.lead_id,
                    key.campaign_id,
                    expected_step
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Drop the lease after a failed attempt and count the attempt.
pub async fn release(
    db: &Database,
    key: &EnrollmentKey,
    expected_step: u32,
    max_attempts: u32,
) -> Result<ReleaseOutcome, OutreachError> {
    let key = key.clone();
    let updated_at = format_timestamp(&now());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let attempts: Option<u32> = tx
                .query_row(
                    "UPDATE enrollments
                     SET attempts = attempts + 1, claimed_until = NULL, updated_at = ?1
                     WHERE lead_id = ?2 AND campaign_id = ?3
                       AND current_step = ?4 AND status = 'in_progress'
                     RETURNING attempts",
                    params![updated_at, key.lead_id, key.campaign_id, expected_step],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match attempts {
                None => ReleaseOutcome::Stale,
                Some(attempts) if max_attempts > 0 && attempts >= max_attempts => {
                    tx.execute(
                        "UPDATE enrollments SET status = ?1, next_touch_at = NULL
                         WHERE lead_id = ?2 AND campaign_id = ?3",
                        params![
                            EnrollmentStatus::Failed.to_string(),
                            key.lead_id,
                            key.campaign_id
                        ],
                    )?;
                    ReleaseOutcome::Failed { attempts }
                }
                Some(attempts) => ReleaseOutcome::Retry { attempts },
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}
