// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table group.
//!
//! Every function takes `&Database` and runs through `connection().call()`.

pub mod communications;
pub mod conversations;
pub mod enrollments;
pub mod leads;
pub mod notifications;
pub mod templates;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use outreach_core::types::parse_timestamp;
use rusqlite::Row;
use rusqlite::types::Type;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Read a TEXT timestamp column.
pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("invalid timestamp `{raw}`")))
}

/// Read a nullable TEXT timestamp column.
pub(crate) fn optional_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse_timestamp(&raw)
            .ok_or_else(|| conversion_error(idx, format!("invalid timestamp `{raw}`")))
    })
    .transpose()
}

/// Read a TEXT column holding a strum-serialized enum.
pub(crate) fn enum_at<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|_| conversion_error(idx, format!("unexpected value `{raw}`")))
}

/// Read a TEXT column holding a JSON document.
pub(crate) fn json_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, format!("invalid JSON: {e}")))
}
