// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations, applied on every open.

use outreach_core::OutreachError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run pending migrations. Refinery records applied versions in
/// `refinery_schema_history`, so this is safe to call repeatedly.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), OutreachError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| OutreachError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}
