// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary SQLite storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use outreach_config::model::StorageConfig;
use outreach_core::types::{Channel, NewLead, TouchTemplate};
use outreach_core::{Lead, LeadRepository, OutreachError};
use outreach_storage::SqliteStorage;

/// A migrated database that lives as long as this value.
pub struct TempStorage {
    pub storage: Arc<SqliteStorage>,
    config: StorageConfig,
    _temp_dir: tempfile::TempDir,
}

impl TempStorage {
    pub async fn new() -> Result<Self, OutreachError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| OutreachError::Storage { source: e.into() })?;
        let config = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::open(&config).await?;
        Ok(Self {
            storage: Arc::new(storage),
            config,
            _temp_dir: temp_dir,
        })
    }

    /// Open a second storage handle on the same database file.
    pub async fn reopen(&self) -> Result<SqliteStorage, OutreachError> {
        SqliteStorage::open(&self.config).await
    }

    /// Insert a lead with just a name.
    pub async fn seed_lead(&self, name: &str) -> Result<Lead, OutreachError> {
        self.storage
            .create(NewLead {
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                source: "import".to_string(),
                metadata: serde_json::json!({}),
                ..Default::default()
            })
            .await
    }

    /// Insert an email campaign whose templates have the given delays.
    pub async fn seed_campaign(
        &self,
        campaign_id: &str,
        delays_hours: &[f64],
    ) -> Result<Vec<TouchTemplate>, OutreachError> {
        let mut templates = Vec::with_capacity(delays_hours.len());
        for (index, delay) in delays_hours.iter().enumerate() {
            let template = TouchTemplate {
                campaign_id: campaign_id.to_string(),
                sequence_order: index as u32 + 1,
                delay_hours: *delay,
                channel: Channel::Email,
                subject: Some(format!("Touch {}", index + 1)),
                content: format!("Body of touch {}", index + 1),
            };
            self.storage.upsert_template(&template).await?;
            templates.push(template);
        }
        Ok(templates)
    }
}

/// Fixed instant used as "now" by sequencer tests.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}
