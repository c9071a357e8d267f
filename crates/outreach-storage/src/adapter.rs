// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of every repository and the enrollment store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use outreach_config::model::StorageConfig;
use outreach_core::types::{
    Channel, CommunicationRecord, Conversation, Enrollment, EnrollmentKey, Lead, MessageRole,
    NewCommunication, NewLead, Notification, ReleaseOutcome, StepUpdate, TouchTemplate,
};
use outreach_core::{
    CommunicationRepository, ConversationRepository, EnrollmentStore, LeadRepository,
    NotificationRepository, OutreachError, TemplateCatalog,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage.
///
/// One value serves every repository trait, so callers typically wrap it in
/// an `Arc` and hand clones to the sequencer and the chat engine.
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Open the database described by `config` and apply migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, OutreachError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite storage initialized");
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), OutreachError> {
        self.db.checkpoint().await
    }

    /// Insert or replace a touch template.
    pub async fn upsert_template(&self, template: &TouchTemplate) -> Result<(), OutreachError> {
        queries::templates::upsert_template(&self.db, template).await
    }

    pub async fn create_notification(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
    ) -> Result<Notification, OutreachError> {
        queries::notifications::insert_notification(&self.db, user_id, title, body).await
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, OutreachError> {
        queries::notifications::list_notifications(&self.db, user_id).await
    }
}

#[async_trait]
impl LeadRepository for SqliteStorage {
    async fn find_by_id(&self, id: &str) -> Result<Option<Lead>, OutreachError> {
        queries::leads::find_lead(&self.db, id).await
    }

    async fn create(&self, fields: NewLead) -> Result<Lead, OutreachError> {
        queries::leads::create_lead(&self.db, fields).await
    }
}

#[async_trait]
impl ConversationRepository for SqliteStorage {
    async fn find_by_lead_and_channel(
        &self,
        lead_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, OutreachError> {
        queries::conversations::find_conversation(&self.db, lead_id, channel).await
    }

    async fn create(
        &self,
        lead_id: &str,
        channel: Channel,
        agent_type: &str,
    ) -> Result<Conversation, OutreachError> {
        queries::conversations::create_conversation(&self.db, lead_id, channel, agent_type).await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), OutreachError> {
        queries::conversations::append_message(&self.db, conversation_id, role, content).await
    }
}

#[async_trait]
impl CommunicationRepository for SqliteStorage {
    async fn create(&self, record: NewCommunication) -> Result<CommunicationRecord, OutreachError> {
        queries::communications::insert_communication(&self.db, record).await
    }

    async fn list_for_lead(&self, lead_id: &str) -> Result<Vec<CommunicationRecord>, OutreachError> {
        queries::communications::list_communications(&self.db, lead_id).await
    }
}

#[async_trait]
impl NotificationRepository for SqliteStorage {
    async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<bool, OutreachError> {
        queries::notifications::mark_read(&self.db, user_id, notification_id).await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, OutreachError> {
        queries::notifications::mark_all_read(&self.db, user_id).await
    }

    async fn delete(&self, user_id: &str, notification_id: &str) -> Result<bool, OutreachError> {
        queries::notifications::delete_notification(&self.db, user_id, notification_id).await
    }
}

#[async_trait]
impl EnrollmentStore for SqliteStorage {
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), OutreachError> {
        queries::enrollments::insert_enrollment(&self.db, enrollment).await
    }

    async fn get_enrollment(
        &self,
        key: &EnrollmentKey,
    ) -> Result<Option<Enrollment>, OutreachError> {
        queries::enrollments::get_enrollment(&self.db, key).await
    }

    async fn due_enrollments(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>, OutreachError> {
        queries::enrollments::due_enrollments(&self.db, now).await
    }

    async fn claim(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool, OutreachError> {
        queries::enrollments::claim(&self.db, key, expected_step, now, until).await
    }

    async fn advance(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        update: &StepUpdate,
    ) -> Result<bool, OutreachError> {
        queries::enrollments::advance(&self.db, key, expected_step, update).await
    }

    async fn release(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        max_attempts: u32,
    ) -> Result<ReleaseOutcome, OutreachError> {
        queries::enrollments::release(&self.db, key, expected_step, max_attempts).await
    }
}

#[async_trait]
impl TemplateCatalog for SqliteStorage {
    async fn get_template(
        &self,
        campaign_id: &str,
        sequence_order: u32,
    ) -> Result<Option<TouchTemplate>, OutreachError> {
        queries::templates::get_template(&self.db, campaign_id, sequence_order).await
    }

    async fn list_templates(&self, campaign_id: &str) -> Result<Vec<TouchTemplate>, OutreachError> {
        queries::templates::list_templates(&self.db, campaign_id).await
    }
}
