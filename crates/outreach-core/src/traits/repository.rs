// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository traits for leads, conversations, the communication audit log,
//! and dashboard notifications.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::types::{
    Channel, CommunicationRecord, Conversation, Lead, MessageRole, NewCommunication, NewLead,
};

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Lead>, OutreachError>;

    async fn create(&self, fields: NewLead) -> Result<Lead, OutreachError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns the single conversation for (lead, channel), messages included.
    async fn find_by_lead_and_channel(
        &self,
        lead_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, OutreachError>;

    async fn create(
        &self,
        lead_id: &str,
        channel: Channel,
        agent_type: &str,
    ) -> Result<Conversation, OutreachError>;

    /// Appends one message to the end of the conversation.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), OutreachError>;
}

/// Write-once audit log of every message in either direction.
#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    async fn create(&self, record: NewCommunication) -> Result<CommunicationRecord, OutreachError>;

    /// All records for a lead in creation order.
    async fn list_for_lead(&self, lead_id: &str) -> Result<Vec<CommunicationRecord>, OutreachError>;
}

/// Per-user notification operations. Every call is scoped to `user_id`.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Returns `false` if no such notification belongs to the user.
    async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<bool, OutreachError>;

    /// Returns the number of notifications changed.
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, OutreachError>;

    /// Returns `false` if no such notification belongs to the user.
    async fn delete(&self, user_id: &str, notification_id: &str) -> Result<bool, OutreachError>;
}
