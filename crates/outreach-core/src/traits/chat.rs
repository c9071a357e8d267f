// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits consumed by the chat engine.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::types::{Conversation, Lead};

/// Identity of the live session a responder is answering for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub connection_id: String,
    pub session_id: String,
    pub user_id: Option<String>,
}

/// Everything a responder sees when producing a message.
#[derive(Debug, Clone)]
pub struct ResponderContext {
    pub lead: Lead,
    pub conversation: Conversation,
    /// The inbound user message; `None` for the initial greeting.
    pub message: Option<String>,
    pub session: SessionContext,
}

/// A responder's answer to one chat turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponderReply {
    pub content: String,
    pub quick_replies: Vec<String>,
    pub should_handover: bool,
    pub handover_reason: Option<String>,
}

/// Per-channel content generator (the chat agent).
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produces the welcome message sent when a session starts.
    async fn generate_initial_message(
        &self,
        context: &ResponderContext,
        trigger: &str,
    ) -> Result<String, OutreachError>;

    /// Produces the reply to `context.message`.
    async fn generate_response(
        &self,
        context: &ResponderContext,
    ) -> Result<ResponderReply, OutreachError>;
}

/// Runs the coordinating agent over a lead on request from a dashboard.
#[async_trait]
pub trait LeadProcessor: Send + Sync {
    /// Returns a JSON summary of what was decided for the lead.
    async fn process_lead(&self, lead_id: &str) -> Result<serde_json::Value, OutreachError>;
}
