// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock responder and lead processor for deterministic chat tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_core::traits::{LeadProcessor, Responder, ResponderContext, ResponderReply};
use outreach_core::OutreachError;

/// A responder that returns queued replies.
///
/// When the queue is empty, replies echo the inbound message. Every context
/// the responder sees is recorded for assertions.
pub struct MockResponder {
    welcome: String,
    replies: Arc<Mutex<VecDeque<ResponderReply>>>,
    contexts: Arc<Mutex<Vec<ResponderContext>>>,
    fail_responses: AtomicBool,
    fail_welcome: AtomicBool,
}

impl MockResponder {
    pub fn new() -> Self {
        Self::with_welcome("Welcome! How can we help?")
    }

    pub fn with_welcome(welcome: impl Into<String>) -> Self {
        Self {
            welcome: welcome.into(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            contexts: Arc::new(Mutex::new(Vec::new())),
            fail_responses: AtomicBool::new(false),
            fail_welcome: AtomicBool::new(false),
        }
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Queue a plain reply.
    pub async fn add_reply(&self, content: impl Into<String>) {
        self.replies.lock().await.push_back(ResponderReply {
            content: content.into(),
            ..Default::default()
        });
    }

    /// Queue a reply that requests a human handover.
    pub async fn add_handover(&self, content: impl Into<String>, reason: impl Into<String>) {
        self.replies.lock().await.push_back(ResponderReply {
            content: content.into(),
            quick_replies: Vec::new(),
            should_handover: true,
            handover_reason: Some(reason.into()),
        });
    }

    /// Make every `generate_response` call fail.
    pub fn fail_responses(&self, fail: bool) {
        self.fail_responses.store(fail, Ordering::SeqCst);
    }

    /// Make every `generate_initial_message` call fail.
    pub fn fail_welcome(&self, fail: bool) {
        self.fail_welcome.store(fail, Ordering::SeqCst);
    }

    /// Contexts passed to `generate_response`, in call order.
    pub async fn contexts(&self) -> Vec<ResponderContext> {
        self.contexts.lock().await.clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

fn unavailable() -> OutreachError {
    OutreachError::Responder {
        message: "mock responder unavailable".to_string(),
        source: None,
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn generate_initial_message(
        &self,
        _context: &ResponderContext,
        _trigger: &str,
    ) -> Result<String, OutreachError> {
        if self.fail_welcome.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.welcome.clone())
    }

    async fn generate_response(
        &self,
        context: &ResponderContext,
    ) -> Result<ResponderReply, OutreachError> {
        self.contexts.lock().await.push(context.clone());
        if self.fail_responses.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let queued = self.replies.lock().await.pop_front();
        Ok(queued.unwrap_or_else(|| ResponderReply {
            content: format!("echo: {}", context.message.as_deref().unwrap_or_default()),
            ..Default::default()
        }))
    }
}

/// A lead processor that returns `{"leadId": .., "action": <action>}`.
pub struct MockLeadProcessor {
    action: String,
    calls: AtomicUsize,
}

impl MockLeadProcessor {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeadProcessor for MockLeadProcessor {
    async fn process_lead(&self, lead_id: &str) -> Result<serde_json::Value, OutreachError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({ "leadId": lead_id, "action": self.action }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::traits::SessionContext;
    use outreach_core::types::{Channel, Conversation, Lead};

    fn context(message: &str) -> ResponderContext {
        let now = outreach_core::types::now();
        ResponderContext {
            lead: Lead {
                id: "lead-1".into(),
                name: "Ann".into(),
                email: None,
                phone: None,
                source: "chat_widget".into(),
                metadata: serde_json::json!({}),
                created_at: now,
            },
            conversation: Conversation {
                id: "conv-1".into(),
                lead_id: "lead-1".into(),
                channel: Channel::Chat,
                agent_type: "chat".into(),
                messages: Vec::new(),
                created_at: now,
            },
            message: Some(message.into()),
            session: SessionContext {
                connection_id: "c1".into(),
                session_id: "s1".into(),
                user_id: None,
            },
        }
    }

    #[tokio::test]
    async fn queued_replies_then_echo() {
        let responder = MockResponder::new();
        responder.add_reply("first").await;

        let reply = responder.generate_response(&context("hi")).await.unwrap();
        assert_eq!(reply.content, "first");
        let reply = responder.generate_response(&context("again")).await.unwrap();
        assert_eq!(reply.content, "echo: again");
        assert_eq!(responder.contexts().await.len(), 2);
    }

    #[tokio::test]
    async fn failure_injection() {
        let responder = MockResponder::new();
        responder.fail_responses(true);
        let err = responder.generate_response(&context("hi")).await.unwrap_err();
        assert_eq!(err.code(), "responder_failed");
    }
}
