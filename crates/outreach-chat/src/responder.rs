// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-driven default responder.
//!
//! Content quality is out of scope for the engine; this responder exists so
//! `outreach serve` works without an external agent. Any message containing
//! a configured handover keyword requests a human.

use async_trait::async_trait;

use outreach_core::traits::{Responder, ResponderContext, ResponderReply};
use outreach_core::OutreachError;

const QUICK_REPLIES: [&str; 3] = ["Pricing", "Book a demo", "Talk to a human"];

const HANDOVER_REPLY: &str =
    "Let me connect you with someone from our team. They will be with you shortly.";

const DEFAULT_REPLY: &str = "Thanks! A specialist will follow up with details. \
                             Is there anything else you'd like to know?";

#[derive(Debug, Clone)]
pub struct ScriptedResponder {
    handover_keywords: Vec<String>,
}

impl ScriptedResponder {
    pub fn new(handover_keywords: &[String]) -> Self {
        Self {
            handover_keywords: handover_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    fn matched_keyword(&self, message: &str) -> Option<&str> {
        let message = message.to_lowercase();
        self.handover_keywords
            .iter()
            .find(|k| message.contains(k.as_str()))
            .map(String::as_str)
    }
}

fn first_name(name: &str) -> Option<&str> {
    name.split_whitespace().next()
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn generate_initial_message(
        &self,
        context: &ResponderContext,
        _trigger: &str,
    ) -> Result<String, OutreachError> {
        let returning = !context.conversation.messages.is_empty();
        let greeting = match first_name(&context.lead.name) {
            Some(name) => format!("Hi {name}!"),
            None => "Hi there!".to_string(),
        };
        Ok(if returning {
            format!("{greeting} Welcome back. What can we help you with today?")
        } else {
            format!("{greeting} Thanks for reaching out. How can we help you today?")
        })
    }

    async fn generate_response(
        &self,
        context: &ResponderContext,
    ) -> Result<ResponderReply, OutreachError> {
        let message = context.message.as_deref().unwrap_or_default();

        if let Some(keyword) = self.matched_keyword(message) {
            return Ok(ResponderReply {
                content: HANDOVER_REPLY.to_string(),
                quick_replies: Vec::new(),
                should_handover: true,
                handover_reason: Some(format!("visitor asked for \"{keyword}\"")),
            });
        }

        Ok(ResponderReply {
            content: DEFAULT_REPLY.to_string(),
            quick_replies: QUICK_REPLIES.iter().map(|s| s.to_string()).collect(),
            should_handover: false,
            handover_reason: None,
        })
    }
}
