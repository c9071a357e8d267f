// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire protocol for the chat WebSocket.
//!
//! Every frame is a JSON object with a `type` discriminator; the remaining
//! fields are camelCase.
//!
//! Client -> Server:
//! ```json
//! {"type": "auth", "userId": "u-1"}
//! {"type": "chat:init", "sessionId": "s-1", "leadId": "anonymous", "metadata": {"name": "Ann"}}
//! {"type": "chat:message", "content": "Do you ship to Canada?"}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "chat:connected", "sessionId": "s-1", "leadId": "...", "conversationId": "...", "message": "Hi Ann!"}
//! {"type": "chat:typing", "sessionId": "s-1"}
//! {"type": "chat:message", "sessionId": "s-1", "content": "...", "quickReplies": [], "timestamp": "..."}
//! {"type": "error", "code": "session_not_initialized", "message": "..."}
//! ```

use chrono::{DateTime, Utc};
use outreach_core::types::{ConversationMessage, Lead};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth(AuthRequest),
    #[serde(rename = "chat:init")]
    ChatInit(ChatInit),
    #[serde(rename = "chat:message")]
    ChatMessage(ChatMessageRequest),
    #[serde(rename = "mark_notification_read")]
    MarkNotificationRead(NotificationRef),
    #[serde(rename = "mark_all_notifications_read")]
    MarkAllNotificationsRead,
    #[serde(rename = "delete_notification")]
    DeleteNotification(NotificationRef),
    #[serde(rename = "agent_update")]
    AgentUpdate(UpdatePayload),
    #[serde(rename = "lead_update")]
    LeadUpdate(UpdatePayload),
    #[serde(rename = "process_lead")]
    ProcessLead(ProcessLeadRequest),
}

impl ClientMessage {
    /// The wire `type` of this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Auth(_) => "auth",
            ClientMessage::ChatInit(_) => "chat:init",
            ClientMessage::ChatMessage(_) => "chat:message",
            ClientMessage::MarkNotificationRead(_) => "mark_notification_read",
            ClientMessage::MarkAllNotificationsRead => "mark_all_notifications_read",
            ClientMessage::DeleteNotification(_) => "delete_notification",
            ClientMessage::AgentUpdate(_) => "agent_update",
            ClientMessage::LeadUpdate(_) => "lead_update",
            ClientMessage::ProcessLead(_) => "process_lead",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInit {
    pub session_id: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub metadata: VisitorMetadata,
}

/// What the widget knows about the visitor. Unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(alias = "message")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRef {
    pub notification_id: String,
}

/// Free-form update relayed between dashboard observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessLeadRequest {
    pub lead_id: String,
}

/// A frame sent to a client, either directly or through the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "chat:connected")]
    ChatConnected(ChatConnected),
    #[serde(rename = "chat:message")]
    ChatMessage(ChatReply),
    #[serde(rename = "chat:typing")]
    Typing(SessionRef),
    #[serde(rename = "chat:stopTyping")]
    StopTyping(SessionRef),
    #[serde(rename = "chat:disconnected")]
    ChatDisconnected(SessionEnded),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "agent_update")]
    AgentUpdate(RelayedUpdate),
    #[serde(rename = "lead_update")]
    LeadUpdate(RelayedUpdate),
    #[serde(rename = "chat_handover_requested")]
    HandoverRequested(HandoverRequested),
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorEvent {
            code: code.into(),
            message: message.into(),
        })
    }

    /// The wire `type` of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::ChatConnected(_) => "chat:connected",
            ServerEvent::ChatMessage(_) => "chat:message",
            ServerEvent::Typing(_) => "chat:typing",
            ServerEvent::StopTyping(_) => "chat:stopTyping",
            ServerEvent::ChatDisconnected(_) => "chat:disconnected",
            ServerEvent::Error(_) => "error",
            ServerEvent::AgentUpdate(_) => "agent_update",
            ServerEvent::LeadUpdate(_) => "lead_update",
            ServerEvent::HandoverRequested(_) => "chat_handover_requested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConnected {
    pub session_id: String,
    pub lead_id: String,
    pub conversation_id: String,
    /// The welcome message.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    pub content: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub session_id: String,
    pub lead_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedUpdate {
    /// User that originated the update; `None` for server-originated updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub data: Value,
}

/// Advisory broadcast asking a human to take over a conversation.
///
/// Carries the lead and the tail of the conversation so observers can act
/// without a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverRequested {
    pub session_id: String,
    pub lead_id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub lead: Lead,
    /// Most recent messages, oldest first, ending with the reply just sent.
    #[serde(default)]
    pub recent_messages: Vec<ConversationMessage>,
}

/// Error codes carried by [`ServerEvent::Error`].
pub mod error_codes {
    pub const INVALID_MESSAGE: &str = "invalid_message";
    pub const SESSION_NOT_INITIALIZED: &str = "session_not_initialized";
    pub const LEAD_NOT_FOUND: &str = "lead_not_found";
    pub const RESPONDER_FAILED: &str = "responder_failed";
    pub const UNSUPPORTED: &str = "unsupported";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_inbound_type() {
        let frames = [
            json!({"type": "auth", "userId": "u1"}),
            json!({"type": "chat:init", "sessionId": "s1"}),
            json!({"type": "chat:message", "content": "hi"}),
            json!({"type": "mark_notification_read", "notificationId": "n1"}),
            json!({"type": "mark_all_notifications_read"}),
            json!({"type": "delete_notification", "notificationId": "n1"}),
            json!({"type": "agent_update", "data": {"status": "busy"}}),
            json!({"type": "lead_update", "data": {}}),
            json!({"type": "process_lead", "leadId": "l1"}),
        ];
        for frame in frames {
            let expected = frame["type"].as_str().unwrap().to_string();
            let parsed: ClientMessage = serde_json::from_value(frame).unwrap();
            assert_eq!(parsed.kind(), expected);
        }
    }

    #[test]
    fn chat_init_keeps_visitor_extras() {
        let parsed: ClientMessage = serde_json::from_value(json!({
            "type": "chat:init",
            "sessionId": "s1",
            "leadId": "anonymous",
            "metadata": {"name": "Ann", "page": "/pricing"}
        }))
        .unwrap();
        let ClientMessage::ChatInit(init) = parsed else {
            panic!("expected chat:init");
        };
        assert_eq!(init.lead_id.as_deref(), Some("anonymous"));
        assert_eq!(init.metadata.name.as_deref(), Some("Ann"));
        assert_eq!(init.metadata.extra["page"], "/pricing");
    }

    #[test]
    fn chat_message_accepts_message_alias() {
        let parsed: ClientMessage =
            serde_json::from_value(json!({"type": "chat:message", "message": "hello"})).unwrap();
        assert_eq!(
            parsed,
            ClientMessage::ChatMessage(ChatMessageRequest {
                content: "hello".into()
            })
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "chat:shout", "content": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn outbound_events_use_wire_names() {
        let stop = serde_json::to_value(ServerEvent::StopTyping(SessionRef {
            session_id: "s1".into(),
        }))
        .unwrap();
        assert_eq!(stop, json!({"type": "chat:stopTyping", "sessionId": "s1"}));

        let created_at: DateTime<Utc> = "2026-03-02T09:00:00Z".parse().unwrap();
        let handover = serde_json::to_value(ServerEvent::HandoverRequested(HandoverRequested {
            session_id: "s1".into(),
            lead_id: "l1".into(),
            conversation_id: "c1".into(),
            reason: None,
            lead: Lead {
                id: "l1".into(),
                name: "Ann".into(),
                email: Some("ann@example.com".into()),
                phone: None,
                source: "chat_widget".into(),
                metadata: json!({}),
                created_at,
            },
            recent_messages: vec![ConversationMessage {
                role: outreach_core::types::MessageRole::User,
                content: "a human please".into(),
                timestamp: created_at,
            }],
        }))
        .unwrap();
        assert_eq!(handover["type"], "chat_handover_requested");
        assert_eq!(handover["sessionId"], "s1");
        assert_eq!(handover["conversationId"], "c1");
        assert!(handover.get("reason").is_none());
        assert_eq!(handover["lead"]["name"], "Ann");
        assert_eq!(handover["lead"]["email"], "ann@example.com");
        assert_eq!(handover["recentMessages"][0]["role"], "user");
        assert_eq!(handover["recentMessages"][0]["content"], "a human please");

        let error = serde_json::to_value(ServerEvent::error("lead_not_found", "no such lead")).unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["code"], "lead_not_found");
    }
}
