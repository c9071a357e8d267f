// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end chat flows through the engine and SQLite storage.

use std::sync::Arc;

use serde_json::json;

use outreach_chat::protocol::{error_codes, ServerEvent};
use outreach_chat::SessionState;
use outreach_config::model::UnknownLeadPolicy;
use outreach_core::types::{Channel, Direction, MessageRole, NewLead};
use outreach_core::{CommunicationRepository, ConversationRepository, LeadRepository};
use outreach_test_utils::{ChatHarness, MockLeadProcessor, MockResponder};

fn connected(events: &[ServerEvent]) -> &outreach_chat::protocol::ChatConnected {
    events
        .iter()
        .find_map(|e| match e {
            ServerEvent::ChatConnected(c) => Some(c),
            _ => None,
        })
        .expect("chat:connected event")
}

fn error_code(events: &[ServerEvent]) -> Option<&str> {
    events.iter().find_map(|e| match e {
        ServerEvent::Error(err) => Some(err.code.as_str()),
        _ => None,
    })
}

fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(ServerEvent::kind).collect()
}

#[tokio::test]
async fn anonymous_init_creates_chat_widget_lead() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    let metadata = json!({ "name": "Ann", "page": "/pricing" });
    let events = client
        .init("sess-123456789", Some("anonymous"), metadata)
        .await;
    let connected = connected(&events);
    assert_eq!(connected.message, harness.responder.welcome());

    let lead = harness
        .storage
        .find_by_id(&connected.lead_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.name, "Ann");
    assert_eq!(lead.source, "chat_widget");
    assert_eq!(lead.metadata["sessionId"], "sess-123456789");
    assert_eq!(lead.metadata["page"], "/pricing");

    let conversation = harness
        .storage
        .find_by_lead_and_channel(&lead.id, Channel::Chat)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.id, connected.conversation_id);
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].role, MessageRole::Assistant);

    let records = harness.storage.list_for_lead(&lead.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].direction, Direction::Outbound);
    assert_eq!(records[0].metadata["kind"], "welcome");

    assert!(matches!(
        harness.engine.sessions().state(client.id()),
        SessionState::Active { .. }
    ));
}

#[tokio::test]
async fn init_without_lead_or_name_uses_placeholder() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    let events = client.init("abcdef123456", None, json!({})).await;
    let lead_id = connected(&events).lead_id.clone();

    let lead = harness.storage.find_by_id(&lead_id).await.unwrap().unwrap();
    assert_eq!(lead.name, "Chat Visitor abcdef12");
}

#[tokio::test]
async fn known_lead_reuses_conversation() {
    let harness = ChatHarness::new().await.unwrap();
    let lead = LeadRepository::create(
        &*harness.storage,
        NewLead {
            name: "Bea".into(),
            source: "import".into(),
            metadata: json!({}),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut first = harness.connect();
    let conversation_id = connected(&first.init("s1", Some(&lead.id), json!({})).await)
        .conversation_id
        .clone();
    first.disconnect();

    let mut second = harness.connect();
    let events = second.init("s2", Some(&lead.id), json!({})).await;
    let reconnected = connected(&events);
    assert_eq!(reconnected.lead_id, lead.id);
    assert_eq!(reconnected.conversation_id, conversation_id);
}

#[tokio::test]
async fn message_before_init_is_rejected_without_side_effects() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    let events = client.say("hello?").await;

    assert_eq!(kinds(&events), vec!["error"]);
    assert_eq!(error_code(&events), Some(error_codes::SESSION_NOT_INITIALIZED));
    assert!(harness.responder.contexts().await.is_empty());
}

#[tokio::test]
async fn chat_turn_persists_both_sides_in_order() {
    let responder = MockResponder::new();
    responder.add_reply("We start at $49/month.").await;
    let harness = ChatHarness::builder()
        .with_responder(responder)
        .build()
        .await
        .unwrap();
    let mut client = harness.connect();
    let lead_id = connected(&client.init("s-turn", None, json!({ "name": "Cal" })).await)
        .lead_id
        .clone();

    let events = client.say("How much does it cost?").await;

    assert_eq!(
        kinds(&events),
        vec!["chat:typing", "chat:message", "chat:stopTyping"]
    );
    match &events[1] {
        ServerEvent::ChatMessage(reply) => {
            assert_eq!(reply.session_id, "s-turn");
            assert_eq!(reply.content, "We start at $49/month.");
        }
        other => panic!("expected chat:message, got {other:?}"),
    }

    let records = harness.storage.list_for_lead(&lead_id).await.unwrap();
    let turn: Vec<_> = records.iter().skip(1).collect();
    assert_eq!(turn.len(), 2);
    assert_eq!(turn[0].direction, Direction::Inbound);
    assert_eq!(turn[0].content, "How much does it cost?");
    assert_eq!(turn[0].status, "received");
    assert_eq!(turn[1].direction, Direction::Outbound);
    assert_eq!(turn[1].content, "We start at $49/month.");

    let conversation = harness
        .storage
        .find_by_lead_and_channel(&lead_id, Channel::Chat)
        .await
        .unwrap()
        .unwrap();
    let roles: Vec<_> = conversation.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
    );

    let contexts = harness.responder.contexts().await;
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].message.as_deref(), Some("How much does it cost?"));
    assert_eq!(contexts[0].session.session_id, "s-turn");
    // The responder sees history including the message it is answering.
    assert_eq!(contexts[0].conversation.messages.len(), 2);
}

#[tokio::test]
async fn handover_is_broadcast_to_identified_observers() {
    let responder = MockResponder::new();
    responder
        .add_handover("Connecting you with our team.", "asked for a human")
        .await;
    let harness = ChatHarness::builder()
        .with_responder(responder)
        .build()
        .await
        .unwrap();

    let mut agent = harness.connect();
    agent.auth("agent-7").await;
    let mut visitor = harness.connect();
    let lead_id = connected(&visitor.init("s-h", None, json!({})).await)
        .lead_id
        .clone();

    let events = visitor.say("I want a human").await;
    assert_eq!(
        kinds(&events),
        vec!["chat:typing", "chat:message", "chat:stopTyping"]
    );

    let observed = agent.drain();
    assert_eq!(observed.len(), 1);
    match &observed[0] {
        ServerEvent::HandoverRequested(handover) => {
            assert_eq!(handover.session_id, "s-h");
            assert_eq!(handover.lead_id, lead_id);
            assert_eq!(handover.reason.as_deref(), Some("asked for a human"));
            assert_eq!(handover.lead.id, lead_id);
            assert_eq!(handover.lead.source, "chat_widget");
            let tail: Vec<(MessageRole, &str)> = handover
                .recent_messages
                .iter()
                .map(|m| (m.role, m.content.as_str()))
                .collect();
            assert_eq!(
                tail,
                vec![
                    (MessageRole::Assistant, "Welcome! How can we help?"),
                    (MessageRole::User, "I want a human"),
                    (MessageRole::Assistant, "Connecting you with our team."),
                ]
            );
        }
        other => panic!("expected chat_handover_requested, got {other:?}"),
    }
}

#[tokio::test]
async fn responder_failure_stops_typing_and_reports_error() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();
    let lead_id = connected(&client.init("s-f", None, json!({})).await)
        .lead_id
        .clone();
    harness.responder.fail_responses(true);

    let events = client.say("anyone there?").await;

    assert_eq!(kinds(&events), vec!["chat:typing", "chat:stopTyping", "error"]);
    assert_eq!(error_code(&events), Some(error_codes::RESPONDER_FAILED));

    // Welcome plus the inbound record; no outbound reply was written.
    let records = harness.storage.list_for_lead(&lead_id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].direction, Direction::Inbound);

    // The session stays usable.
    harness.responder.fail_responses(false);
    let events = client.say("retry").await;
    assert!(kinds(&events).contains(&"chat:message"));
}

#[tokio::test]
async fn unknown_lead_rejected_by_policy() {
    let harness = ChatHarness::builder()
        .with_unknown_lead_policy(UnknownLeadPolicy::Reject)
        .build()
        .await
        .unwrap();
    let mut client = harness.connect();

    let events = client.init("s-r", Some("no-such-lead"), json!({})).await;

    assert_eq!(kinds(&events), vec!["error"]);
    assert_eq!(error_code(&events), Some(error_codes::LEAD_NOT_FOUND));
    assert_eq!(
        harness.engine.sessions().state(client.id()),
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn unknown_lead_created_by_default() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    let events = client.init("s-c", Some("crm-42"), json!({ "name": "Dot" })).await;
    let lead_id = connected(&events).lead_id.clone();

    assert_ne!(lead_id, "crm-42");
    let lead = harness.storage.find_by_id(&lead_id).await.unwrap().unwrap();
    assert_eq!(lead.metadata["requestedLeadId"], "crm-42");
}

#[tokio::test]
async fn welcome_failure_leaves_session_uninitialised() {
    let harness = ChatHarness::new().await.unwrap();
    harness.responder.fail_welcome(true);
    let mut client = harness.connect();

    let events = client.init("s-w", None, json!({})).await;

    assert_eq!(error_code(&events), Some(error_codes::RESPONDER_FAILED));
    assert_eq!(
        harness.engine.sessions().state(client.id()),
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn disconnect_broadcasts_and_unregisters() {
    let harness = ChatHarness::new().await.unwrap();
    let mut observer = harness.connect();
    observer.auth("agent-1").await;

    let mut visitor = harness.connect();
    visitor.auth("visitor-user").await;
    let lead_id = connected(&visitor.init("s-d", None, json!({})).await)
        .lead_id
        .clone();
    visitor.disconnect();

    let relay = harness.engine.relay();
    assert!(!relay.is_registered("visitor-user"));
    assert!(relay.is_registered("agent-1"));
    assert_eq!(harness.engine.sessions().len(), 1);

    let observed = observer.drain();
    assert_eq!(
        observed,
        vec![ServerEvent::ChatDisconnected(
            outreach_chat::protocol::SessionEnded {
                session_id: "s-d".into(),
                lead_id,
            }
        )]
    );

    // A second disconnect is a no-op.
    visitor.disconnect();
    assert!(observer.drain().is_empty());
}

#[tokio::test]
async fn notification_ops_require_identity() {
    let harness = ChatHarness::new().await.unwrap();
    let note = harness
        .storage
        .create_notification("user-9", "New lead", "Ann signed up")
        .await
        .unwrap();
    let other = harness
        .storage
        .create_notification("user-9", "Reply", "Ben replied")
        .await
        .unwrap();
    let mut client = harness.connect();

    client
        .send(json!({ "type": "mark_notification_read", "notificationId": note.id }))
        .await;
    assert!(client.drain().is_empty());
    let listed = harness.storage.list_notifications("user-9").await.unwrap();
    assert!(listed.iter().all(|n| !n.read));

    client.auth("user-9").await;
    client
        .send(json!({ "type": "mark_notification_read", "notificationId": note.id }))
        .await;
    client
        .send(json!({ "type": "delete_notification", "notificationId": other.id }))
        .await;
    assert!(client.drain().is_empty());

    let listed = harness.storage.list_notifications("user-9").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, note.id);
    assert!(listed[0].read);
}

#[tokio::test]
async fn agent_update_is_rebroadcast_with_sender() {
    let harness = ChatHarness::new().await.unwrap();
    let mut anonymous = harness.connect();
    let mut sender = harness.connect();
    let mut watcher = harness.connect();
    sender.auth("agent-a").await;
    watcher.auth("agent-b").await;

    anonymous
        .send(json!({ "type": "agent_update", "data": { "status": "ignored" } }))
        .await;
    assert!(watcher.drain().is_empty());

    sender
        .send(json!({ "type": "agent_update", "data": { "leadId": "l-1", "status": "emailed" } }))
        .await;

    let observed = watcher.drain();
    assert_eq!(observed.len(), 1);
    match &observed[0] {
        ServerEvent::AgentUpdate(update) => {
            assert_eq!(update.from_user_id.as_deref(), Some("agent-a"));
            assert_eq!(update.lead_id.as_deref(), Some("l-1"));
            assert_eq!(update.data["status"], "emailed");
        }
        other => panic!("expected agent_update, got {other:?}"),
    }
    // The sender is an observer too.
    assert_eq!(sender.drain().len(), 1);
    assert!(anonymous.drain().is_empty());
}

#[tokio::test]
async fn process_lead_without_processor_is_unsupported() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    client
        .send(json!({ "type": "process_lead", "leadId": "l-1" }))
        .await;

    assert_eq!(error_code(&client.drain()), Some(error_codes::UNSUPPORTED));
}

#[tokio::test]
async fn process_lead_broadcasts_result() {
    let processor = Arc::new(MockLeadProcessor::new("send_email"));
    let harness = ChatHarness::builder()
        .with_lead_processor(processor.clone())
        .build()
        .await
        .unwrap();
    let mut client = harness.connect();
    client.auth("agent-p").await;

    client
        .send(json!({ "type": "process_lead", "leadId": "l-9" }))
        .await;

    let events = client.drain();
    assert_eq!(processor.call_count(), 1);
    match events.as_slice() {
        [ServerEvent::LeadUpdate(update)] => {
            assert_eq!(update.lead_id.as_deref(), Some("l-9"));
            assert_eq!(update.data["action"], "send_email");
        }
        other => panic!("expected one lead_update, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_get_invalid_message() {
    let harness = ChatHarness::new().await.unwrap();
    let mut client = harness.connect();

    client.send_text("not json").await;
    client.send(json!({ "type": "teleport" })).await;

    let events = client.drain();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(
        e,
        ServerEvent::Error(err) if err.code == error_codes::INVALID_MESSAGE
    )));
}

#[tokio::test]
async fn full_outbound_queue_drops_events() {
    let harness = ChatHarness::builder()
        .with_outbound_buffer(1)
        .build()
        .await
        .unwrap();
    let mut client = harness.connect();
    client.init("s-q", None, json!({})).await;

    // typing fills the queue; the reply and stopTyping are dropped.
    let events = client.say("hi").await;
    assert_eq!(kinds(&events), vec!["chat:typing"]);
    assert_eq!(client.connection().drop_count(), 2);
}
