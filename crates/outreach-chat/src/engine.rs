// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat turn processor.
//!
//! [`ChatEngine`] owns the session registry and the notification relay and
//! applies one inbound frame at a time per connection. The transport calls
//! [`ChatEngine::connect`] when a socket opens, [`ChatEngine::handle_text`]
//! for every text frame (awaiting each before reading the next), and
//! [`ChatEngine::disconnect`] when it closes.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use outreach_config::model::{ChatConfig, UnknownLeadPolicy};
use outreach_core::traits::{LeadProcessor, Responder, ResponderContext, SessionContext};
use outreach_core::types::{
    Channel, Conversation, ConversationMessage, Direction, Lead, MessageRole, NewCommunication,
    NewLead, CHAT_WIDGET_SOURCE,
};
use outreach_core::{
    CommunicationRepository, ConversationRepository, LeadRepository, NotificationRepository,
    OutreachError,
};

use crate::connection::ConnectionHandle;
use crate::protocol::{
    error_codes, ChatConnected, ChatInit, ChatReply, ClientMessage, HandoverRequested,
    ProcessLeadRequest, RelayedUpdate, ServerEvent, SessionEnded, SessionRef, UpdatePayload,
};
use crate::relay::NotificationRelay;
use crate::session::{ActiveBinding, ChatSession, SessionRegistry};

/// Agent type recorded on conversations the chat engine creates.
pub const CHAT_AGENT_TYPE: &str = "chat";

/// Trigger passed to the responder for the session greeting.
pub const WELCOME_TRIGGER: &str = "chat:init";

/// Conversation messages carried by a handover broadcast.
const HANDOVER_HISTORY: usize = 20;

/// Repositories the chat engine reads and writes.
#[derive(Clone)]
pub struct ChatRepositories {
    pub leads: Arc<dyn LeadRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub communications: Arc<dyn CommunicationRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

pub struct ChatEngine {
    config: ChatConfig,
    repos: ChatRepositories,
    responder: Arc<dyn Responder>,
    lead_processor: Option<Arc<dyn LeadProcessor>>,
    relay: Arc<NotificationRelay>,
    sessions: SessionRegistry,
}

impl ChatEngine {
    pub fn new(
        config: ChatConfig,
        repos: ChatRepositories,
        responder: Arc<dyn Responder>,
        relay: Arc<NotificationRelay>,
    ) -> Self {
        Self {
            config,
            repos,
            responder,
            lead_processor: None,
            relay,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn with_lead_processor(mut self, processor: Arc<dyn LeadProcessor>) -> Self {
        self.lead_processor = Some(processor);
        self
    }

    pub fn relay(&self) -> &Arc<NotificationRelay> {
        &self.relay
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Start tracking a freshly opened connection.
    pub fn connect(&self, connection: Arc<ConnectionHandle>) {
        debug!(conn_id = %connection.id(), "connection opened");
        self.sessions.open(connection);
    }

    /// Parse and process one text frame.
    pub async fn handle_text(&self, connection_id: &str, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(connection_id, message).await,
            Err(e) => {
                debug!(conn_id = %connection_id, error = %e, "unparseable frame");
                self.reply(
                    connection_id,
                    &ServerEvent::error(error_codes::INVALID_MESSAGE, format!("invalid message: {e}")),
                );
            }
        }
    }

    /// Process one inbound message.
    pub async fn handle(&self, connection_id: &str, message: ClientMessage) {
        let Some(session) = self.sessions.get(connection_id) else {
            debug!(conn_id = %connection_id, kind = message.kind(), "message for unknown connection");
            return;
        };
        debug!(conn_id = %connection_id, kind = message.kind(), state = %session.state, "inbound message");

        match message {
            ClientMessage::Auth(auth) => self.handle_auth(&session, auth.user_id),
            ClientMessage::ChatInit(init) => self.handle_init(&session, init).await,
            ClientMessage::ChatMessage(msg) => self.handle_chat_message(&session, msg.content).await,
            ClientMessage::MarkNotificationRead(n) => {
                self.handle_notification_op(&session, "mark_read", |repo, user| async move {
                    repo.mark_read(&user, &n.notification_id).await.map(|_| ())
                })
                .await
            }
            ClientMessage::MarkAllNotificationsRead => {
                self.handle_notification_op(&session, "mark_all_read", |repo, user| async move {
                    repo.mark_all_read(&user).await.map(|_| ())
                })
                .await
            }
            ClientMessage::DeleteNotification(n) => {
                self.handle_notification_op(&session, "delete", |repo, user| async move {
                    repo.delete(&user, &n.notification_id).await.map(|_| ())
                })
                .await
            }
            ClientMessage::AgentUpdate(update) => {
                self.relay_update(&session, update, ServerEvent::AgentUpdate)
            }
            ClientMessage::LeadUpdate(update) => {
                self.relay_update(&session, update, ServerEvent::LeadUpdate)
            }
            ClientMessage::ProcessLead(request) => self.handle_process_lead(&session, request).await,
        }
    }

    /// Tear down a connection. Safe to call more than once.
    pub fn disconnect(&self, connection_id: &str) {
        let Some(session) = self.sessions.close(connection_id) else {
            return;
        };
        if let Some(user_id) = session.state.user_id() {
            self.relay.unregister(user_id, connection_id);
        }
        if let Some(binding) = session.state.binding() {
            info!(
                conn_id = %connection_id,
                session_id = %binding.session_id,
                lead_id = %binding.lead_id,
                "chat session ended"
            );
            self.relay.broadcast(&ServerEvent::ChatDisconnected(SessionEnded {
                session_id: binding.session_id.clone(),
                lead_id: binding.lead_id.clone(),
            }));
        } else {
            debug!(conn_id = %connection_id, "connection closed");
        }
    }

    fn reply(&self, connection_id: &str, event: &ServerEvent) {
        if let Some(session) = self.sessions.get(connection_id) {
            session.connection.send(event);
        }
    }

    fn send_error(&self, session: &ChatSession, err: &OutreachError) {
        session
            .connection
            .send(&ServerEvent::error(err.code(), err.to_string()));
    }

    // --- auth ---

    fn handle_auth(&self, session: &ChatSession, user_id: String) {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            session
                .connection
                .send(&ServerEvent::error(error_codes::INVALID_MESSAGE, "userId must not be empty"));
            return;
        }

        let conn_id = session.connection.id();
        if let Some(previous) = session.state.user_id().filter(|p| *p != user_id) {
            self.relay.unregister(previous, conn_id);
        }
        self.relay.register(&user_id, Arc::clone(&session.connection));
        info!(conn_id = %conn_id, user_id = %user_id, "connection identified");
        self.sessions.update(conn_id, |state| state.identify(user_id));
    }

    // --- chat:init ---

    async fn handle_init(&self, session: &ChatSession, init: ChatInit) {
        let conn_id = session.connection.id();
        let session_id = init.session_id.trim().to_string();
        if session_id.is_empty() {
            session
                .connection
                .send(&ServerEvent::error(error_codes::INVALID_MESSAGE, "sessionId must not be empty"));
            return;
        }

        let lead = match self.resolve_lead(&session_id, &init).await {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                let requested = init.lead_id.unwrap_or_default();
                warn!(conn_id = %conn_id, lead_id = %requested, "chat:init for unknown lead rejected");
                session.connection.send(&ServerEvent::error(
                    error_codes::LEAD_NOT_FOUND,
                    format!("lead not found: {requested}"),
                ));
                return;
            }
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "lead resolution failed");
                self.send_error(session, &e);
                return;
            }
        };

        match self.start_session(session, &session_id, lead).await {
            Ok((binding, welcome)) => {
                info!(
                    conn_id = %conn_id,
                    session_id = %binding.session_id,
                    lead_id = %binding.lead_id,
                    conversation_id = %binding.conversation_id,
                    "chat session started"
                );
                let connected = ServerEvent::ChatConnected(ChatConnected {
                    session_id: binding.session_id.clone(),
                    lead_id: binding.lead_id.clone(),
                    conversation_id: binding.conversation_id.clone(),
                    message: welcome,
                });
                self.sessions.update(conn_id, |state| state.activate(binding));
                session.connection.send(&connected);
            }
            Err(e) => {
                warn!(conn_id = %conn_id, session_id = %session_id, error = %e, "chat:init failed");
                self.send_error(session, &e);
            }
        }
    }

    /// Find the requested lead or create one. `Ok(None)` means the lead was
    /// not found and policy forbids creating a replacement.
    async fn resolve_lead(
        &self,
        session_id: &str,
        init: &ChatInit,
    ) -> Result<Option<Lead>, OutreachError> {
        let requested = init
            .lead_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != self.config.anonymous_lead_id);

        let Some(requested) = requested else {
            return self.create_visitor_lead(session_id, init, None).await.map(Some);
        };

        if let Some(lead) = self.repos.leads.find_by_id(requested).await? {
            return Ok(Some(lead));
        }

        match self.config.unknown_lead_policy {
            UnknownLeadPolicy::Reject => Ok(None),
            UnknownLeadPolicy::Create => self
                .create_visitor_lead(session_id, init, Some(requested))
                .await
                .map(Some),
        }
    }

    async fn create_visitor_lead(
        &self,
        session_id: &str,
        init: &ChatInit,
        requested_lead_id: Option<&str>,
    ) -> Result<Lead, OutreachError> {
        let visitor = &init.metadata;
        let short_session: String = session_id.chars().take(8).collect();
        let mut metadata = visitor.extra.clone();
        metadata.insert("sessionId".into(), Value::String(session_id.to_string()));
        if let Some(requested) = requested_lead_id {
            metadata.insert("requestedLeadId".into(), Value::String(requested.to_string()));
        }

        let lead = self
            .repos
            .leads
            .create(NewLead {
                name: visitor
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("Chat Visitor {short_session}")),
                email: visitor.email.clone(),
                phone: visitor.phone.clone(),
                source: CHAT_WIDGET_SOURCE.to_string(),
                metadata: Value::Object(metadata),
            })
            .await?;
        info!(lead_id = %lead.id, session_id, "lead created from chat widget");
        Ok(lead)
    }

    /// Resolve the conversation, generate and persist the welcome message.
    async fn start_session(
        &self,
        session: &ChatSession,
        session_id: &str,
        lead: Lead,
    ) -> Result<(ActiveBinding, String), OutreachError> {
        let conversation = self.resolve_conversation(&lead.id).await?;
        let binding = ActiveBinding {
            session_id: session_id.to_string(),
            lead_id: lead.id.clone(),
            conversation_id: conversation.id.clone(),
        };

        let context = ResponderContext {
            session: SessionContext {
                connection_id: session.connection.id().to_string(),
                session_id: session_id.to_string(),
                user_id: session.state.user_id().map(str::to_string),
            },
            lead,
            conversation,
            message: None,
        };
        let welcome = self
            .responder
            .generate_initial_message(&context, WELCOME_TRIGGER)
            .await?;

        self.repos
            .conversations
            .append_message(&binding.conversation_id, MessageRole::Assistant, &welcome)
            .await?;
        self.repos
            .communications
            .create(NewCommunication {
                lead_id: binding.lead_id.clone(),
                channel: Channel::Chat,
                direction: Direction::Outbound,
                content: welcome.clone(),
                status: "sent".to_string(),
                provider_id: None,
                metadata: json!({
                    "kind": "welcome",
                    "sessionId": binding.session_id,
                    "conversationId": binding.conversation_id,
                }),
            })
            .await?;

        Ok((binding, welcome))
    }

    async fn resolve_conversation(&self, lead_id: &str) -> Result<Conversation, OutreachError> {
        let conversations = &self.repos.conversations;
        if let Some(existing) = conversations
            .find_by_lead_and_channel(lead_id, Channel::Chat)
            .await?
        {
            return Ok(existing);
        }
        let created = conversations
            .create(lead_id, Channel::Chat, CHAT_AGENT_TYPE)
            .await?;
        debug!(lead_id, conversation_id = %created.id, "conversation created");
        Ok(created)
    }

    // --- chat:message ---

    async fn handle_chat_message(&self, session: &ChatSession, content: String) {
        let (Some(binding), Some(context)) = (session.state.binding(), session.context()) else {
            debug!(conn_id = %session.connection.id(), "chat:message before chat:init");
            session.connection.send(&ServerEvent::error(
                error_codes::SESSION_NOT_INITIALIZED,
                "send chat:init before chat:message",
            ));
            return;
        };

        let session_ref = SessionRef {
            session_id: binding.session_id.clone(),
        };
        session.connection.send(&ServerEvent::Typing(session_ref.clone()));

        match self.run_turn(binding, context, content).await {
            Ok(reply) => {
                session.connection.send(&ServerEvent::ChatMessage(reply.event));
                session.connection.send(&ServerEvent::StopTyping(session_ref));
                if let Some(handover) = reply.handover {
                    info!(
                        session_id = %handover.session_id,
                        lead_id = %handover.lead_id,
                        reason = handover.reason.as_deref().unwrap_or("-"),
                        "handover requested"
                    );
                    self.relay.broadcast(&ServerEvent::HandoverRequested(handover));
                }
            }
            Err(e) => {
                warn!(
                    conn_id = %session.connection.id(),
                    session_id = %binding.session_id,
                    lead_id = %binding.lead_id,
                    error = %e,
                    "chat turn failed"
                );
                session.connection.send(&ServerEvent::StopTyping(session_ref));
                self.send_error(session, &e);
            }
        }
    }

    /// Persist the inbound side, ask the responder, persist the outbound side.
    async fn run_turn(
        &self,
        binding: &ActiveBinding,
        session: SessionContext,
        content: String,
    ) -> Result<TurnReply, OutreachError> {
        self.repos
            .communications
            .create(NewCommunication {
                lead_id: binding.lead_id.clone(),
                channel: Channel::Chat,
                direction: Direction::Inbound,
                content: content.clone(),
                status: "received".to_string(),
                provider_id: None,
                metadata: json!({
                    "sessionId": binding.session_id,
                    "conversationId": binding.conversation_id,
                }),
            })
            .await?;
        self.repos
            .conversations
            .append_message(&binding.conversation_id, MessageRole::User, &content)
            .await?;

        let lead = self
            .repos
            .leads
            .find_by_id(&binding.lead_id)
            .await?
            .ok_or_else(|| OutreachError::NotFound {
                entity: "lead",
                id: binding.lead_id.clone(),
            })?;
        let conversation = self.resolve_conversation(&binding.lead_id).await?;

        let context = ResponderContext {
            lead,
            conversation,
            message: Some(content),
            session,
        };
        let reply = self.responder.generate_response(&context).await?;

        self.repos
            .communications
            .create(NewCommunication {
                lead_id: binding.lead_id.clone(),
                channel: Channel::Chat,
                direction: Direction::Outbound,
                content: reply.content.clone(),
                status: "sent".to_string(),
                provider_id: None,
                metadata: json!({
                    "sessionId": binding.session_id,
                    "conversationId": binding.conversation_id,
                    "quickReplies": reply.quick_replies,
                    "shouldHandover": reply.should_handover,
                }),
            })
            .await?;
        self.repos
            .conversations
            .append_message(&binding.conversation_id, MessageRole::Assistant, &reply.content)
            .await?;

        let handover = if reply.should_handover {
            let mut messages = context.conversation.messages;
            messages.push(ConversationMessage {
                role: MessageRole::Assistant,
                content: reply.content.clone(),
                timestamp: outreach_core::types::now(),
            });
            let recent = messages.split_off(messages.len().saturating_sub(HANDOVER_HISTORY));
            Some(HandoverRequested {
                session_id: binding.session_id.clone(),
                lead_id: binding.lead_id.clone(),
                conversation_id: binding.conversation_id.clone(),
                reason: reply.handover_reason.clone(),
                lead: context.lead,
                recent_messages: recent,
            })
        } else {
            None
        };

        Ok(TurnReply {
            event: ChatReply {
                session_id: binding.session_id.clone(),
                content: reply.content,
                quick_replies: reply.quick_replies,
                timestamp: outreach_core::types::now(),
            },
            handover,
        })
    }

    // --- dashboard operations ---

    async fn handle_notification_op<F, Fut>(&self, session: &ChatSession, op: &'static str, run: F)
    where
        F: FnOnce(Arc<dyn NotificationRepository>, String) -> Fut,
        Fut: std::future::Future<Output = Result<(), OutreachError>>,
    {
        let Some(user_id) = session.state.user_id() else {
            debug!(conn_id = %session.connection.id(), op, "notification op ignored, not identified");
            return;
        };
        let user_id = user_id.to_string();
        if let Err(e) = run(Arc::clone(&self.repos.notifications), user_id.clone()).await {
            warn!(user_id = %user_id, op, error = %e, "notification operation failed");
            self.send_error(session, &e);
        }
    }

    fn relay_update(
        &self,
        session: &ChatSession,
        update: UpdatePayload,
        wrap: fn(RelayedUpdate) -> ServerEvent,
    ) {
        let Some(user_id) = session.state.user_id() else {
            debug!(conn_id = %session.connection.id(), "update ignored, not identified");
            return;
        };
        let lead_id = update
            .data
            .get("leadId")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.relay.broadcast(&wrap(RelayedUpdate {
            from_user_id: Some(user_id.to_string()),
            lead_id,
            data: update.data,
        }));
    }

    async fn handle_process_lead(&self, session: &ChatSession, request: ProcessLeadRequest) {
        let Some(processor) = &self.lead_processor else {
            session.connection.send(&ServerEvent::error(
                error_codes::UNSUPPORTED,
                "lead processing is not configured",
            ));
            return;
        };

        match processor.process_lead(&request.lead_id).await {
            Ok(result) => {
                info!(lead_id = %request.lead_id, "lead processed on request");
                self.relay.broadcast(&ServerEvent::LeadUpdate(RelayedUpdate {
                    from_user_id: session.state.user_id().map(str::to_string),
                    lead_id: Some(request.lead_id),
                    data: result,
                }));
            }
            Err(e) => {
                warn!(lead_id = %request.lead_id, error = %e, "lead processing failed");
                self.send_error(session, &e);
            }
        }
    }
}

struct TurnReply {
    event: ChatReply,
    handover: Option<HandoverRequested>,
}

