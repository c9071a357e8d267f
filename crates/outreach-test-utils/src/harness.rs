// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat harness for end-to-end chat tests.
//!
//! `ChatHarness` assembles a [`ChatEngine`] over temp SQLite storage and a
//! [`MockResponder`]. [`TestClient`] stands in for a WebSocket: it feeds
//! frames to the engine and reads the connection's outbound queue.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use outreach_chat::{
    ChatEngine, ChatRepositories, ConnectionHandle, NotificationRelay, ServerEvent,
};
use outreach_config::model::{ChatConfig, UnknownLeadPolicy};
use outreach_core::traits::LeadProcessor;
use outreach_core::OutreachError;
use outreach_storage::SqliteStorage;

use crate::mock_responder::MockResponder;
use crate::storage::TempStorage;

/// Builder for [`ChatHarness`].
pub struct ChatHarnessBuilder {
    config: ChatConfig,
    responder: Option<MockResponder>,
    lead_processor: Option<Arc<dyn LeadProcessor>>,
}

impl ChatHarnessBuilder {
    fn new() -> Self {
        Self {
            config: ChatConfig::default(),
            responder: None,
            lead_processor: None,
        }
    }

    pub fn with_unknown_lead_policy(mut self, policy: UnknownLeadPolicy) -> Self {
        self.config.unknown_lead_policy = policy;
        self
    }

    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.config.outbound_buffer = capacity;
        self
    }

    pub fn with_responder(mut self, responder: MockResponder) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn with_lead_processor(mut self, processor: Arc<dyn LeadProcessor>) -> Self {
        self.lead_processor = Some(processor);
        self
    }

    pub async fn build(self) -> Result<ChatHarness, OutreachError> {
        let temp = TempStorage::new().await?;
        let storage = Arc::clone(&temp.storage);
        let responder = Arc::new(self.responder.unwrap_or_default());
        let repos = ChatRepositories {
            leads: storage.clone(),
            conversations: storage.clone(),
            communications: storage.clone(),
            notifications: storage.clone(),
        };

        let mut engine = ChatEngine::new(
            self.config.clone(),
            repos,
            responder.clone(),
            Arc::new(NotificationRelay::new()),
        );
        if let Some(processor) = self.lead_processor {
            engine = engine.with_lead_processor(processor);
        }

        Ok(ChatHarness {
            engine: Arc::new(engine),
            storage,
            responder,
            buffer: self.config.outbound_buffer,
            _temp: temp,
        })
    }
}

/// A chat engine over temp storage with in-process clients.
pub struct ChatHarness {
    pub engine: Arc<ChatEngine>,
    pub storage: Arc<SqliteStorage>,
    pub responder: Arc<MockResponder>,
    buffer: usize,
    _temp: TempStorage,
}

impl ChatHarness {
    pub fn builder() -> ChatHarnessBuilder {
        ChatHarnessBuilder::new()
    }

    /// A harness with default config and a default mock responder.
    pub async fn new() -> Result<Self, OutreachError> {
        Self::builder().build().await
    }

    /// Open a new client connection.
    pub fn connect(&self) -> TestClient {
        let (connection, rx) = ConnectionHandle::channel(self.buffer);
        self.engine.connect(Arc::clone(&connection));
        TestClient {
            engine: Arc::clone(&self.engine),
            connection,
            rx,
        }
    }
}

/// One in-process client connection.
pub struct TestClient {
    engine: Arc<ChatEngine>,
    connection: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<Arc<String>>,
}

impl TestClient {
    pub fn id(&self) -> &str {
        self.connection.id()
    }

    pub fn connection(&self) -> &Arc<ConnectionHandle> {
        &self.connection
    }

    /// Send a JSON frame and wait for the engine to finish with it.
    pub async fn send(&self, frame: Value) {
        self.send_text(&frame.to_string()).await;
    }

    pub async fn send_text(&self, text: &str) {
        self.engine.handle_text(self.connection.id(), text).await;
    }

    /// `auth` then wait.
    pub async fn auth(&self, user_id: &str) {
        self.send(serde_json::json!({ "type": "auth", "userId": user_id }))
            .await;
    }

    /// `chat:init` then return everything the engine sent back.
    pub async fn init(
        &mut self,
        session_id: &str,
        lead_id: Option<&str>,
        metadata: Value,
    ) -> Vec<ServerEvent> {
        let mut frame = serde_json::json!({
            "type": "chat:init",
            "sessionId": session_id,
            "metadata": metadata,
        });
        if let Some(lead_id) = lead_id {
            frame["leadId"] = Value::String(lead_id.to_string());
        }
        self.send(frame).await;
        self.drain()
    }

    /// `chat:message` then return everything the engine sent back.
    pub async fn say(&mut self, content: &str) -> Vec<ServerEvent> {
        self.send(serde_json::json!({ "type": "chat:message", "content": content }))
            .await;
        self.drain()
    }

    /// Every event queued for this client so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            match serde_json::from_str(&frame) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(error = %e, frame = %frame, "unparseable server frame"),
            }
        }
        events
    }

    pub fn disconnect(&self) {
        self.engine.disconnect(self.connection.id());
    }
}
