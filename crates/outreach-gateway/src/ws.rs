// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the chat protocol.
//!
//! Client -> Server (JSON, `type` discriminator):
//! ```json
//! {"type": "chat:init", "sessionId": "s-1", "leadId": "anonymous", "metadata": {"name": "Ann"}}
//! {"type": "chat:message", "content": "How much is it?"}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "chat:connected", "sessionId": "s-1", "leadId": "...", "conversationId": "...", "message": "Hi Ann!"}
//! {"type": "chat:typing", "sessionId": "s-1"}
//! {"type": "chat:message", "sessionId": "s-1", "content": "...", "quickReplies": [], "timestamp": "..."}
//! {"type": "chat:stopTyping", "sessionId": "s-1"}
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use outreach_chat::protocol::{error_codes, ServerEvent};
use outreach_chat::ConnectionHandle;

use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drive one connection until the client goes away.
///
/// A sender task drains the connection's outbound queue to the socket while
/// this task feeds inbound text frames to the engine, awaiting each before
/// reading the next.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (connection, mut rx) = ConnectionHandle::channel(state.outbound_buffer);
    let conn_id = connection.id().to_string();
    let engine = state.engine;
    engine.connect(connection.clone());

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender
                .send(Message::Text(frame.as_str().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => engine.handle_text(&conn_id, text.as_str()).await,
            Message::Binary(_) => {
                connection.send(&ServerEvent::error(
                    error_codes::INVALID_MESSAGE,
                    "binary frames are not supported",
                ));
            }
            Message::Close(_) => break,
            _ => {} // Ping/pong handled by tungstenite layer
        }
    }

    engine.disconnect(&conn_id);
    sender_task.abort();
}
