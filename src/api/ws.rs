//! WebSocket transport for the pub/sub bridge
//!
//! Each socket becomes one hub connection. Text frames carry JSON
//! envelopes in both directions; rejected frames are answered with an
//! `error` envelope to the sender only.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    middleware::auth::{credential_matches, presented_token},
    models::{events, ClientCommand, ConnectionId, Envelope},
    services::{bridge::BridgeConnection, BridgeHub},
    utils::{AppError, AppResult},
    AppState,
};

/// Upgrade to a bridge connection
///
/// Sockets presenting the service credential are privileged: they are
/// placed in every tenant room the bot can see.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let privileged = presented_token(&headers)
        .is_some_and(|token| credential_matches(&state.config.auth.service_token, token));
    ws.on_upgrade(move |socket| serve_socket(socket, state, privileged))
}

async fn serve_socket(socket: WebSocket, state: AppState, privileged: bool) {
    let hub = state.hub.clone();
    let BridgeConnection { id, mut events } = hub.connect(privileged).await;
    info!(connection = %id, privileged, "Bridge socket opened");

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(envelope) = events.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode '{}' envelope: {}", envelope.event, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&hub, id, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(connection = %id, "Socket read failed: {}", e);
                break;
            }
        }
    }

    // Dropping the hub's sender ends the writer task
    hub.disconnect(id);
    if let Err(e) = writer.await {
        debug!(connection = %id, "Socket writer ended abnormally: {}", e);
    }
    info!(connection = %id, "Bridge socket closed");
}

fn handle_frame(hub: &BridgeHub, id: ConnectionId, text: &str) {
    if let Err(e) = dispatch_frame(hub, id, text) {
        debug!(connection = %id, "Rejected bridge frame: {}", e);
        hub.notify(id, error_envelope(&e));
    }
}

fn dispatch_frame(hub: &BridgeHub, id: ConnectionId, text: &str) -> AppResult<usize> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let command = ClientCommand::from_envelope(envelope)?;
    hub.handle(id, command)
}

fn error_envelope(error: &AppError) -> Envelope {
    Envelope::new(
        events::ERROR,
        json!({
            "code": error.kind(),
            "message": error.to_string(),
        }),
    )
}
