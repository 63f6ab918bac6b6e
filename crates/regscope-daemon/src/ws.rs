//! WebSocket handler for workspace change notifications

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use regscope_core::DumpId;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::{AppState, DumpSummary, StoreEvent};

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "snapshot")]
    Snapshot { definitions: usize, dumps: Vec<DumpSummary> },
    #[serde(rename = "definitions_changed")]
    DefinitionsChanged { count: usize },
    #[serde(rename = "dump_added")]
    DumpAdded(DumpSummary),
    #[serde(rename = "dump_updated")]
    DumpUpdated(DumpSummary),
    #[serde(rename = "dump_removed")]
    DumpRemoved { id: DumpId },
    #[serde(rename = "pong")]
    Pong,
}

impl From<StoreEvent> for WsMessage {
    fn from(event: StoreEvent) -> Self {
        match event {
            StoreEvent::DefinitionsChanged { count } => WsMessage::DefinitionsChanged { count },
            StoreEvent::DumpAdded(summary) => WsMessage::DumpAdded(summary),
            StoreEvent::DumpUpdated(summary) => WsMessage::DumpUpdated(summary),
            StoreEvent::DumpRemoved(id) => WsMessage::DumpRemoved { id },
        }
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_message(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    msg: &WsMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode WebSocket message");
            true
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe();

    info!("WebSocket client connected");

    // Send current workspace overview on connect
    let snapshot = WsMessage::Snapshot {
        definitions: state.definitions().await.len(),
        dumps: state.dumps().await,
    };
    if !send_message(&mut sender, &snapshot).await {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !send_message(&mut sender, &WsMessage::from(event)).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        debug!(message = text.as_str(), "WebSocket message received");
                        if text.as_str() == "ping" && !send_message(&mut sender, &WsMessage::Pong).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
