use crate::protocol::{ClientMessage, ServerEvent};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One session. Requests run as separate tasks so a slow analysis does not
/// hold back a refactor or test request on the same socket; a single writer
/// task owns the sending half.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "Failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let coordinator = state.coordinator.clone();
    let session_id = match coordinator.connect(&tx) {
        Ok(session_id) => session_id,
        Err(_) => {
            drop(tx);
            let _ = writer.await;
            return;
        }
    };

    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                coordinator.reject_frame(&session_id, &tx);
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(session_id = %session_id, error = %err, "WebSocket receive error");
                break;
            }
        };

        match ClientMessage::parse(text.as_str()) {
            Ok(ClientMessage::Disconnect) => break,
            Ok(request) => {
                let coordinator = coordinator.clone();
                let session_id = session_id.clone();
                let sink = tx.clone();
                tokio::spawn(async move {
                    coordinator.handle(&session_id, request, &sink).await;
                });
            }
            Err(err) => {
                debug!(session_id = %session_id, error = %err, "Unparseable frame");
                coordinator.reject_frame(&session_id, &tx);
            }
        }
    }

    coordinator.disconnect(&session_id);
    drop(tx);
    let _ = writer.await;
}
